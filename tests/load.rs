mod common;

use std::fs;

use common::{TestWorkspace, competitor_row, competitors, date, dec, own, table};
use hotel_etl::error::EtlError;
use hotel_etl::events::Event;
use hotel_etl::load::{CsvTablesLoader, Loader, RelationalDataset, load_all};
use hotel_etl::reservation::{Reservation, ReservationTable};

fn client(mut row: Reservation, id: &str, email: &str, first: &str) -> Reservation {
    row.client_id = Some(id.to_string());
    row.email = Some(email.to_string());
    row.first_name = Some(first.to_string());
    row
}

fn cleaned() -> ReservationTable {
    let mut ritz = own("R1", "Ritz", Some("200"));
    ritz.city = Some("Barcelona".to_string());
    ritz.stars = Some(dec("5"));
    ritz.stay_start = Some(date(2025, 3, 1));
    let mut ritz_again = own("R2", "Ritz", None);
    ritz_again.city = Some("Barcelona".to_string());
    ritz_again.stars = Some(dec("5"));
    let mut plaza = competitor_row("R3", Some("Plaza"), Some("C1"));
    plaza.city = Some("Madrid".to_string());
    plaza.price_per_night = Some(dec("90"));
    table(vec![
        client(ritz, "1", "ana@x", "Ana"),
        client(ritz_again, "2", "luis@x", "Luis"),
        client(plaza, "1", "ana@x", "Ana"),
    ])
}

fn event(name: &str) -> Event {
    Event {
        name: Some(name.to_string()),
        url: None,
        postal_code: Some(28014),
        address: None,
        schedule: None,
        organization: None,
        start: date(2025, 3, 1),
        end: date(2025, 3, 2),
        city: "Madrid".to_string(),
    }
}

#[test]
fn dataset_links_every_table_by_id() {
    let snapshot = competitors(&[("Plaza", Some("90"), None), ("Gran Via", None, None)]);
    let dataset = RelationalDataset::build(
        &cleaned(),
        &snapshot,
        &[event("Feria"), event("Feria")],
        "Madrid",
    )
    .unwrap();

    let cities: Vec<_> = dataset.cities.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(cities, vec![(1, "Barcelona"), (2, "Madrid")]);

    let hotels: Vec<_> = dataset
        .hotels
        .iter()
        .map(|h| (h.id, h.name.as_str(), h.is_competitor, h.city_id))
        .collect();
    assert_eq!(
        hotels,
        vec![
            (1, "Ritz", false, 1),
            (2, "Plaza", true, 2),
            (3, "Gran Via", true, 2),
        ]
    );

    assert_eq!(dataset.clients.len(), 2);
    assert_eq!(dataset.events.len(), 1);
    assert_eq!(dataset.events[0].city_id, 2);

    let links: Vec<_> = dataset
        .reservations
        .iter()
        .map(|r| (r.reservation_id.as_str(), r.client_id.as_deref(), r.hotel_id))
        .collect();
    assert_eq!(
        links,
        vec![
            ("R1", Some("1"), Some(1)),
            ("R2", Some("2"), Some(1)),
            ("R3", Some("1"), Some(2)),
        ]
    );
}

#[test]
fn shared_hotel_name_links_to_the_later_hotel() {
    let snapshot = competitors(&[("Ritz", None, None)]);
    let dataset = RelationalDataset::build(&cleaned(), &snapshot, &[], "Madrid").unwrap();
    let ritz = dataset.reservations.iter().find(|r| r.reservation_id == "R1").unwrap();
    assert_eq!(ritz.hotel_id, Some(2));
}

#[test]
fn configured_default_city_places_competitors_and_events() {
    let mut alfonso = own("S1", "Alfonso XIII", Some("300"));
    alfonso.city = Some("Sevilla".to_string());
    let mut feria = event("Feria");
    feria.city = "Sevilla".to_string();
    let snapshot = competitors(&[("Plaza", None, None)]);

    let dataset =
        RelationalDataset::build(&table(vec![alfonso]), &snapshot, &[feria], "Sevilla").unwrap();

    let cities: Vec<_> = dataset.cities.iter().map(|c| (c.id, c.name.as_str())).collect();
    assert_eq!(cities, vec![(1, "Sevilla")]);
    assert!(dataset.hotels.iter().all(|h| h.city_id == 1));
    assert_eq!(dataset.events[0].city_id, 1);
}

#[test]
fn csv_loader_writes_five_tables() {
    let workspace = TestWorkspace::new();
    let dir = workspace.path().join("tables");
    let mut loader = CsvTablesLoader::new(&dir);
    let snapshot = competitors(&[("Plaza", Some("90"), None)]);
    let dataset = load_all(&mut loader, &cleaned(), &snapshot, &[event("Feria")], "Madrid").unwrap();
    assert_eq!(dataset.reservations.len(), 3);

    for file in ["cities.csv", "hotels.csv", "clients.csv", "events.csv", "reservations.csv"] {
        assert!(dir.join(file).exists(), "{file} missing");
    }
    let hotels = fs::read_to_string(dir.join("hotels.csv")).unwrap();
    assert!(hotels.starts_with("hotel_id,hotel_name,stars,is_competitor,city_id"));
    assert!(hotels.contains("2,Plaza,,true,2"));
    let reservations = fs::read_to_string(dir.join("reservations.csv")).unwrap();
    assert!(reservations.contains("R1,,2025-03-01,,200,1,1"));
    let events = fs::read_to_string(dir.join("events.csv")).unwrap();
    assert!(events.starts_with("event_id,name,url,postal_code"));
    assert!(events.contains("1,Feria,,28014"));
}

struct FailingLoader;

impl Loader for FailingLoader {
    fn load(&mut self, _: &RelationalDataset) -> hotel_etl::error::EtlResult<()> {
        Err(EtlError::load("database unavailable"))
    }
}

#[test]
fn loader_failures_surface_as_load_errors() {
    let snapshot = competitors(&[("Plaza", None, None)]);
    let err = load_all(&mut FailingLoader, &cleaned(), &snapshot, &[], "Madrid").unwrap_err();
    assert!(matches!(err, EtlError::Load(_)));
}
