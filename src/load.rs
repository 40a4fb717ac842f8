//! Relational load: splits the cleaned reservations, the competitor snapshot
//! and the event listings into city, hotel, client, event and reservation
//! tables linked by surrogate ids, and hands them to a [`Loader`].

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

use crate::{
    cli::LoadArgs,
    competitors::CompetitorTable,
    data::format_date,
    error::{EtlError, EtlResult},
    events::{self, Event, EventWindow},
    io_utils::CsvSource,
    reservation::ReservationTable,
    snapshot, table,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotel {
    pub id: u32,
    pub name: String,
    pub stars: Option<Decimal>,
    pub is_competitor: bool,
    pub city_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub id: u32,
    pub event: Event,
    pub city_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationEntry {
    pub reservation_id: String,
    pub booking_date: Option<NaiveDate>,
    pub stay_start: Option<NaiveDate>,
    pub stay_end: Option<NaiveDate>,
    pub price_per_night: Option<Decimal>,
    pub client_id: Option<String>,
    pub hotel_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationalDataset {
    pub cities: Vec<City>,
    pub hotels: Vec<Hotel>,
    pub clients: Vec<Client>,
    pub events: Vec<EventEntry>,
    pub reservations: Vec<ReservationEntry>,
}

#[derive(Debug, Default)]
struct CityRegistry {
    ids: HashMap<String, u32>,
    cities: Vec<City>,
}

impl CityRegistry {
    fn register(&mut self, name: &str) {
        if self.ids.contains_key(name) {
            return;
        }
        let id = self.cities.len() as u32 + 1;
        self.ids.insert(name.to_string(), id);
        self.cities.push(City {
            id,
            name: name.to_string(),
        });
    }

    fn id_of(&self, name: &str) -> EtlResult<u32> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| EtlError::load(format!("city '{name}' is not in the city table")))
    }
}

impl RelationalDataset {
    /// `default_city` is the city the reconciler filled in. Competitor hotels
    /// are placed there.
    pub fn build(
        reservations: &ReservationTable,
        competitors: &CompetitorTable,
        events: &[Event],
        default_city: &str,
    ) -> EtlResult<Self> {
        let mut cities = CityRegistry::default();
        for city in reservations.iter().filter_map(|row| row.city.as_deref()) {
            cities.register(city);
        }
        cities.register(default_city);
        for event in events {
            cities.register(&event.city);
        }

        let mut hotels = Vec::new();
        let mut seen_own = HashSet::new();
        for row in reservations.iter().filter(|row| row.is_own()) {
            let Some(name) = row.hotel_name.as_deref() else {
                continue;
            };
            let city = row
                .city
                .as_deref()
                .ok_or_else(|| EtlError::load(format!("hotel '{name}' has no city")))?;
            if !seen_own.insert((name, row.stars, city)) {
                continue;
            }
            hotels.push(Hotel {
                id: hotels.len() as u32 + 1,
                name: name.to_string(),
                stars: row.stars,
                is_competitor: false,
                city_id: cities.id_of(city)?,
            });
        }
        let competitor_city = cities.id_of(default_city)?;
        for hotel in competitors.hotels() {
            hotels.push(Hotel {
                id: hotels.len() as u32 + 1,
                name: hotel.hotel_name.clone(),
                stars: hotel.stars,
                is_competitor: true,
                city_id: competitor_city,
            });
        }
        // Later hotels win on a shared name, so competitor entries take over.
        let hotel_ids: HashMap<&str, u32> = hotels
            .iter()
            .map(|hotel| (hotel.name.as_str(), hotel.id))
            .collect();

        let mut clients = Vec::new();
        let mut seen_clients = HashSet::new();
        let mut client_ids: HashMap<&str, &str> = HashMap::new();
        for row in reservations {
            let (Some(id), Some(email)) = (row.client_id.as_deref(), row.email.as_deref()) else {
                continue;
            };
            client_ids.insert(email, id);
            let key = (id, row.first_name.as_deref(), row.last_name.as_deref(), email);
            if seen_clients.insert(key) {
                clients.push(Client {
                    id: id.to_string(),
                    first_name: row.first_name.clone(),
                    last_name: row.last_name.clone(),
                    email: email.to_string(),
                });
            }
        }

        let mut event_entries = Vec::with_capacity(events.len());
        let mut seen_events = HashSet::new();
        for event in events {
            if !seen_events.insert(event) {
                continue;
            }
            event_entries.push(EventEntry {
                id: event_entries.len() as u32 + 1,
                event: event.clone(),
                city_id: cities.id_of(&event.city)?,
            });
        }

        let reservation_entries = reservations
            .iter()
            .map(|row| ReservationEntry {
                reservation_id: row.reservation_id.clone(),
                booking_date: row.booking_date,
                stay_start: row.stay_start,
                stay_end: row.stay_end,
                price_per_night: row.price_per_night,
                client_id: row
                    .email
                    .as_deref()
                    .and_then(|email| client_ids.get(email))
                    .map(|id| id.to_string()),
                hotel_id: row
                    .hotel_name
                    .as_deref()
                    .and_then(|name| hotel_ids.get(name))
                    .copied(),
            })
            .collect();

        Ok(Self {
            cities: cities.cities,
            hotels,
            clients,
            events: event_entries,
            reservations: reservation_entries,
        })
    }

    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        [
            ("cities", self.cities.len()),
            ("hotels", self.hotels.len()),
            ("clients", self.clients.len()),
            ("events", self.events.len()),
            ("reservations", self.reservations.len()),
        ]
        .into_iter()
        .map(|(name, count)| vec![name.to_string(), count.to_string()])
        .collect()
    }
}

/// Destination for a relational dataset.
pub trait Loader {
    fn load(&mut self, dataset: &RelationalDataset) -> EtlResult<()>;
}

/// Writes each table as a CSV file inside a directory.
#[derive(Debug, Clone)]
pub struct CsvTablesLoader {
    dir: PathBuf,
}

impl CsvTablesLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write_table(&self, file: &str, headers: &[&str], rows: Vec<Vec<String>>) -> EtlResult<()> {
        let path = self.dir.join(file);
        let fail = |err: &dyn std::fmt::Display| {
            EtlError::load(format!("writing {}: {err}", path.display()))
        };
        let mut writer = csv::Writer::from_path(&path).map_err(|err| fail(&err))?;
        writer.write_record(headers).map_err(|err| fail(&err))?;
        let count = rows.len();
        for row in rows {
            writer.write_record(&row).map_err(|err| fail(&err))?;
        }
        writer.flush().map_err(|err| fail(&err))?;
        debug!("Wrote {count} row(s) to {}", path.display());
        Ok(())
    }
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl Loader for CsvTablesLoader {
    fn load(&mut self, dataset: &RelationalDataset) -> EtlResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            EtlError::load(format!("creating {}: {err}", self.dir.display()))
        })?;

        self.write_table(
            "cities.csv",
            &["city_id", "city_name"],
            dataset
                .cities
                .iter()
                .map(|city| vec![city.id.to_string(), city.name.clone()])
                .collect(),
        )?;
        self.write_table(
            "hotels.csv",
            &["hotel_id", "hotel_name", "stars", "is_competitor", "city_id"],
            dataset
                .hotels
                .iter()
                .map(|hotel| {
                    vec![
                        hotel.id.to_string(),
                        hotel.name.clone(),
                        opt(&hotel.stars),
                        hotel.is_competitor.to_string(),
                        hotel.city_id.to_string(),
                    ]
                })
                .collect(),
        )?;
        self.write_table(
            "clients.csv",
            &["client_id", "first_name", "last_name", "email"],
            dataset
                .clients
                .iter()
                .map(|client| {
                    vec![
                        client.id.clone(),
                        opt(&client.first_name),
                        opt(&client.last_name),
                        client.email.clone(),
                    ]
                })
                .collect(),
        )?;
        let mut event_headers = vec!["event_id"];
        event_headers.extend(events::EVENT_HEADERS.iter().take(8));
        event_headers.push("city_id");
        self.write_table(
            "events.csv",
            &event_headers,
            dataset
                .events
                .iter()
                .map(|entry| {
                    let mut record = vec![entry.id.to_string()];
                    record.extend(events::event_record(&entry.event).into_iter().take(8));
                    record.push(entry.city_id.to_string());
                    record
                })
                .collect(),
        )?;
        self.write_table(
            "reservations.csv",
            &[
                "reservation_id",
                "booking_date",
                "stay_start",
                "stay_end",
                "price_per_night",
                "client_id",
                "hotel_id",
            ],
            dataset
                .reservations
                .iter()
                .map(|entry| {
                    let date = |d: &Option<NaiveDate>| d.as_ref().map(format_date).unwrap_or_default();
                    vec![
                        entry.reservation_id.clone(),
                        date(&entry.booking_date),
                        date(&entry.stay_start),
                        date(&entry.stay_end),
                        opt(&entry.price_per_night),
                        opt(&entry.client_id),
                        opt(&entry.hotel_id),
                    ]
                })
                .collect(),
        )?;
        info!("Loaded relational tables into {}", self.dir.display());
        Ok(())
    }
}

/// Builds the dataset and hands it to `loader`.
pub fn load_all<L: Loader>(
    loader: &mut L,
    reservations: &ReservationTable,
    competitors: &CompetitorTable,
    events: &[Event],
    default_city: &str,
) -> EtlResult<RelationalDataset> {
    let dataset = RelationalDataset::build(reservations, competitors, events, default_city)?;
    loader.load(&dataset)?;
    Ok(dataset)
}

pub fn execute(args: &LoadArgs) -> Result<()> {
    let reservations = snapshot::restore(&args.snapshot)
        .with_context(|| format!("Restoring snapshot {:?}", args.snapshot))?;
    let source = CsvSource::new(args.delimiter, args.input_encoding.as_deref())?;
    let competitors = CompetitorTable::load(&args.competitors, &source)
        .with_context(|| format!("Loading competitors from {:?}", args.competitors))?;
    let defaults = EventWindow::default();
    let window = EventWindow::new(
        args.from.unwrap_or(defaults.start),
        args.to.unwrap_or(defaults.end),
    )?;
    let events = match &args.events {
        Some(path) => events::load_events(path, &window, &args.default_city)
            .with_context(|| format!("Reading events from {path:?}"))?,
        None => Vec::new(),
    };
    let dataset = run_loader(
        &args.output_dir,
        &reservations,
        &competitors,
        &events,
        &args.default_city,
    )?;
    table::print_table(&["table", "rows"], &dataset.summary_rows());
    Ok(())
}

pub(crate) fn run_loader(
    dir: &Path,
    reservations: &ReservationTable,
    competitors: &CompetitorTable,
    events: &[Event],
    default_city: &str,
) -> Result<RelationalDataset> {
    let mut loader = CsvTablesLoader::new(dir);
    load_all(&mut loader, reservations, competitors, events, default_city)
        .with_context(|| format!("Loading tables into {dir:?}"))
}
