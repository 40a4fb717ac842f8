mod common;

use common::{TestWorkspace, date, dec, fixture_path};
use hotel_etl::competitors::CompetitorTable;
use hotel_etl::error::EtlError;
use hotel_etl::io_utils::CsvSource;
use hotel_etl::pipeline::{ReconcileOptions, ReservationReconciler, Stage, stage_order};
use hotel_etl::reservation::{read_raw_reservations, write_cleaned_csv};
use hotel_etl::snapshot;

fn fixture_competitors() -> CompetitorTable {
    CompetitorTable::load(&fixture_path("competitors.csv"), &CsvSource::default())
        .expect("load competitors fixture")
}

#[test]
fn fixture_run_reconciles_every_column() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("cleaned.snapshot");
    let (cleaned, reports) = ReservationReconciler::default()
        .run(
            &fixture_path("raw_reservations.csv"),
            &CsvSource::default(),
            &fixture_competitors(),
            &output,
        )
        .expect("pipeline run");

    let stages: Vec<Stage> = reports.iter().map(|report| report.stage).collect();
    assert_eq!(stages, stage_order());
    let dedup = reports.iter().find(|r| r.stage == Stage::Dedup).unwrap();
    assert_eq!((dedup.rows, dedup.affected), (5, 1));

    assert_eq!(cleaned.len(), 5);
    let rows = cleaned.rows();
    let by_id = |id: &str| rows.iter().find(|row| row.reservation_id == id).unwrap();

    let r2 = by_id("R2");
    assert_eq!(r2.stars, Some(dec("4.5")));
    assert_eq!(r2.price_per_night, Some(dec("180.00")));
    assert_eq!(r2.client_id.as_deref(), Some("2"));

    let r3 = by_id("R3");
    assert_eq!(r3.city.as_deref(), Some("Madrid"));
    assert_eq!(r3.stay_start, Some(date(2025, 3, 1)));
    assert_eq!(r3.client_id.as_deref(), Some("1"));

    let r4 = by_id("R4");
    assert_eq!(r4.hotel_name.as_deref(), Some("Plaza"));
    assert_eq!(r4.price_per_night, Some(dec("90")));
    assert_eq!(r4.booking_date, Some(date(2025, 2, 1)));
    assert_eq!(r4.stars, None);

    let r5 = by_id("R5");
    assert_eq!(r5.hotel_name.as_deref(), Some("Gran Via"));
    assert_eq!(r5.price_per_night, Some(dec("110.5")));
    assert_eq!(r5.stay_end, Some(date(2025, 3, 3)));
    assert_eq!(r5.client_id.as_deref(), Some("4"));

    assert!(rows.iter().all(|row| row.city.is_some()));
    assert_eq!(snapshot::restore(&output).unwrap(), cleaned);
}

#[test]
fn duplicate_rows_collapse_to_one_cleaned_row() {
    let workspace = TestWorkspace::new();
    let row = "7,2025-01-02,2025-03-01,2025-03-02,Ritz,,5,200,false,,x@y.com,Ana,Lopez";
    let raw = workspace.write_raw("raw.csv", &[row, row]);
    let output = workspace.path().join("out.snapshot");

    let (cleaned, _) = ReservationReconciler::default()
        .run(&raw, &CsvSource::default(), &fixture_competitors(), &output)
        .unwrap();

    assert_eq!(cleaned.len(), 1);
    let only = &cleaned.rows()[0];
    assert_eq!(only.city.as_deref(), Some("Madrid"));
    assert_eq!(only.client_id.as_deref(), Some("1"));
    assert_eq!(only.stars, Some(dec("5")));
}

#[test]
fn reconciling_a_cleaned_table_changes_nothing() {
    let workspace = TestWorkspace::new();
    let competitors = fixture_competitors();
    let reconciler = ReservationReconciler::default();
    let (first, _) = reconciler
        .run(
            &fixture_path("raw_reservations.csv"),
            &CsvSource::default(),
            &competitors,
            &workspace.path().join("first.snapshot"),
        )
        .unwrap();

    let exported = workspace.path().join("cleaned.csv");
    write_cleaned_csv(&first, Some(&exported)).unwrap();
    let reread = read_raw_reservations(&exported, &CsvSource::default()).unwrap();
    let (second, reports) = reconciler.reconcile(reread, &competitors).unwrap();

    assert_eq!(second, first);
    let dedup = reports.iter().find(|r| r.stage == Stage::Dedup).unwrap();
    assert_eq!(dedup.affected, 0);
}

#[test]
fn custom_default_city_is_applied() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_raw(
        "raw.csv",
        &["1,2025-01-02,2025-03-01,2025-03-02,Alfonso XIII,,5,300,false,,a@b.c,Eva,Diaz"],
    );
    let options = ReconcileOptions {
        default_city: "Sevilla".to_string(),
        ..ReconcileOptions::default()
    };
    let (cleaned, _) = ReservationReconciler::new(options)
        .run(
            &raw,
            &CsvSource::default(),
            &fixture_competitors(),
            &workspace.path().join("out.snapshot"),
        )
        .unwrap();
    assert_eq!(cleaned.rows()[0].city.as_deref(), Some("Sevilla"));
}

#[test]
fn blank_default_city_fails_before_persisting() {
    let workspace = TestWorkspace::new();
    let output = workspace.path().join("out.snapshot");
    let options = ReconcileOptions {
        default_city: " ".to_string(),
        ..ReconcileOptions::default()
    };
    let err = ReservationReconciler::new(options)
        .run(
            &fixture_path("raw_reservations.csv"),
            &CsvSource::default(),
            &fixture_competitors(),
            &output,
        )
        .unwrap_err();
    assert!(matches!(err, EtlError::Parse(_)));
    assert!(!output.exists());
}

#[test]
fn missing_input_is_reported() {
    let workspace = TestWorkspace::new();
    let err = ReservationReconciler::default()
        .run(
            &workspace.path().join("absent.csv"),
            &CsvSource::default(),
            &fixture_competitors(),
            &workspace.path().join("out.snapshot"),
        )
        .unwrap_err();
    assert!(matches!(err, EtlError::InputNotFound(_)));
}

#[test]
fn missing_column_is_a_schema_error() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write(
        "raw.csv",
        "reservation_id,booking_date,hotel_name\n1,2025-01-01,Ritz\n",
    );
    let err = read_raw_reservations(&raw, &CsvSource::default()).unwrap_err();
    match err {
        EtlError::Schema(message) => {
            assert!(message.contains("stay_start"));
            assert!(message.contains("email"));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn empty_competitor_file_is_rejected() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("competitors.csv", "hotel_name,stars,price_per_night,booking_date\n");
    assert!(matches!(
        CompetitorTable::load(&path, &CsvSource::default()),
        Err(EtlError::EmptyInput(_))
    ));
}

#[test]
fn failing_stage_leaves_no_snapshot() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_raw(
        "raw.csv",
        &["1,someday,2025-03-01,2025-03-02,Ritz,Madrid,5,200,false,,a@b.c,Eva,Diaz"],
    );
    let output = workspace.path().join("out.snapshot");
    let err = ReservationReconciler::default()
        .run(&raw, &CsvSource::default(), &fixture_competitors(), &output)
        .unwrap_err();
    assert!(matches!(err, EtlError::Parse(_)));
    assert!(!output.exists());
}

#[test]
fn unparseable_number_names_file_and_line() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_raw(
        "raw.csv",
        &[
            "1,2025-01-01,2025-03-01,2025-03-02,Ritz,Madrid,5,200,false,,a@b.c,Eva,Diaz",
            "2,2025-01-01,2025-03-01,2025-03-02,Ritz,Madrid,five,200,false,,a@b.c,Eva,Diaz",
        ],
    );
    match read_raw_reservations(&raw, &CsvSource::default()).unwrap_err() {
        EtlError::Parse(message) => {
            assert!(message.contains("line 3"), "{message}");
            assert!(message.contains("stars"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn all_null_stay_column_fails_the_run() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write_raw(
        "raw.csv",
        &["1,2025-01-01,,2025-03-02,Ritz,Madrid,5,200,false,,a@b.c,Eva,Diaz"],
    );
    let output = workspace.path().join("out.snapshot");
    let err = ReservationReconciler::default()
        .run(&raw, &CsvSource::default(), &fixture_competitors(), &output)
        .unwrap_err();
    assert!(matches!(err, EtlError::EmptyColumn("stay_start")));
    assert!(!output.exists());
}

#[test]
fn spanish_headers_and_semicolons_are_accepted() {
    let workspace = TestWorkspace::new();
    let raw = workspace.write(
        "reservas.csv",
        "id_reserva;fecha_reserva;inicio_estancia;final_estancia;nombre_hotel;ciudad;estrellas;precio_noche;competencia;id_hotel;mail;nombre;apellido\n\
         1;2025-01-01;2025-03-01;2025-03-02;Ritz;Madrid;5;200;False;;a@b.c;Eva;Diaz\n",
    );
    let source = CsvSource::new(Some(b';'), None).unwrap();
    let rows = read_raw_reservations(&raw, &source).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].hotel_name.as_deref(), Some("Ritz"));
    assert!(!rows[0].is_competitor);
}
