pub mod cli;
pub mod columns;
pub mod competitors;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod io_utils;
pub mod load;
pub mod lookup;
pub mod pipeline;
pub mod reservation;
pub mod snapshot;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands},
    competitors::CompetitorTable,
    config::EtlConfig,
    io_utils::CsvSource,
    pipeline::{ReconcileOptions, ReservationReconciler, StageReport},
    reservation::{CLEANED_HEADERS, cleaned_record, write_cleaned_csv},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("hotel_etl", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Export(args) => handle_export(&args),
        Commands::Events(args) => events::execute(&args),
        Commands::Load(args) => load::execute(&args),
        Commands::Run(args) => handle_run(&args),
    }
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    info!(
        "Cleaning '{}' against competitors '{}'",
        args.input.display(),
        args.competitors.display()
    );
    let source = CsvSource::new(args.delimiter, args.input_encoding.as_deref())?;
    let competitors = CompetitorTable::load(&args.competitors, &source)
        .with_context(|| format!("Loading competitors from {:?}", args.competitors))?;

    let mut options = ReconcileOptions {
        default_city: args.default_city.clone(),
        ..ReconcileOptions::default()
    };
    if !args.blank_columns.is_empty() {
        options.blank_to_null = args.blank_columns.clone();
    }
    debug!("Reconcile options: {options:?}");

    let (cleaned, reports) = ReservationReconciler::new(options)
        .run(&args.input, &source, &competitors, &args.output)
        .with_context(|| format!("Reconciling reservations from {:?}", args.input))?;
    if let Some(csv_path) = &args.csv {
        write_cleaned_csv(&cleaned, Some(csv_path))
            .with_context(|| format!("Writing cleaned CSV to {csv_path:?}"))?;
    }
    print_stage_reports(&reports);
    info!(
        "Snapshot with {} row(s) written to {:?}",
        cleaned.len(),
        args.output
    );
    Ok(())
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let cleaned = snapshot::restore(&args.input)
        .with_context(|| format!("Restoring snapshot {:?}", args.input))?;
    if args.table {
        let rows: Vec<Vec<String>> = cleaned
            .iter()
            .take(args.limit.unwrap_or(usize::MAX))
            .map(cleaned_record)
            .collect();
        table::print_table(&CLEANED_HEADERS, &rows);
        return Ok(());
    }
    let written = write_cleaned_csv(&cleaned, args.output.as_deref())
        .with_context(|| format!("Exporting snapshot {:?}", args.input))?;
    info!("Exported {written} row(s)");
    Ok(())
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let config = EtlConfig::load(&args.config)?;
    let source = config.csv_source()?;
    let competitors = CompetitorTable::load(&config.competitors, &source)
        .with_context(|| format!("Loading competitors from {:?}", config.competitors))?;

    let (cleaned, reports) = ReservationReconciler::new(config.reconcile_options())
        .run(&config.raw_reservations, &source, &competitors, &config.snapshot)
        .with_context(|| format!("Reconciling reservations from {:?}", config.raw_reservations))?;
    print_stage_reports(&reports);

    let events = match &config.events {
        Some(path) => events::load_events(path, &config.event_window, &config.default_city)
            .with_context(|| format!("Reading events from {path:?}"))?,
        None => Vec::new(),
    };
    let dataset = load::run_loader(
        &config.tables_dir,
        &cleaned,
        &competitors,
        &events,
        &config.default_city,
    )?;
    table::print_table(&["table", "rows"], &dataset.summary_rows());
    Ok(())
}

fn print_stage_reports(reports: &[StageReport]) {
    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|report| {
            vec![
                report.stage.to_string(),
                report.rows.to_string(),
                report.affected.to_string(),
            ]
        })
        .collect();
    table::print_table(&["stage", "rows", "affected"], &rows);
}
