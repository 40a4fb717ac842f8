use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::columns::TextColumn;

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean, reconcile and load hotel reservation data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile raw reservations with the competitor snapshot and persist the result
    Clean(CleanArgs),
    /// Write a persisted snapshot as CSV or as a table on stdout
    Export(ExportArgs),
    /// Extract events inside a date window from the events API payload
    Events(EventsArgs),
    /// Split a cleaned snapshot into relational tables
    Load(LoadArgs),
    /// Run clean and load from a YAML pipeline configuration
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw reservations CSV
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Competitor hotel snapshot CSV
    #[arg(short = 'c', long = "competitors")]
    pub competitors: PathBuf,
    /// Destination snapshot file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Also write the cleaned table to this CSV file
    #[arg(long = "csv")]
    pub csv: Option<PathBuf>,
    /// City assigned to reservations without one
    #[arg(long = "default-city", default_value = crate::pipeline::DEFAULT_CITY, value_parser = parse_city)]
    pub default_city: String,
    /// Text columns whose blank cells become null (defaults to hotel_name, city)
    #[arg(long = "blank-column", action = clap::ArgAction::Append, value_parser = parse_text_column)]
    pub blank_columns: Vec<TextColumn>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Snapshot produced by `clean`
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render a table on stdout instead of CSV
    #[arg(long = "table")]
    pub table: bool,
    /// Limit number of rows rendered with --table
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct EventsArgs {
    /// Events API payload (JSON)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// First day of the window (YYYY-MM-DD)
    #[arg(long = "from", value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last day of the window (YYYY-MM-DD)
    #[arg(long = "to", value_parser = parse_date)]
    pub to: Option<NaiveDate>,
    /// City every event is attached to
    #[arg(long = "default-city", default_value = crate::pipeline::DEFAULT_CITY, value_parser = parse_city)]
    pub default_city: String,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Snapshot produced by `clean`
    #[arg(short = 's', long = "snapshot")]
    pub snapshot: PathBuf,
    /// Competitor hotel snapshot CSV
    #[arg(short = 'c', long = "competitors")]
    pub competitors: PathBuf,
    /// Events API payload (JSON)
    #[arg(short = 'e', long = "events")]
    pub events: Option<PathBuf>,
    /// First day of the event window (YYYY-MM-DD)
    #[arg(long = "from", value_parser = parse_date)]
    pub from: Option<NaiveDate>,
    /// Last day of the event window (YYYY-MM-DD)
    #[arg(long = "to", value_parser = parse_date)]
    pub to: Option<NaiveDate>,
    /// Directory receiving the table files
    #[arg(short = 'd', long = "output-dir")]
    pub output_dir: PathBuf,
    /// City of the competitor hotels and of every event (the one `clean` used)
    #[arg(long = "default-city", default_value = crate::pipeline::DEFAULT_CITY, value_parser = parse_city)]
    pub default_city: String,
    /// CSV delimiter character for the competitor snapshot
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the competitor snapshot (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML pipeline configuration
    #[arg(long = "config")]
    pub config: PathBuf,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() || !first.is_ascii() {
                return Err("Delimiter must be a single ASCII character".to_string());
            }
            Ok(first as u8)
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    crate::data::parse_naive_date(value).map_err(|err| err.to_string())
}

fn parse_city(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("City cannot be blank".to_string());
    }
    Ok(trimmed.to_string())
}

fn parse_text_column(value: &str) -> Result<TextColumn, String> {
    value.parse().map_err(|err: crate::error::EtlError| err.to_string())
}
