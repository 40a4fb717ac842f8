//! Reservation rows in their raw and typed forms, the CSV reader for the raw
//! booking export, and the CSV writer for cleaned tables.

use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    columns::{ColumnSpec, DateColumn, HeaderMap, ReservationColumn, TextColumn},
    data::{format_date, is_null_token, parse_boolean, parse_decimal},
    error::{EtlError, EtlResult},
    io_utils::{self, CsvSource},
};

/// A booking exactly as read from the export. Date columns are still text;
/// optional text cells keep blank strings until the blank-to-null stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawReservation {
    pub reservation_id: String,
    pub booking_date: Option<String>,
    pub stay_start: Option<String>,
    pub stay_end: Option<String>,
    pub hotel_name: Option<String>,
    pub city: Option<String>,
    pub stars: Option<Decimal>,
    pub price_per_night: Option<Decimal>,
    pub is_competitor: bool,
    pub competitor_hotel_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RawReservation {
    pub fn date_text(&self, column: DateColumn) -> Option<&str> {
        match column {
            DateColumn::BookingDate => self.booking_date.as_deref(),
            DateColumn::StayStart => self.stay_start.as_deref(),
            DateColumn::StayEnd => self.stay_end.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: String,
    pub booking_date: Option<NaiveDate>,
    pub stay_start: Option<NaiveDate>,
    pub stay_end: Option<NaiveDate>,
    pub hotel_name: Option<String>,
    pub city: Option<String>,
    pub stars: Option<Decimal>,
    pub price_per_night: Option<Decimal>,
    pub is_competitor: bool,
    pub competitor_hotel_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub client_id: Option<String>,
}

impl Reservation {
    pub fn date_mut(&mut self, column: DateColumn) -> &mut Option<NaiveDate> {
        match column {
            DateColumn::BookingDate => &mut self.booking_date,
            DateColumn::StayStart => &mut self.stay_start,
            DateColumn::StayEnd => &mut self.stay_end,
        }
    }

    pub fn date(&self, column: DateColumn) -> Option<NaiveDate> {
        match column {
            DateColumn::BookingDate => self.booking_date,
            DateColumn::StayStart => self.stay_start,
            DateColumn::StayEnd => self.stay_end,
        }
    }

    pub fn text_mut(&mut self, column: TextColumn) -> &mut Option<String> {
        match column {
            TextColumn::HotelName => &mut self.hotel_name,
            TextColumn::City => &mut self.city,
            TextColumn::CompetitorHotelId => &mut self.competitor_hotel_id,
            TextColumn::Email => &mut self.email,
            TextColumn::FirstName => &mut self.first_name,
            TextColumn::LastName => &mut self.last_name,
        }
    }

    pub fn is_own(&self) -> bool {
        !self.is_competitor
    }
}

/// The working table of typed reservations, owned by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationTable {
    rows: Vec<Reservation>,
}

impl ReservationTable {
    pub fn new(rows: Vec<Reservation>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Reservation] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Reservation] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Reservation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reservation> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a ReservationTable {
    type Item = &'a Reservation;
    type IntoIter = std::slice::Iter<'a, Reservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Reads the raw booking export. Text cells holding a null token become
/// `None`; blank text cells are kept as `Some("")`.
pub fn read_raw_reservations(path: &Path, source: &CsvSource) -> EtlResult<Vec<RawReservation>> {
    let mut reader = io_utils::open_csv_reader(path, source)?;
    let headers = io_utils::reader_headers(&mut reader, source.encoding)?;
    let source_name = path.display().to_string();
    let map = HeaderMap::resolve(&headers, &ReservationColumn::ALL, &source_name)?;
    debug!("Resolved {} reservation column(s) in {source_name}", ReservationColumn::ALL.len());

    let mut rows = Vec::new();
    for (line, record) in io_utils::read_records(&mut reader, source.encoding)? {
        let row = parse_raw_row(&map, &record)
            .map_err(|err| locate(err, &source_name, line))?;
        rows.push(row);
    }
    info!("Loaded {} raw reservation(s) from {source_name}", rows.len());
    Ok(rows)
}

fn locate(err: EtlError, source: &str, line: usize) -> EtlError {
    match err {
        EtlError::Parse(message) => EtlError::parse(format!("{source} line {line}: {message}")),
        other => other,
    }
}

fn parse_raw_row(
    map: &HeaderMap<ReservationColumn>,
    record: &[String],
) -> EtlResult<RawReservation> {
    let text = |column: ReservationColumn| -> Option<String> {
        let value = map.cell(record, column);
        (!is_null_token(value)).then(|| value.to_string())
    };
    let number = |column: ReservationColumn| -> EtlResult<Option<Decimal>> {
        let value = map.cell(record, column);
        if value.trim().is_empty() || is_null_token(value) {
            return Ok(None);
        }
        parse_decimal(value)
            .map(Some)
            .map_err(|err| EtlError::parse(format!("column '{}': {err}", column.name())))
    };

    let competitor_cell = map.cell(record, ReservationColumn::IsCompetitor);
    let is_competitor = parse_boolean(competitor_cell).map_err(|err| {
        EtlError::parse(format!(
            "column '{}': {err}",
            ReservationColumn::IsCompetitor.name()
        ))
    })?;

    Ok(RawReservation {
        reservation_id: map.cell(record, ReservationColumn::ReservationId).trim().to_string(),
        booking_date: text(ReservationColumn::BookingDate),
        stay_start: text(ReservationColumn::StayStart),
        stay_end: text(ReservationColumn::StayEnd),
        hotel_name: text(ReservationColumn::HotelName),
        city: text(ReservationColumn::City),
        stars: number(ReservationColumn::Stars)?,
        price_per_night: number(ReservationColumn::PricePerNight)?,
        is_competitor,
        competitor_hotel_id: text(ReservationColumn::CompetitorHotelId)
            .filter(|id| !id.trim().is_empty()),
        email: text(ReservationColumn::Email),
        first_name: text(ReservationColumn::FirstName),
        last_name: text(ReservationColumn::LastName),
    })
}

pub const CLEANED_HEADERS: [&str; 14] = [
    "reservation_id",
    "booking_date",
    "stay_start",
    "stay_end",
    "hotel_name",
    "city",
    "stars",
    "price_per_night",
    "is_competitor",
    "competitor_hotel_id",
    "email",
    "first_name",
    "last_name",
    "client_id",
];

/// Renders a cleaned row in [`CLEANED_HEADERS`] order. Nulls become empty
/// cells.
pub fn cleaned_record(row: &Reservation) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let date = |value: &Option<NaiveDate>| value.as_ref().map(format_date).unwrap_or_default();
    let number = |value: &Option<Decimal>| value.map(|d| d.to_string()).unwrap_or_default();
    vec![
        row.reservation_id.clone(),
        date(&row.booking_date),
        date(&row.stay_start),
        date(&row.stay_end),
        text(&row.hotel_name),
        text(&row.city),
        number(&row.stars),
        number(&row.price_per_night),
        row.is_competitor.to_string(),
        text(&row.competitor_hotel_id),
        text(&row.email),
        text(&row.first_name),
        text(&row.last_name),
        text(&row.client_id),
    ]
}

pub fn write_cleaned_csv(table: &ReservationTable, path: Option<&Path>) -> EtlResult<usize> {
    let mut writer = io_utils::open_csv_writer(path)?;
    writer.write_record(CLEANED_HEADERS)?;
    for row in table {
        writer.write_record(cleaned_record(row))?;
    }
    writer.flush()?;
    Ok(table.len())
}
