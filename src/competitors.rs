//! The competitor hotel snapshot produced by the price scraper.
//!
//! The table is read-only once built: the reconciler only derives lookups
//! from it, and the loader appends its rows to the hotel table.

use std::path::Path;

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    columns::{ColumnSpec, HeaderMap},
    data::{is_null_token, parse_naive_date, parse_scraped_decimal},
    error::{EtlError, EtlResult},
    io_utils::{self, CsvSource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompetitorColumn {
    HotelName,
    Stars,
    PricePerNight,
    BookingDate,
}

impl CompetitorColumn {
    pub const ALL: [CompetitorColumn; 4] = [
        CompetitorColumn::HotelName,
        CompetitorColumn::Stars,
        CompetitorColumn::PricePerNight,
        CompetitorColumn::BookingDate,
    ];
}

impl ColumnSpec for CompetitorColumn {
    fn name(self) -> &'static str {
        match self {
            CompetitorColumn::HotelName => "hotel_name",
            CompetitorColumn::Stars => "stars",
            CompetitorColumn::PricePerNight => "price_per_night",
            CompetitorColumn::BookingDate => "booking_date",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            CompetitorColumn::HotelName => &["nombre_hotel"],
            CompetitorColumn::Stars => &["estrellas"],
            CompetitorColumn::PricePerNight => &["precio_noche"],
            CompetitorColumn::BookingDate => &["fecha_reserva"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorHotel {
    pub hotel_name: String,
    pub stars: Option<Decimal>,
    pub price_per_night: Option<Decimal>,
    pub booking_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorTable {
    hotels: Vec<CompetitorHotel>,
}

impl CompetitorTable {
    pub fn new(hotels: Vec<CompetitorHotel>) -> EtlResult<Self> {
        if hotels.is_empty() {
            return Err(EtlError::empty_input("competitor table has no rows"));
        }
        Ok(Self { hotels })
    }

    pub fn load(path: &Path, source: &CsvSource) -> EtlResult<Self> {
        let mut reader = io_utils::open_csv_reader(path, source)?;
        let headers = io_utils::reader_headers(&mut reader, source.encoding)?;
        let source_name = path.display().to_string();
        let map = HeaderMap::resolve(&headers, &CompetitorColumn::ALL, &source_name)?;

        let mut hotels = Vec::new();
        for (line, record) in io_utils::read_records(&mut reader, source.encoding)? {
            let hotel = parse_competitor_row(&map, &record).map_err(|err| match err {
                EtlError::Parse(message) => {
                    EtlError::parse(format!("{source_name} line {line}: {message}"))
                }
                other => other,
            })?;
            hotels.push(hotel);
        }
        let table = Self::new(hotels)
            .map_err(|_| EtlError::empty_input(format!("{source_name} has no competitor rows")))?;
        info!("Loaded {} competitor hotel(s) from {source_name}", table.len());
        Ok(table)
    }

    pub fn hotels(&self) -> &[CompetitorHotel] {
        &self.hotels
    }

    pub fn len(&self) -> usize {
        self.hotels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hotels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.hotels.iter().map(|hotel| hotel.hotel_name.as_str())
    }
}

fn optional_cell<'a>(map: &HeaderMap<CompetitorColumn>, record: &'a [String], column: CompetitorColumn) -> Option<&'a str> {
    let value = map.cell(record, column).trim();
    (!value.is_empty() && !is_null_token(value)).then_some(value)
}

fn parse_competitor_row(
    map: &HeaderMap<CompetitorColumn>,
    record: &[String],
) -> EtlResult<CompetitorHotel> {
    // Scraped titles carry the district on a second line.
    let hotel_name = optional_cell(map, record, CompetitorColumn::HotelName)
        .and_then(|name| name.lines().next())
        .map(|name| name.trim().to_string())
        .ok_or_else(|| EtlError::parse("competitor row has no hotel name"))?;

    let scraped = |column: CompetitorColumn| -> EtlResult<Option<Decimal>> {
        optional_cell(map, record, column)
            .map(|value| {
                parse_scraped_decimal(value)
                    .map_err(|err| EtlError::parse(format!("column '{}': {err}", column.name())))
            })
            .transpose()
    };
    let booking_date = optional_cell(map, record, CompetitorColumn::BookingDate)
        .map(|value| {
            parse_naive_date(value).map_err(|err| {
                EtlError::parse(format!(
                    "column '{}': {err}",
                    CompetitorColumn::BookingDate.name()
                ))
            })
        })
        .transpose()?;

    Ok(CompetitorHotel {
        hotel_name,
        stars: scraped(CompetitorColumn::Stars)?,
        price_per_night: scraped(CompetitorColumn::PricePerNight)?,
        booking_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_table() {
        assert!(matches!(
            CompetitorTable::new(Vec::new()),
            Err(EtlError::EmptyInput(_))
        ));
    }

    #[test]
    fn parse_row_reads_scraped_text() {
        let headers = vec![
            "nombre_hotel".to_string(),
            "estrellas".to_string(),
            "precio_noche".to_string(),
            "fecha_reserva".to_string(),
        ];
        let map = HeaderMap::resolve(&headers, &CompetitorColumn::ALL, "test").unwrap();
        let record = vec![
            "Hotel Plaza\nCentro".to_string(),
            "8.6/10".to_string(),
            "90€".to_string(),
            "2025-02-28".to_string(),
        ];
        let hotel = parse_competitor_row(&map, &record).unwrap();
        assert_eq!(hotel.hotel_name, "Hotel Plaza");
        assert_eq!(hotel.price_per_night, Some(Decimal::from(90)));
        assert_eq!(hotel.stars.unwrap().to_string(), "8.6");
        assert_eq!(hotel.booking_date, NaiveDate::from_ymd_opt(2025, 2, 28));
    }
}
