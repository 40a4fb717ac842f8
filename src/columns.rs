//! Column catalogues and header resolution.
//!
//! Headers are compared after [`normalize_column_name`], so `Hotel Name`,
//! `hotel-name` and `hotel_name` all resolve to the same column. Each column
//! also accepts the Spanish header used by the original booking exports.

use std::{collections::HashMap, fmt, hash::Hash, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    data::normalize_column_name,
    error::{EtlError, EtlResult},
};

pub trait ColumnSpec: Copy + Eq + Hash + 'static {
    fn name(self) -> &'static str;
    fn aliases(self) -> &'static [&'static str];

    fn matches(self, header: &str) -> bool {
        let normalized = normalize_column_name(header);
        normalized == self.name() || self.aliases().contains(&normalized.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationColumn {
    ReservationId,
    BookingDate,
    StayStart,
    StayEnd,
    HotelName,
    City,
    Stars,
    PricePerNight,
    IsCompetitor,
    CompetitorHotelId,
    Email,
    FirstName,
    LastName,
}

impl ReservationColumn {
    pub const ALL: [ReservationColumn; 13] = [
        ReservationColumn::ReservationId,
        ReservationColumn::BookingDate,
        ReservationColumn::StayStart,
        ReservationColumn::StayEnd,
        ReservationColumn::HotelName,
        ReservationColumn::City,
        ReservationColumn::Stars,
        ReservationColumn::PricePerNight,
        ReservationColumn::IsCompetitor,
        ReservationColumn::CompetitorHotelId,
        ReservationColumn::Email,
        ReservationColumn::FirstName,
        ReservationColumn::LastName,
    ];
}

impl ColumnSpec for ReservationColumn {
    fn name(self) -> &'static str {
        match self {
            ReservationColumn::ReservationId => "reservation_id",
            ReservationColumn::BookingDate => "booking_date",
            ReservationColumn::StayStart => "stay_start",
            ReservationColumn::StayEnd => "stay_end",
            ReservationColumn::HotelName => "hotel_name",
            ReservationColumn::City => "city",
            ReservationColumn::Stars => "stars",
            ReservationColumn::PricePerNight => "price_per_night",
            ReservationColumn::IsCompetitor => "is_competitor",
            ReservationColumn::CompetitorHotelId => "competitor_hotel_id",
            ReservationColumn::Email => "email",
            ReservationColumn::FirstName => "first_name",
            ReservationColumn::LastName => "last_name",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            ReservationColumn::ReservationId => &["id_reserva"],
            ReservationColumn::BookingDate => &["fecha_reserva"],
            ReservationColumn::StayStart => &["inicio_estancia"],
            ReservationColumn::StayEnd => &["final_estancia", "fin_estancia"],
            ReservationColumn::HotelName => &["nombre_hotel"],
            ReservationColumn::City => &["ciudad"],
            ReservationColumn::Stars => &["estrellas"],
            ReservationColumn::PricePerNight => &["precio_noche"],
            ReservationColumn::IsCompetitor => &["competencia"],
            ReservationColumn::CompetitorHotelId => &["id_hotel"],
            ReservationColumn::Email => &["mail"],
            ReservationColumn::FirstName => &["nombre"],
            ReservationColumn::LastName => &["apellido"],
        }
    }
}

/// Date-typed reservation columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateColumn {
    BookingDate,
    StayStart,
    StayEnd,
}

impl DateColumn {
    pub const ALL: [DateColumn; 3] = [
        DateColumn::BookingDate,
        DateColumn::StayStart,
        DateColumn::StayEnd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DateColumn::BookingDate => "booking_date",
            DateColumn::StayStart => "stay_start",
            DateColumn::StayEnd => "stay_end",
        }
    }
}

/// Optional text columns eligible for blank-to-null normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextColumn {
    HotelName,
    City,
    CompetitorHotelId,
    Email,
    FirstName,
    LastName,
}

impl TextColumn {
    pub const DEFAULT_BLANK_TO_NULL: [TextColumn; 2] = [TextColumn::HotelName, TextColumn::City];

    pub fn name(self) -> &'static str {
        match self {
            TextColumn::HotelName => "hotel_name",
            TextColumn::City => "city",
            TextColumn::CompetitorHotelId => "competitor_hotel_id",
            TextColumn::Email => "email",
            TextColumn::FirstName => "first_name",
            TextColumn::LastName => "last_name",
        }
    }
}

impl fmt::Display for TextColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextColumn {
    type Err = EtlError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_column_name(value);
        match normalized.as_str() {
            "hotel_name" | "nombre_hotel" => Ok(TextColumn::HotelName),
            "city" | "ciudad" => Ok(TextColumn::City),
            "competitor_hotel_id" | "id_hotel" => Ok(TextColumn::CompetitorHotelId),
            "email" | "mail" => Ok(TextColumn::Email),
            "first_name" | "nombre" => Ok(TextColumn::FirstName),
            "last_name" | "apellido" => Ok(TextColumn::LastName),
            _ => Err(EtlError::schema(format!(
                "'{value}' is not an optional text column"
            ))),
        }
    }
}

/// Position of each required column within a file's header row.
#[derive(Debug, Clone)]
pub struct HeaderMap<C: ColumnSpec> {
    positions: HashMap<C, usize>,
}

impl<C: ColumnSpec> HeaderMap<C> {
    /// Fails with [`EtlError::Schema`] listing every required column that
    /// `headers` does not provide.
    pub fn resolve(headers: &[String], required: &[C], source: &str) -> EtlResult<Self> {
        let mut positions = HashMap::with_capacity(required.len());
        let mut missing = Vec::new();
        for column in required {
            match headers.iter().position(|header| column.matches(header)) {
                Some(idx) => {
                    positions.insert(*column, idx);
                }
                None => missing.push(column.name()),
            }
        }
        if !missing.is_empty() {
            return Err(EtlError::schema(format!(
                "{source} is missing required column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(Self { positions })
    }

    pub fn cell<'a>(&self, record: &'a [String], column: C) -> &'a str {
        self.positions
            .get(&column)
            .and_then(|idx| record.get(*idx))
            .map(String::as_str)
            .unwrap_or("")
    }
}
