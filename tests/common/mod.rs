#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use hotel_etl::competitors::{CompetitorHotel, CompetitorTable};
use hotel_etl::reservation::{Reservation, ReservationTable};
use rust_decimal::Decimal;
use tempfile::{TempDir, tempdir};

pub const RAW_HEADER: &str = "reservation_id,booking_date,stay_start,stay_end,hotel_name,city,stars,price_per_night,is_competitor,competitor_hotel_id,email,first_name,last_name";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes a raw reservations file made of the standard header and `rows`.
    pub fn write_raw(&self, name: &str, rows: &[&str]) -> PathBuf {
        let mut contents = String::from(RAW_HEADER);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write(name, &contents)
    }
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).expect("decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// An own-hotel reservation with every optional field null.
pub fn reservation(id: &str) -> Reservation {
    Reservation {
        reservation_id: id.to_string(),
        booking_date: None,
        stay_start: None,
        stay_end: None,
        hotel_name: None,
        city: None,
        stars: None,
        price_per_night: None,
        is_competitor: false,
        competitor_hotel_id: None,
        email: None,
        first_name: None,
        last_name: None,
        client_id: None,
    }
}

pub fn own(id: &str, hotel: &str, price: Option<&str>) -> Reservation {
    Reservation {
        hotel_name: Some(hotel.to_string()),
        price_per_night: price.map(dec),
        ..reservation(id)
    }
}

pub fn competitor_row(id: &str, hotel: Option<&str>, competitor_id: Option<&str>) -> Reservation {
    Reservation {
        hotel_name: hotel.map(str::to_string),
        is_competitor: true,
        competitor_hotel_id: competitor_id.map(str::to_string),
        ..reservation(id)
    }
}

pub fn table(rows: Vec<Reservation>) -> ReservationTable {
    ReservationTable::new(rows)
}

/// Competitor table from `(name, price, booking date)` triples.
pub fn competitors(hotels: &[(&str, Option<&str>, Option<NaiveDate>)]) -> CompetitorTable {
    CompetitorTable::new(
        hotels
            .iter()
            .map(|(name, price, booking_date)| CompetitorHotel {
                hotel_name: name.to_string(),
                stars: None,
                price_per_night: price.map(dec),
                booking_date: *booking_date,
            })
            .collect(),
    )
    .expect("non-empty competitor table")
}
