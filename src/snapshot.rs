//! Binary columnar snapshot of a cleaned reservation table.
//!
//! The file is a bincode envelope holding a format version, the row count, a
//! SHA-256 digest and the encoded columns. Dates are stored as days since the
//! common era and decimals as their exact 16-byte representation, so a
//! restored table compares equal to the persisted one.

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{EtlError, EtlResult},
    reservation::{Reservation, ReservationTable},
};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    row_count: u64,
    checksum: [u8; 32],
    payload: Vec<u8>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Columns {
    reservation_id: Vec<String>,
    booking_date: Vec<Option<i32>>,
    stay_start: Vec<Option<i32>>,
    stay_end: Vec<Option<i32>>,
    hotel_name: Vec<Option<String>>,
    city: Vec<Option<String>>,
    stars: Vec<Option<[u8; 16]>>,
    price_per_night: Vec<Option<[u8; 16]>>,
    is_competitor: Vec<bool>,
    competitor_hotel_id: Vec<Option<String>>,
    email: Vec<Option<String>>,
    first_name: Vec<Option<String>>,
    last_name: Vec<Option<String>>,
    client_id: Vec<Option<String>>,
}

impl Columns {
    fn from_table(table: &ReservationTable) -> Self {
        let mut columns = Columns::default();
        let day = |date: Option<NaiveDate>| date.map(|d| d.num_days_from_ce());
        let exact = |value: Option<Decimal>| value.map(|d| d.serialize());
        for row in table {
            columns.reservation_id.push(row.reservation_id.clone());
            columns.booking_date.push(day(row.booking_date));
            columns.stay_start.push(day(row.stay_start));
            columns.stay_end.push(day(row.stay_end));
            columns.hotel_name.push(row.hotel_name.clone());
            columns.city.push(row.city.clone());
            columns.stars.push(exact(row.stars));
            columns.price_per_night.push(exact(row.price_per_night));
            columns.is_competitor.push(row.is_competitor);
            columns.competitor_hotel_id.push(row.competitor_hotel_id.clone());
            columns.email.push(row.email.clone());
            columns.first_name.push(row.first_name.clone());
            columns.last_name.push(row.last_name.clone());
            columns.client_id.push(row.client_id.clone());
        }
        columns
    }

    fn lengths(&self) -> [usize; 14] {
        [
            self.reservation_id.len(),
            self.booking_date.len(),
            self.stay_start.len(),
            self.stay_end.len(),
            self.hotel_name.len(),
            self.city.len(),
            self.stars.len(),
            self.price_per_night.len(),
            self.is_competitor.len(),
            self.competitor_hotel_id.len(),
            self.email.len(),
            self.first_name.len(),
            self.last_name.len(),
            self.client_id.len(),
        ]
    }

    fn into_table(self, row_count: usize) -> EtlResult<ReservationTable> {
        if self.lengths().iter().any(|len| *len != row_count) {
            return Err(EtlError::snapshot(format!(
                "column lengths {:?} do not match row count {row_count}",
                self.lengths()
            )));
        }
        let date = |days: Option<i32>| -> EtlResult<Option<NaiveDate>> {
            days.map(|d| {
                NaiveDate::from_num_days_from_ce_opt(d)
                    .ok_or_else(|| EtlError::snapshot(format!("day number {d} is out of range")))
            })
            .transpose()
        };
        let exact = |bytes: Option<[u8; 16]>| bytes.map(Decimal::deserialize);

        let mut rows = Vec::with_capacity(row_count);
        for idx in 0..row_count {
            rows.push(Reservation {
                reservation_id: self.reservation_id[idx].clone(),
                booking_date: date(self.booking_date[idx])?,
                stay_start: date(self.stay_start[idx])?,
                stay_end: date(self.stay_end[idx])?,
                hotel_name: self.hotel_name[idx].clone(),
                city: self.city[idx].clone(),
                stars: exact(self.stars[idx]),
                price_per_night: exact(self.price_per_night[idx]),
                is_competitor: self.is_competitor[idx],
                competitor_hotel_id: self.competitor_hotel_id[idx].clone(),
                email: self.email[idx].clone(),
                first_name: self.first_name[idx].clone(),
                last_name: self.last_name[idx].clone(),
                client_id: self.client_id[idx].clone(),
            });
        }
        Ok(ReservationTable::new(rows))
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Writes through `fill` into a staging file beside `path` and renames it
/// into place. On any failure the staging file is removed.
fn write_atomic<F>(path: &Path, fill: F) -> EtlResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let staging = partial_path(path);
    let written = File::create(&staging).and_then(|file| {
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&staging, path)) {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }
    Ok(())
}

/// Writes `table` to `path`. The snapshot is written beside the target and
/// renamed into place, so `path` never holds a partial file.
pub fn persist(table: &ReservationTable, path: &Path) -> EtlResult<()> {
    let config = bincode::config::standard();
    let payload = bincode::serde::encode_to_vec(Columns::from_table(table), config)
        .map_err(|err| EtlError::snapshot(format!("encoding columns: {err}")))?;
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        row_count: table.len() as u64,
        checksum: Sha256::digest(&payload).into(),
        payload,
    };
    let bytes = bincode::serde::encode_to_vec(&envelope, config)
        .map_err(|err| EtlError::snapshot(format!("encoding envelope: {err}")))?;

    write_atomic(path, |writer| writer.write_all(&bytes))?;
    info!(
        "Persisted {} reservation(s) to {} ({} bytes)",
        table.len(),
        path.display(),
        bytes.len()
    );
    Ok(())
}

pub fn restore(path: &Path) -> EtlResult<ReservationTable> {
    let bytes = fs::read(path).map_err(|err| EtlError::from_open(path, err))?;
    let config = bincode::config::standard();
    let (envelope, _): (Envelope, usize) = bincode::serde::decode_from_slice(&bytes, config)
        .map_err(|err| EtlError::snapshot(format!("{}: {err}", path.display())))?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(EtlError::snapshot(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            envelope.version
        )));
    }
    let digest: [u8; 32] = Sha256::digest(&envelope.payload).into();
    if digest != envelope.checksum {
        return Err(EtlError::snapshot(format!(
            "{} failed checksum verification",
            path.display()
        )));
    }
    let (columns, _): (Columns, usize) =
        bincode::serde::decode_from_slice(&envelope.payload, config)
            .map_err(|err| EtlError::snapshot(format!("decoding columns: {err}")))?;
    let table = columns.into_table(envelope.row_count as usize)?;
    debug!("Restored {} reservation(s) from {}", table.len(), path.display());
    Ok(table)
}
