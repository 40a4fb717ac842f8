use std::collections::HashMap;

use itertools::Itertools;
use rust_decimal::Decimal;

use crate::{
    columns::{DateColumn, TextColumn},
    data::{mean, parse_naive_date, round_to},
    error::{EtlError, EtlResult},
    lookup::{Lookup, fill_nulls_by_lookup},
    reservation::{RawReservation, Reservation, ReservationTable},
};

/// Removes rows equal to an earlier row across every column, keeping the
/// first occurrence in its original position. Returns the number removed.
pub fn drop_duplicates(rows: &mut Vec<RawReservation>) -> usize {
    let before = rows.len();
    let unique = std::mem::take(rows).into_iter().unique().collect();
    *rows = unique;
    before - rows.len()
}

/// Replaces a missing or blank city with `default_city`.
pub fn fill_default_city(rows: &mut [RawReservation], default_city: &str) -> usize {
    let mut filled = 0;
    for row in rows.iter_mut() {
        if row.city.as_deref().is_none_or(|city| city.trim().is_empty()) {
            row.city = Some(default_city.to_string());
            filled += 1;
        }
    }
    filled
}

/// Parses every date column. Blank cells become null; any other value that
/// is not a date fails the whole table. Errors name the row's position after
/// dedup and its reservation id, since source line numbers are gone by now.
pub fn normalize_dates(rows: Vec<RawReservation>) -> EtlResult<ReservationTable> {
    let mut typed = Vec::with_capacity(rows.len());
    for (idx, raw) in rows.into_iter().enumerate() {
        let mut dates = [None; 3];
        for (slot, column) in dates.iter_mut().zip(DateColumn::ALL) {
            let Some(text) = raw.date_text(column).filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let parsed = parse_naive_date(text).map_err(|err| {
                EtlError::parse(format!(
                    "cleaned row {} (reservation '{}') column '{}': {err}",
                    idx + 1,
                    raw.reservation_id,
                    column.name()
                ))
            })?;
            *slot = Some(parsed);
        }
        let [booking_date, stay_start, stay_end] = dates;
        typed.push(Reservation {
            reservation_id: raw.reservation_id,
            booking_date,
            stay_start,
            stay_end,
            hotel_name: raw.hotel_name,
            city: raw.city,
            stars: raw.stars,
            price_per_night: raw.price_per_night,
            is_competitor: raw.is_competitor,
            competitor_hotel_id: raw.competitor_hotel_id,
            email: raw.email,
            first_name: raw.first_name,
            last_name: raw.last_name,
            client_id: None,
        });
    }
    Ok(ReservationTable::new(typed))
}

/// Turns empty (or whitespace-only) strings in `columns` into nulls.
pub fn blank_to_null(table: &mut ReservationTable, columns: &[TextColumn]) -> usize {
    let mut cleared = 0;
    for row in table.rows_mut() {
        for column in columns {
            let slot = row.text_mut(*column);
            if slot.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *slot = None;
                cleared += 1;
            }
        }
    }
    cleared
}

/// Fills null stay dates with the first non-null value of the same column.
pub fn fill_stay_dates(table: &mut ReservationTable) -> EtlResult<usize> {
    if table.is_empty() {
        return Ok(0);
    }
    let mut filled = 0;
    for column in [DateColumn::StayStart, DateColumn::StayEnd] {
        let first = table
            .iter()
            .find_map(|row| row.date(column))
            .ok_or(EtlError::EmptyColumn(column.name()))?;
        for row in table.rows_mut() {
            let slot = row.date_mut(column);
            if slot.is_none() {
                *slot = Some(first);
                filled += 1;
            }
        }
    }
    Ok(filled)
}

fn group_means<F>(table: &ReservationTable, value: F) -> HashMap<String, Decimal>
where
    F: Fn(&Reservation) -> Option<Decimal>,
{
    let mut groups: HashMap<&str, Vec<Decimal>> = HashMap::new();
    for row in table {
        let Some(name) = row.hotel_name.as_deref() else {
            continue;
        };
        let values = groups.entry(name).or_default();
        if let Some(v) = value(row) {
            values.push(v);
        }
    }
    groups
        .into_iter()
        .filter_map(|(name, values)| mean(values.iter()).map(|avg| (name.to_string(), avg)))
        .collect()
}

/// Overwrites every star rating with the rounded mean of its hotel's
/// ratings. Rows without a hotel name, or whose hotel has no rating at all,
/// end up without one. Returns the number of rows whose value changed.
pub fn normalize_stars(table: &mut ReservationTable) -> usize {
    let means = group_means(table, |row| row.stars);
    let mut changed = 0;
    for row in table.rows_mut() {
        let canonical = row
            .hotel_name
            .as_deref()
            .and_then(|name| means.get(name))
            .map(|avg| round_to(*avg, 1));
        if row.stars != canonical {
            changed += 1;
        }
        row.stars = canonical;
    }
    changed
}

/// Gives each distinct email a sequential id in first-seen order, starting
/// at 1. Returns the number of distinct emails.
pub fn assign_client_ids(table: &mut ReservationTable) -> usize {
    let mut ids: HashMap<String, usize> = HashMap::new();
    for row in table.rows_mut() {
        row.client_id = row.email.as_ref().map(|email| {
            let next = ids.len() + 1;
            ids.entry(email.clone()).or_insert(next).to_string()
        });
    }
    ids.len()
}

/// Fills null prices of own-hotel rows with the hotel's mean price rounded to
/// 2 decimals. The mean covers every row with that hotel name, competitor
/// rows included.
pub fn fill_own_prices(table: &mut ReservationTable) -> usize {
    let means = Lookup::from_pairs(
        group_means(table, |row| row.price_per_night)
            .into_iter()
            .map(|(name, avg)| (name, round_to(avg, 2))),
    );
    fill_nulls_by_lookup(
        table.rows_mut(),
        &means,
        |row: &Reservation| {
            if row.is_own() {
                row.hotel_name.as_deref()
            } else {
                None
            }
        },
        |row: &mut Reservation| &mut row.price_per_night,
    )
}
