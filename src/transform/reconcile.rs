use chrono::NaiveDate;
use itertools::Itertools;
use log::debug;
use rust_decimal::Decimal;

use crate::{
    competitors::CompetitorTable,
    lookup::{Lookup, fill_nulls_by_lookup},
    reservation::{Reservation, ReservationTable},
};

/// Competitor id -> hotel name. The distinct ids of competitor rows, in
/// first-seen order, line up by position with the scraped competitor table.
pub fn competitor_name_lookup(
    table: &ReservationTable,
    competitors: &CompetitorTable,
) -> Lookup<String, String> {
    let ids = table
        .iter()
        .filter(|row| row.is_competitor)
        .filter_map(|row| row.competitor_hotel_id.clone())
        .unique();
    Lookup::zip(ids, competitors.names().map(str::to_string))
}

pub fn competitor_price_lookup(competitors: &CompetitorTable) -> Lookup<String, Decimal> {
    Lookup::from_pairs(competitors.hotels().iter().filter_map(|hotel| {
        hotel
            .price_per_night
            .map(|price| (hotel.hotel_name.clone(), price))
    }))
}

pub fn competitor_booking_date_lookup(competitors: &CompetitorTable) -> Lookup<String, NaiveDate> {
    Lookup::from_pairs(competitors.hotels().iter().filter_map(|hotel| {
        hotel
            .booking_date
            .map(|date| (hotel.hotel_name.clone(), date))
    }))
}

/// Pass 1: resolves missing hotel names through the competitor id.
pub fn resolve_competitor_names(table: &mut ReservationTable, competitors: &CompetitorTable) -> usize {
    let lookup = competitor_name_lookup(table, competitors);
    debug!("Competitor id lookup holds {} entr(ies)", lookup.len());
    fill_nulls_by_lookup(
        table.rows_mut(),
        &lookup,
        |row: &Reservation| row.competitor_hotel_id.as_deref(),
        |row: &mut Reservation| &mut row.hotel_name,
    )
}

/// Pass 2: fills missing prices from the competitor snapshot by hotel name.
pub fn fill_competitor_prices(table: &mut ReservationTable, competitors: &CompetitorTable) -> usize {
    let lookup = competitor_price_lookup(competitors);
    debug!("Competitor price lookup holds {} entr(ies)", lookup.len());
    fill_nulls_by_lookup(
        table.rows_mut(),
        &lookup,
        |row: &Reservation| row.hotel_name.as_deref(),
        |row: &mut Reservation| &mut row.price_per_night,
    )
}

/// Pass 3: fills missing booking dates with the snapshot date by hotel name.
pub fn fill_competitor_booking_dates(
    table: &mut ReservationTable,
    competitors: &CompetitorTable,
) -> usize {
    let lookup = competitor_booking_date_lookup(competitors);
    debug!("Competitor booking date lookup holds {} entr(ies)", lookup.len());
    fill_nulls_by_lookup(
        table.rows_mut(),
        &lookup,
        |row: &Reservation| row.hotel_name.as_deref(),
        |row: &mut Reservation| &mut row.booking_date,
    )
}
