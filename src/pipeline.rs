//! The reservation reconciler: an ordered list of stages applied to a table
//! the run owns exclusively.
//!
//! The raw table passes through the raw stages, is typed by
//! [`Stage::NormalizeDates`], and then flows through the typed stages. Each
//! stage either succeeds or aborts the run; nothing is persisted until every
//! stage has succeeded.

use std::{fmt, path::Path};

use log::info;

use crate::{
    columns::TextColumn,
    competitors::CompetitorTable,
    error::{EtlError, EtlResult},
    io_utils::CsvSource,
    reservation::{RawReservation, ReservationTable, read_raw_reservations},
    snapshot,
    transform::{cleaning, reconcile},
};

pub const DEFAULT_CITY: &str = "Madrid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Dedup,
    DefaultCity,
    NormalizeDates,
    BlankToNull,
    FillStayDates,
    NormalizeStars,
    AssignClientIds,
    FillOwnPrices,
    ResolveCompetitorNames,
    FillCompetitorPrices,
    FillCompetitorBookingDates,
    Persist,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Dedup => "dedup",
            Stage::DefaultCity => "default-city",
            Stage::NormalizeDates => "normalize-dates",
            Stage::BlankToNull => "blank-to-null",
            Stage::FillStayDates => "fill-stay-dates",
            Stage::NormalizeStars => "normalize-stars",
            Stage::AssignClientIds => "assign-client-ids",
            Stage::FillOwnPrices => "fill-own-prices",
            Stage::ResolveCompetitorNames => "resolve-competitor-names",
            Stage::FillCompetitorPrices => "fill-competitor-prices",
            Stage::FillCompetitorBookingDates => "fill-competitor-booking-dates",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub default_city: String,
    pub blank_to_null: Vec<TextColumn>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY.to_string(),
            blank_to_null: TextColumn::DEFAULT_BLANK_TO_NULL.to_vec(),
        }
    }
}

impl ReconcileOptions {
    /// The default city ends up in every row without one, so it cannot be
    /// blank.
    pub fn validate(&self) -> EtlResult<()> {
        if self.default_city.trim().is_empty() {
            return Err(EtlError::parse("default city must not be blank"));
        }
        Ok(())
    }
}

/// What a stage did: the table size afterwards and how many cells or rows
/// it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub rows: usize,
    pub affected: usize,
}

pub struct StageContext<'a> {
    pub options: &'a ReconcileOptions,
    pub competitors: &'a CompetitorTable,
}

type RawStage = fn(&mut Vec<RawReservation>, &StageContext<'_>) -> EtlResult<usize>;
type TypedStage = fn(&mut ReservationTable, &StageContext<'_>) -> EtlResult<usize>;

const RAW_STAGES: [(Stage, RawStage); 2] = [
    (Stage::Dedup, dedup_stage),
    (Stage::DefaultCity, default_city_stage),
];

const TYPED_STAGES: [(Stage, TypedStage); 8] = [
    (Stage::BlankToNull, blank_to_null_stage),
    (Stage::FillStayDates, stay_dates_stage),
    (Stage::NormalizeStars, stars_stage),
    (Stage::AssignClientIds, client_ids_stage),
    (Stage::FillOwnPrices, own_prices_stage),
    (Stage::ResolveCompetitorNames, competitor_names_stage),
    (Stage::FillCompetitorPrices, competitor_prices_stage),
    (Stage::FillCompetitorBookingDates, competitor_dates_stage),
];

fn dedup_stage(rows: &mut Vec<RawReservation>, _: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::drop_duplicates(rows))
}

fn default_city_stage(rows: &mut Vec<RawReservation>, ctx: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::fill_default_city(rows, &ctx.options.default_city))
}

fn blank_to_null_stage(table: &mut ReservationTable, ctx: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::blank_to_null(table, &ctx.options.blank_to_null))
}

fn stay_dates_stage(table: &mut ReservationTable, _: &StageContext<'_>) -> EtlResult<usize> {
    cleaning::fill_stay_dates(table)
}

fn stars_stage(table: &mut ReservationTable, _: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::normalize_stars(table))
}

fn client_ids_stage(table: &mut ReservationTable, _: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::assign_client_ids(table))
}

fn own_prices_stage(table: &mut ReservationTable, _: &StageContext<'_>) -> EtlResult<usize> {
    Ok(cleaning::fill_own_prices(table))
}

fn competitor_names_stage(table: &mut ReservationTable, ctx: &StageContext<'_>) -> EtlResult<usize> {
    Ok(reconcile::resolve_competitor_names(table, ctx.competitors))
}

fn competitor_prices_stage(table: &mut ReservationTable, ctx: &StageContext<'_>) -> EtlResult<usize> {
    Ok(reconcile::fill_competitor_prices(table, ctx.competitors))
}

fn competitor_dates_stage(table: &mut ReservationTable, ctx: &StageContext<'_>) -> EtlResult<usize> {
    Ok(reconcile::fill_competitor_booking_dates(table, ctx.competitors))
}

/// Every stage of a full run, in execution order.
pub fn stage_order() -> Vec<Stage> {
    let mut order = vec![Stage::Load];
    order.extend(RAW_STAGES.iter().map(|(stage, _)| *stage));
    order.push(Stage::NormalizeDates);
    order.extend(TYPED_STAGES.iter().map(|(stage, _)| *stage));
    order.push(Stage::Persist);
    order
}

#[derive(Debug, Clone, Default)]
pub struct ReservationReconciler {
    options: ReconcileOptions,
}

impl ReservationReconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Runs every transform stage over `raw`.
    pub fn reconcile(
        &self,
        raw: Vec<RawReservation>,
        competitors: &CompetitorTable,
    ) -> EtlResult<(ReservationTable, Vec<StageReport>)> {
        self.options.validate()?;
        let ctx = StageContext {
            options: &self.options,
            competitors,
        };
        let mut reports = Vec::with_capacity(TYPED_STAGES.len() + RAW_STAGES.len() + 1);

        let mut raw = raw;
        for (stage, apply) in RAW_STAGES {
            let affected = apply(&mut raw, &ctx)?;
            reports.push(record(stage, raw.len(), affected));
        }

        let raw_rows = raw.len();
        let mut table = cleaning::normalize_dates(raw)?;
        reports.push(record(Stage::NormalizeDates, table.len(), raw_rows));

        for (stage, apply) in TYPED_STAGES {
            let affected = apply(&mut table, &ctx)?;
            reports.push(record(stage, table.len(), affected));
        }
        Ok((table, reports))
    }

    /// Load, reconcile and persist. The snapshot at `output` is only written
    /// once every stage has succeeded.
    pub fn run(
        &self,
        raw_path: &Path,
        source: &CsvSource,
        competitors: &CompetitorTable,
        output: &Path,
    ) -> EtlResult<(ReservationTable, Vec<StageReport>)> {
        self.options.validate()?;
        let raw = read_raw_reservations(raw_path, source)?;
        let loaded = raw.len();
        let (table, mut reports) = self.reconcile(raw, competitors)?;
        reports.insert(0, record(Stage::Load, loaded, loaded));
        snapshot::persist(&table, output)?;
        reports.push(record(Stage::Persist, table.len(), table.len()));
        Ok((table, reports))
    }
}

fn record(stage: Stage, rows: usize, affected: usize) -> StageReport {
    info!("Stage {stage}: {affected} affected, {rows} row(s)");
    StageReport {
        stage,
        rows,
        affected,
    }
}
