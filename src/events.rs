//! Local event listings from the city open-data API payload.
//!
//! The payload is a JSON-LD document whose `@graph` array holds one object
//! per event. Only events overlapping the configured window are kept.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    cli::EventsArgs,
    data::{format_date, parse_naive_date, parse_naive_datetime},
    error::{EtlError, EtlResult},
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for EventWindow {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
            end: NaiveDate::from_ymd_opt(2025, 3, 2).expect("valid date"),
        }
    }
}

impl EventWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> EtlResult<Self> {
        if start > end {
            return Err(EtlError::parse(format!(
                "event window starts ({start}) after it ends ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    /// True when an event running from `starts` to `ends` overlaps the
    /// window, whose last instant is 23:59 on the end date.
    pub fn overlaps(&self, starts: NaiveDateTime, ends: NaiveDateTime) -> bool {
        let window_open = self.start.and_time(NaiveTime::MIN);
        let window_close = self.end.and_time(NaiveTime::MIN) + Duration::minutes(23 * 60 + 59);
        starts <= window_close && ends >= window_open
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(rename = "@graph", default)]
    graph: Vec<RawEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    title: Option<String>,
    link: Option<String>,
    address: Option<RawAddress>,
    time: Option<String>,
    organization: Option<RawOrganization>,
    dtstart: Option<String>,
    dtend: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAddress {
    area: Option<RawArea>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawArea {
    #[serde(rename = "postal-code")]
    postal_code: Option<JsonValue>,
    #[serde(rename = "street-address")]
    street_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOrganization {
    #[serde(rename = "organization-name")]
    organization_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub name: Option<String>,
    pub url: Option<String>,
    pub postal_code: Option<u32>,
    pub address: Option<String>,
    pub schedule: Option<String>,
    pub organization: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub city: String,
}

fn postal_code(value: Option<&JsonValue>) -> Option<u32> {
    match value? {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A `dtstart`/`dtend` value with or without a time of day. A bare date
/// starts at midnight.
fn event_instant(value: &str) -> Option<NaiveDateTime> {
    parse_naive_datetime(value).ok().or_else(|| {
        parse_naive_date(value)
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN))
    })
}

/// Parses `payload` and keeps the events overlapping `window`, tagging each
/// with `city`. Events without a parseable start and end are skipped.
pub fn parse_events(payload: &str, window: &EventWindow, city: &str) -> EtlResult<Vec<Event>> {
    let payload: Payload = serde_json::from_str(payload)
        .map_err(|err| EtlError::extract(format!("malformed event payload: {err}")))?;
    let total = payload.graph.len();

    let mut events = Vec::new();
    for raw in payload.graph {
        let bounds = raw
            .dtstart
            .as_deref()
            .zip(raw.dtend.as_deref())
            .and_then(|(s, e)| Some((event_instant(s)?, event_instant(e)?)));
        let Some((starts, ends)) = bounds else {
            debug!("Skipping event {:?} without usable dates", raw.title);
            continue;
        };
        if !window.overlaps(starts, ends) {
            continue;
        }
        let area = raw.address.and_then(|address| address.area).unwrap_or_default();
        events.push(Event {
            name: raw.title,
            url: raw.link,
            postal_code: postal_code(area.postal_code.as_ref()),
            address: area.street_address,
            schedule: non_blank(raw.time),
            organization: raw.organization.and_then(|org| org.organization_name),
            start: starts.date(),
            end: ends.date(),
            city: city.to_string(),
        });
    }
    debug!("Kept {} of {total} event(s)", events.len());
    Ok(events)
}

pub fn load_events(path: &Path, window: &EventWindow, city: &str) -> EtlResult<Vec<Event>> {
    let payload = fs::read_to_string(path).map_err(|err| EtlError::from_open(path, err))?;
    let events = parse_events(&payload, window, city)?;
    info!(
        "Loaded {} event(s) between {} and {} from {}",
        events.len(),
        window.start,
        window.end,
        path.display()
    );
    Ok(events)
}

pub const EVENT_HEADERS: [&str; 9] = [
    "name",
    "url",
    "postal_code",
    "address",
    "schedule",
    "organization",
    "start",
    "end",
    "city",
];

pub fn event_record(event: &Event) -> Vec<String> {
    vec![
        event.name.clone().unwrap_or_default(),
        event.url.clone().unwrap_or_default(),
        event.postal_code.map(|p| p.to_string()).unwrap_or_default(),
        event.address.clone().unwrap_or_default(),
        event.schedule.clone().unwrap_or_default(),
        event.organization.clone().unwrap_or_default(),
        format_date(&event.start),
        format_date(&event.end),
        event.city.clone(),
    ]
}

pub fn execute(args: &EventsArgs) -> Result<()> {
    let defaults = EventWindow::default();
    let window = EventWindow::new(
        args.from.unwrap_or(defaults.start),
        args.to.unwrap_or(defaults.end),
    )?;
    let events = load_events(&args.input, &window, &args.default_city)
        .with_context(|| format!("Reading events from {:?}", args.input))?;

    let mut writer = io_utils::open_csv_writer(args.output.as_deref())?;
    writer.write_record(EVENT_HEADERS)?;
    for event in &events {
        writer.write_record(event_record(event))?;
    }
    writer.flush().context("Flushing events output")?;
    info!("Wrote {} event(s)", events.len());
    Ok(())
}
