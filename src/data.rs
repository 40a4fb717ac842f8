//! Cell-level parsing and numeric helpers shared by the readers and the
//! transform stages.

use std::{str::FromStr, sync::OnceLock};

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EtlError, EtlResult};

/// Tokens the upstream exports use for a missing value.
pub const NULL_TOKENS: &[&str] = &["NA", "N/A", "null", "NULL", "None", "NaN", "nan", "NaT"];

pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

pub fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS.iter().any(|token| *token == trimmed)
}

pub fn parse_naive_date(value: &str) -> EtlResult<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    let trimmed = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    // Timestamps exported with a midnight time component.
    parse_naive_datetime(trimmed)
        .map(|dt| dt.date())
        .map_err(|_| EtlError::parse(format!("'{value}' is not a date")))
}

pub fn parse_naive_datetime(value: &str) -> EtlResult<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(EtlError::parse(format!("'{value}' is not a datetime")))
}

pub fn parse_decimal(value: &str) -> EtlResult<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| EtlError::parse(format!("'{value}' is not a decimal number")))
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("valid number pattern"))
}

/// Extracts the first number from scraped text such as `"120€"` or
/// `"8.6/10"`. A comma decimal separator is accepted.
pub fn parse_scraped_decimal(value: &str) -> EtlResult<Decimal> {
    let found = number_pattern()
        .find(value)
        .ok_or_else(|| EtlError::parse(format!("'{value}' does not contain a number")))?;
    parse_decimal(&found.as_str().replace(',', "."))
}

pub fn parse_boolean(value: &str) -> EtlResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Ok(false),
        _ => Err(EtlError::parse(format!("'{value}' is not a boolean"))),
    }
}

pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Arithmetic mean of the present values, `None` when there are none.
pub fn mean<'a, I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut count = 0u32;
    for value in values {
        sum += *value;
        count += 1;
    }
    (count > 0).then(|| sum / Decimal::from(count))
}

/// Rounds half to even, the same rule the analytics notebooks used.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_OUTPUT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_naive_date_accepts_dates_and_midnight_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_naive_date("2025-03-01").unwrap(), expected);
        assert_eq!(parse_naive_date("01/03/2025").unwrap(), expected);
        assert_eq!(parse_naive_date("2025-03-01 00:00:00").unwrap(), expected);
        assert!(matches!(
            parse_naive_date("tomorrow"),
            Err(EtlError::Parse(_))
        ));
    }

    #[test]
    fn parse_naive_datetime_handles_fractional_seconds() {
        let parsed = parse_naive_datetime("2025-03-02 23:59:00.0").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
    }

    #[test]
    fn parse_scraped_decimal_pulls_first_number() {
        assert_eq!(parse_scraped_decimal("120€").unwrap(), Decimal::from(120));
        assert_eq!(
            parse_scraped_decimal("8,6/10").unwrap(),
            Decimal::from_str("8.6").unwrap()
        );
        assert!(parse_scraped_decimal("sold out").is_err());
    }

    #[test]
    fn parse_boolean_accepts_common_spellings() {
        assert!(parse_boolean("True").unwrap());
        assert!(!parse_boolean("0").unwrap());
        assert!(parse_boolean("maybe").is_err());
    }

    #[test]
    fn mean_and_rounding() {
        let values = [Decimal::from(4), Decimal::from(5), Decimal::from(5)];
        let avg = mean(values.iter()).unwrap();
        assert_eq!(round_to(avg, 1), Decimal::from_str("4.7").unwrap());
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(
            round_to(Decimal::from_str("0.125").unwrap(), 2),
            Decimal::from_str("0.12").unwrap()
        );
    }

    #[test]
    fn normalize_column_name_lowercases_and_replaces_symbols() {
        assert_eq!(normalize_column_name("Hotel Name"), "hotel_name");
        assert_eq!(normalize_column_name(" Price-Per-Night "), "price_per_night");
    }
}
