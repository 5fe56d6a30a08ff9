//! Date handling of the SVT apis.
//!
//! Values ending in `Z` are UTC and shown in Swedish local time. Anything
//! else already is local time, possibly followed by an offset that is
//! dropped.

use chrono::{NaiveDateTime, TimeZone, Utc};
use chrono_tz::Europe::Stockholm;

use crate::channel::error::ChannelError;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn strip_fraction(value: &str) -> &str {
    value.split('.').next().unwrap_or(value)
}

fn parse_naive(value: &str, format: &str) -> Result<NaiveDateTime, ChannelError> {
    NaiveDateTime::parse_from_str(value, format)
        .map_err(|e| ChannelError::ValidationError(format!("invalid date '{value}': {e}")))
}

fn is_utc(value: &str) -> bool {
    value.ends_with('Z') || value.ends_with('z')
}

/// Parses a UTC timestamp (with or without `Z` suffix) into Stockholm local time.
pub fn utc_to_local(value: &str) -> Result<NaiveDateTime, ChannelError> {
    let trimmed = value.trim_end_matches(['Z', 'z']);
    let utc = parse_naive(strip_fraction(trimmed), DATE_FORMAT)?;
    Ok(Utc
        .from_utc_datetime(&utc)
        .with_timezone(&Stockholm)
        .naive_local())
}

/// Parses a local timestamp, ignoring fractional seconds and a `+hh:mm` offset.
pub fn parse_local(value: &str) -> Result<NaiveDateTime, ChannelError> {
    let without_offset = value.split('+').next().unwrap_or(value);
    parse_naive(strip_fraction(without_offset), DATE_FORMAT)
}

/// Parses any api timestamp into Stockholm local time.
pub fn parse_api_date(value: &str) -> Result<NaiveDateTime, ChannelError> {
    if is_utc(value) {
        utc_to_local(value)
    } else {
        parse_local(value)
    }
}

/// Parses a `validTo` value. Far-future placeholder dates (fifty years or
/// more after `current_year`) mean "does not expire" and yield `None`.
pub fn parse_expire_date(
    value: &str,
    current_year: i32,
) -> Result<Option<NaiveDateTime>, ChannelError> {
    if is_utc(value) {
        return utc_to_local(value).map(Some);
    }

    let local = value.split('+').next().unwrap_or(value).replace('T', " ");
    let year = local.split('-').next().unwrap_or_default();
    let year_value = year
        .parse::<i32>()
        .map_err(|_| ChannelError::ValidationError(format!("invalid year in '{value}'")))?;

    if year.len() != 4 || year_value >= current_year + 50 {
        return Ok(None);
    }

    parse_naive(strip_fraction(&local), "%Y-%m-%d %H:%M:%S").map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_summer_and_winter_offsets() {
        // CEST is UTC+2, CET is UTC+1
        assert_eq!(
            parse_api_date("2021-06-01T18:00:00Z").unwrap().to_string(),
            "2021-06-01 20:00:00"
        );
        assert_eq!(
            parse_api_date("2021-01-15T23:30:00.000Z").unwrap().to_string(),
            "2021-01-16 00:30:00"
        );
    }

    #[test]
    fn test_local_with_offset() {
        assert_eq!(
            parse_api_date("2021-06-01T18:00:00+02:00").unwrap().to_string(),
            "2021-06-01 18:00:00"
        );
        assert!(parse_api_date("yesterday").is_err());
    }

    #[test]
    fn test_expire_date() {
        assert_eq!(
            parse_expire_date("2022-03-31T23:59:00+02:00", 2021)
                .unwrap()
                .map(|d| d.to_string()),
            Some("2022-03-31 23:59:00".to_string())
        );
        assert_eq!(parse_expire_date("9999-12-31T00:00:00", 2021).unwrap(), None);
        assert_eq!(
            parse_expire_date("2022-03-31T21:59:00z", 2021)
                .unwrap()
                .map(|d| d.to_string()),
            Some("2022-03-31 23:59:00".to_string())
        );
        assert!(parse_expire_date("soon", 2021).is_err());
    }
}
