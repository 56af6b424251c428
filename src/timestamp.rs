//! Archive timestamp parsing and timezone normalization.
//!
//! The Wayback Machine indexes every capture under a fixed-width numeric
//! timestamp (`YYYYMMDDhhmmss`, always UTC). Everything downstream of the
//! capture index compares instants, not strings, so this module is the one
//! place where wire-format strings become [`DateTime<Utc>`] values:
//!
//! - Strict 14-digit parsing for capture timestamps (anything else is
//!   flagged, never silently misparsed)
//! - Formatting instants back into the archive's wire format
//! - CLI-facing parsing for period bounds and UTC offsets
//!
//! Timezone defaults are explicit: callers pass a [`FixedOffset`] instead of
//! relying on the host zone, so runs are reproducible across machines.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// The archive's wire format for capture timestamps.
pub const WAYBACK_FORMAT: &str = "%Y%m%d%H%M%S";

static WAYBACK_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{14}$").unwrap());

static OFFSET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])(\d{2}):?(\d{2})?$").unwrap());

/// Errors raised while normalizing timestamps or parsing time arguments.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The string is not 14 digits, so it cannot be an archive timestamp.
    #[error("timestamp `{0}` does not match the 14-digit YYYYMMDDhhmmss archive format")]
    Malformed(String),

    /// The string is 14 digits but names an impossible instant (month 13 etc).
    #[error("timestamp `{0}` is not a valid calendar date/time")]
    InvalidCalendar(String),

    /// A CLI date/time argument matched none of the accepted formats.
    #[error("`{0}` is not a recognized date/time (try RFC 3339, YYYY-MM-DD, or YYYYMMDDhhmmss)")]
    Unparseable(String),

    /// A UTC offset argument could not be parsed.
    #[error("`{0}` is not a valid UTC offset (expected Z, +HH:MM, or -HH:MM)")]
    BadOffset(String),
}

/// Parse a 14-digit archive timestamp into a UTC instant.
///
/// The pattern check and the calendar check are separate so that a
/// 13-digit string and a "month 13" string produce distinct errors —
/// both are dropped by callers, but the log line should say why.
///
/// # Errors
///
/// [`TimestampError::Malformed`] if the string is not exactly 14 digits;
/// [`TimestampError::InvalidCalendar`] if it is but does not name a real
/// instant.
pub fn parse_wayback14(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    if !WAYBACK_PATTERN.is_match(s) {
        return Err(TimestampError::Malformed(s.to_string()));
    }
    let naive = NaiveDateTime::parse_from_str(s, WAYBACK_FORMAT)
        .map_err(|_| TimestampError::InvalidCalendar(s.to_string()))?;
    Ok(naive.and_utc())
}

/// Format a UTC instant in the archive's 14-digit wire format.
pub fn format_wayback14(t: DateTime<Utc>) -> String {
    t.format(WAYBACK_FORMAT).to_string()
}

/// Parse a UTC offset argument such as `Z`, `+05:00`, `-0800`, or `+05`.
///
/// # Errors
///
/// [`TimestampError::BadOffset`] for unrecognized syntax or out-of-range
/// offsets.
pub fn parse_offset(s: &str) -> Result<FixedOffset, TimestampError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(FixedOffset::east_opt(0).expect("zero offset"));
    }
    let caps = OFFSET_PATTERN
        .captures(trimmed)
        .ok_or_else(|| TimestampError::BadOffset(s.to_string()))?;
    let hours: i32 = caps[2].parse().map_err(|_| TimestampError::BadOffset(s.to_string()))?;
    let minutes: i32 = caps
        .get(3)
        .map(|m| m.as_str().parse())
        .transpose()
        .map_err(|_| TimestampError::BadOffset(s.to_string()))?
        .unwrap_or(0);
    let mut secs = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        secs = -secs;
    }
    FixedOffset::east_opt(secs).ok_or_else(|| TimestampError::BadOffset(s.to_string()))
}

/// Parse a period-bound argument into a timezone-aware instant.
///
/// Accepted forms, tried in order:
///
/// 1. RFC 3339 (`2020-01-01T09:00:00-05:00`) — carries its own offset
/// 2. Naive date/times (`2020-01-01 09:00:00`, `2020-01-01T09:00`,
///    `2020-01-01`) — interpreted in `default_offset`
/// 3. The archive's own 14-digit format — interpreted as UTC, then
///    represented in `default_offset`
///
/// # Errors
///
/// [`TimestampError::Unparseable`] when no form matches.
pub fn parse_datetime(
    s: &str,
    default_offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return resolve_local(naive, default_offset, s);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return resolve_local(naive, default_offset, s);
    }

    if let Ok(utc) = parse_wayback14(trimmed) {
        return Ok(utc.with_timezone(&default_offset));
    }

    Err(TimestampError::Unparseable(s.to_string()))
}

fn resolve_local(
    naive: NaiveDateTime,
    offset: FixedOffset,
    original: &str,
) -> Result<DateTime<FixedOffset>, TimestampError> {
    // Fixed offsets have no DST gaps, so this is always a single instant.
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimestampError::Unparseable(original.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_wayback14_valid() {
        let t = parse_wayback14("20200315120000").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2020, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_wayback14_wrong_length() {
        assert!(matches!(
            parse_wayback14("2020031512000"),
            Err(TimestampError::Malformed(_))
        ));
        assert!(matches!(
            parse_wayback14("202003151200000"),
            Err(TimestampError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_wayback14_non_digit() {
        assert!(matches!(
            parse_wayback14("2020-03-15T1200"),
            Err(TimestampError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_wayback14_invalid_calendar() {
        // Month 13 passes the digit check but not the calendar check.
        assert!(matches!(
            parse_wayback14("20201301120000"),
            Err(TimestampError::InvalidCalendar(_))
        ));
    }

    #[test]
    fn test_format_round_trip() {
        let t = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap();
        let s = format_wayback14(t);
        assert_eq!(s, "20191231235959");
        assert_eq!(parse_wayback14(&s).unwrap(), t);
    }

    #[test]
    fn test_parse_offset_utc_aliases() {
        assert_eq!(parse_offset("Z").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_offset("utc").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn test_parse_offset_forms() {
        assert_eq!(parse_offset("+05:00").unwrap().local_minus_utc(), 5 * 3600);
        assert_eq!(parse_offset("-0800").unwrap().local_minus_utc(), -8 * 3600);
        assert_eq!(
            parse_offset("+05:30").unwrap().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert_eq!(parse_offset("+05").unwrap().local_minus_utc(), 5 * 3600);
    }

    #[test]
    fn test_parse_offset_rejects_garbage() {
        assert!(parse_offset("EST").is_err());
        assert!(parse_offset("+99:00").is_err());
        assert!(parse_offset("5:00").is_err());
    }

    #[test]
    fn test_parse_datetime_rfc3339_keeps_offset() {
        let utc = parse_offset("Z").unwrap();
        let dt = parse_datetime("2020-01-01T09:00:00-05:00", utc).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(dt.with_timezone(&Utc).hour(), 14);
    }

    #[test]
    fn test_parse_datetime_naive_uses_default() {
        let est = parse_offset("-05:00").unwrap();
        let dt = parse_datetime("2020-01-01 09:00:00", est).unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(dt.with_timezone(&Utc).hour(), 14);
    }

    #[test]
    fn test_parse_datetime_bare_date_is_midnight() {
        let utc = parse_offset("Z").unwrap();
        let dt = parse_datetime("2020-06-01", utc).unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.minute(), 0);
    }

    #[test]
    fn test_parse_datetime_wayback_form() {
        let utc = parse_offset("Z").unwrap();
        let dt = parse_datetime("20200101090000", utc).unwrap();
        assert_eq!(dt.with_timezone(&Utc).hour(), 9);
    }

    #[test]
    fn test_parse_datetime_garbage() {
        let utc = parse_offset("Z").unwrap();
        assert!(matches!(
            parse_datetime("next tuesday", utc),
            Err(TimestampError::Unparseable(_))
        ));
    }
}
