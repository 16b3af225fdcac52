//! Date and time helpers for GTFS schedule values.
//!
//! GTFS dates are `YYYYMMDD` strings and stop times are `HH:MM:SS` offsets
//! from the start of the service day, where the hour can run past 23 for
//! trips that continue after midnight.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Error returned when a GTFS date or time string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}': {reason}")]
pub struct TimeError {
    kind: &'static str,
    value: String,
    reason: &'static str,
}

impl TimeError {
    fn date(value: &str, reason: &'static str) -> Self {
        Self {
            kind: "date",
            value: value.to_string(),
            reason,
        }
    }

    fn time(value: &str, reason: &'static str) -> Self {
        Self {
            kind: "time",
            value: value.to_string(),
            reason,
        }
    }
}

/// Parses a GTFS service date in `YYYYMMDD` form.
pub fn parse_service_date(value: &str) -> Result<NaiveDate, TimeError> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::date(value, "expected YYYYMMDD"));
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|_| TimeError::date(value, "no such calendar day"))
}

/// Formats a date in the canonical GTFS `YYYYMMDD` form.
pub fn format_service_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses an `HH:MM:SS` stop time into an offset from the start of the
/// service day.
///
/// The hour is read as a plain number, so `25:30:00` is 25.5 hours. A
/// single-digit hour (`7:05:00`) is accepted since many feeds write it.
///
/// ```
/// use next_buses::time::parse_departure_offset;
/// use chrono::Duration;
///
/// assert_eq!(
///     parse_departure_offset("25:30:00").unwrap(),
///     Duration::hours(25) + Duration::minutes(30)
/// );
/// assert!(parse_departure_offset("12:60:00").is_err());
/// ```
pub fn parse_departure_offset(value: &str) -> Result<Duration, TimeError> {
    let mut parts = value.split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TimeError::time(value, "expected HH:MM:SS"));
    };

    if hours.is_empty() || hours.len() > 3 || !hours.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::time(value, "invalid hour digits"));
    }
    let hours: i64 = hours
        .parse()
        .map_err(|_| TimeError::time(value, "invalid hour digits"))?;

    let minutes = parse_two_digits(minutes.as_bytes())
        .ok_or_else(|| TimeError::time(value, "invalid minute digits"))?;
    if minutes > 59 {
        return Err(TimeError::time(value, "minute must be 0-59"));
    }

    let seconds = parse_two_digits(seconds.as_bytes())
        .ok_or_else(|| TimeError::time(value, "invalid second digits"))?;
    if seconds > 59 {
        return Err(TimeError::time(value, "second must be 0-59"));
    }

    Ok(Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds))
}

fn parse_two_digits(bytes: &[u8]) -> Option<i64> {
    match bytes {
        [tens @ b'0'..=b'9', ones @ b'0'..=b'9'] => {
            Some(i64::from(tens - b'0') * 10 + i64::from(ones - b'0'))
        }
        _ => None,
    }
}

/// Returns local midnight of `date` in `tz`.
///
/// When midnight is repeated by a DST change the earlier instant is used.
/// Returns `None` if midnight does not exist on that day in the zone.
pub fn service_day_start(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).earliest()
}

/// The current calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
