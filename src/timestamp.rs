//! Timestamp strings.
//!
//! Timestamps are stored as text in the form `YYYY-MM-DD HH:MM:SS[.ffffff]+HH:MM`, the
//! fraction only when there are sub-second microseconds. [`normalize`] accepts what
//! callers typically have at hand and produces that form; naive inputs are taken as UTC.

use crate::error::OrmError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt::Display;

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// The current time in UTC
pub fn now() -> String {
    format(&Utc::now())
}

/// Render a zone-aware timestamp
pub fn format<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if timestamp.timestamp_subsec_micros() == 0 {
        timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string()
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
    }
}

/// Normalize an optional timestamp string
///
/// - `None` becomes the current time in UTC
/// - RFC 3339 and `YYYY-MM-DD HH:MM:SS[.f]±HH:MM` keep their offset
/// - naive date-times and bare dates are localized to UTC
///
/// # Errors
///
/// [`OrmError::InvalidTimestamp`] if the string matches none of those forms.
///
/// # Examples
///
/// ```
/// use docguard::timestamp::normalize;
///
/// assert_eq!(normalize(Some("2024-03-01 12:30:00")).unwrap(), "2024-03-01 12:30:00+00:00");
/// assert!(normalize(Some("next tuesday")).is_err());
/// ```
pub fn normalize(value: Option<&str>) -> Result<String, OrmError> {
    let Some(raw) = value else {
        return Ok(now());
    };
    let raw = raw.trim();
    parse(raw)
        .map(|parsed| format(&parsed))
        .ok_or_else(|| OrmError::InvalidTimestamp(format!("cannot parse {raw:?}")))
}

fn parse(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    if let Some(parsed) = AWARE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(parsed);
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive).fixed_offset())
}
