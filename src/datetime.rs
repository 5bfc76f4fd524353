//! Timestamp parsing and formatting shared by the fetcher, the store and the
//! query service.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::ValidationError;

/// Offset-less layouts accepted for query bounds, most specific first.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Layouts seen in feeds that carry an explicit offset but are not strict
/// RFC 2822 / RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Layouts without an offset; values are taken as UTC.
const NAIVE_FEED_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a user supplied query bound in `tz` and convert it to UTC.
///
/// An explicit RFC 3339 offset overrides `tz`. A bare date means midnight.
/// Local times skipped by a DST transition are rejected; repeated ones resolve
/// to the earlier instant.
pub fn parse_local(field: &'static str, value: &str, tz: Tz) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| ValidationError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(ValidationError::NonexistentLocalTime {
            field,
            value: value.to_string(),
        }),
    }
}

/// Lenient publish-date parser for feed entries.
///
/// Returns `None` when nothing matches; the fetcher treats that as fatal.
pub fn parse_feed_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Some feeds get the weekday wrong, which chrono rejects as inconsistent.
    let value = strip_weekday(value);
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // Named zones chrono's %z cannot read.
    let (body, named_offset) = split_zone_name(value);
    if let Some(offset) = named_offset {
        return OFFSET_FORMATS
            .iter()
            .chain(NAIVE_FEED_FORMATS)
            .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc));
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::<FixedOffset>::parse_from_str(value, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FEED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn strip_weekday(value: &str) -> &str {
    match value.split_once(',') {
        Some((day, rest)) if day.len() <= 9 && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => value,
    }
}

fn split_zone_name(value: &str) -> (&str, Option<FixedOffset>) {
    let Some((body, zone)) = value.rsplit_once(' ') else {
        return (value, None);
    };
    let hours = match zone {
        "GMT" | "UTC" | "UT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return (value, None),
    };
    (body, FixedOffset::east_opt(hours * 3600))
}

/// Fixed-width UTC text used for storage, so lexical order is time order.
pub fn to_storage(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn from_storage(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
