//! Per-record field normalization
//!
//! Two fields are rewritten and nothing else is touched:
//!
//! - `friends`: `"Tom, Jerry , Spike"` becomes `["Tom", "Jerry", "Spike"]`
//! - `born_at`: any common date/time spelling becomes an RFC 3339 UTC
//!   timestamp such as `2020-05-01T15:30:00+00:00`, or `null`
//!
//! Values without an offset are read as UTC. Date-only values are midnight UTC.

use crate::record::{Record, FIELD_BORN_AT, FIELD_FRIENDS};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Layouts that carry an explicit offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
    "%Y/%m/%d %H:%M:%S%.f %z",
];

/// Layouts without an offset, read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%b %d, %Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// A `born_at` value that matches no known layout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date/time format: {value:?}")]
pub struct BornAtParseError {
    value: String,
}

/// Applies the field rules to one record at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize `friends` and `born_at`, returning the same record
    pub fn transform(&self, mut record: Record) -> Record {
        let friends = normalize_friends(record.get(FIELD_FRIENDS));
        record.insert(FIELD_FRIENDS, Value::from(friends));

        let born_at = match record.get(FIELD_BORN_AT) {
            Some(Value::String(raw)) if !raw.is_empty() => match parse_born_at(raw) {
                Ok(instant) => Value::String(to_canonical(instant)),
                Err(err) => {
                    warn!(
                        "Could not parse born_at for animal {}: {}, error: {}",
                        record.id_label(),
                        raw,
                        err
                    );
                    Value::Null
                }
            },
            _ => Value::Null,
        };
        record.insert(FIELD_BORN_AT, born_at);

        record
    }
}

/// Split a comma-delimited list, trimming entries and dropping empty ones
pub fn split_friends(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_friends(raw: Option<&Value>) -> Vec<String> {
    match raw {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => split_friends(s),
        // Already transformed
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => {
            debug!(value = %other, "Ignoring non-string friends value");
            Vec::new()
        }
    }
}

/// Parse a date/time in any supported layout and convert it to UTC
pub fn parse_born_at(raw: &str) -> Result<DateTime<Utc>, BornAtParseError> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::<FixedOffset>::parse_from_str(value, fmt).ok())
    {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Ok(naive.and_utc());
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc());
    }

    Err(BornAtParseError {
        value: raw.to_string(),
    })
}

/// RFC 3339 with a `+00:00` offset; fractional seconds only when present
pub fn to_canonical(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
