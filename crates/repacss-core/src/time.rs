// ── Timestamp parsing ──
//
// Telemetry timestamps come back as ISO-8601 text with or without an
// offset. Naive telemetry values are UTC. Energy-window tables are
// spreadsheet exports whose naive times belong to a configurable zone.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Formats seen in energy-window tables. Two-digit years come first so a
/// four-digit year is never read as `%y`.
const TABLE_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a telemetry timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(dt) = parse_with_offset(text) {
        return Some(dt);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a window-table cell. Naive values are interpreted in `tz`.
pub fn parse_table_time(text: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let naive = TABLE_FORMATS
        .iter()
        .chain(NAIVE_FORMATS)
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok());
    match naive {
        Some(naive) => localize(naive, tz),
        None => parse_with_offset(text),
    }
}

/// Resolve a naive local time in `tz`. Ambiguous times take the earlier
/// instant; times inside a DST gap do not exist and yield `None`.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render an instant the way query windows are displayed.
pub fn format_query_time(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Signed seconds from `from` to `to`, with microsecond resolution.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta: TimeDelta = to - from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1000.0,
    }
}

fn parse_with_offset(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
