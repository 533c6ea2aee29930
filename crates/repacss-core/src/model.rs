// ── Telemetry data model ──
//
// `ResultSet` is what the data layer hands over: raw rows plus the set of
// columns that were actually present. `Series` is the parsed, host-filtered,
// time-sorted form the integrator works on.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::time::{parse_timestamp, seconds_between};
use crate::units::PowerUnit;

// ── Columns ──────────────────────────────────────────────────────────

/// A recognized result-set column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Column {
    Timestamp,
    Hostname,
    Value,
    Units,
    Fqdd,
    Source,
}

impl Column {
    /// Columns the integrator cannot work without.
    pub const REQUIRED: [Self; 3] = [Self::Timestamp, Self::Hostname, Self::Value];

    /// Match a header cell. Case-insensitive; `unit` is accepted for `units`.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_ascii_lowercase().as_str() {
            "timestamp" => Some(Self::Timestamp),
            "hostname" => Some(Self::Hostname),
            "value" => Some(Self::Value),
            "units" | "unit" => Some(Self::Units),
            "fqdd" => Some(Self::Fqdd),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

// ── Raw rows ─────────────────────────────────────────────────────────

/// A timestamp as delivered: already an instant, or text still to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    Instant(DateTime<Utc>),
    Text(String),
}

impl RawTimestamp {
    /// The UTC instant, if the value can be read as one.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(dt) => Some(*dt),
            Self::Text(text) => parse_timestamp(text),
        }
    }
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Instant(dt)
    }
}

impl From<&str> for RawTimestamp {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for RawTimestamp {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// One row of a result set. Every field may be null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub timestamp: Option<RawTimestamp>,
    pub hostname: Option<String>,
    pub value: Option<f64>,
    pub units: Option<String>,
    pub fqdd: Option<String>,
    pub source: Option<String>,
}

impl RawSample {
    pub fn new(timestamp: impl Into<RawTimestamp>, hostname: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            hostname: Some(hostname.into()),
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_fqdd(mut self, fqdd: impl Into<String>) -> Self {
        self.fqdd = Some(fqdd.into());
        self
    }

    fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(RawTimestamp::resolve)
    }
}

// ── Result set ───────────────────────────────────────────────────────

/// A tabular query result: rows plus the columns the source provided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: BTreeSet<Column>,
    rows: Vec<RawSample>,
}

impl ResultSet {
    pub fn new(columns: impl IntoIterator<Item = Column>, rows: Vec<RawSample>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            rows,
        }
    }

    /// Build a set whose columns are inferred from the rows. The required
    /// columns are always present; optional ones appear when any row has them.
    pub fn from_rows(rows: Vec<RawSample>) -> Self {
        let mut columns: BTreeSet<Column> = Column::REQUIRED.into_iter().collect();
        if rows.iter().any(|r| r.units.is_some()) {
            columns.insert(Column::Units);
        }
        if rows.iter().any(|r| r.fqdd.is_some()) {
            columns.insert(Column::Fqdd);
        }
        if rows.iter().any(|r| r.source.is_some()) {
            columns.insert(Column::Source);
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn rows(&self) -> &[RawSample] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn missing_required(&self) -> Vec<Column> {
        Column::REQUIRED
            .into_iter()
            .filter(|c| !self.columns.contains(c))
            .collect()
    }

    /// Fail with `InvalidInput` unless timestamp, hostname, and value exist.
    pub fn require_columns(&self) -> Result<(), CoreError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InvalidInput {
                missing: missing.iter().map(ToString::to_string).collect(),
            })
        }
    }

    /// The unit tag of the first row that carries one.
    pub fn unit(&self) -> Option<&str> {
        self.rows
            .iter()
            .find_map(|r| r.units.as_deref().filter(|u| !u.is_empty()))
    }

    /// Distinct hostnames in first-seen order.
    pub fn hostnames(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter_map(|r| r.hostname.as_deref())
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Keep only the rows matching `keep`, preserving columns.
    pub fn filter(&self, mut keep: impl FnMut(&RawSample) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Rows for `hostname` whose timestamp falls in `[start, end]`.
    /// Rows with unparseable timestamps are left out.
    pub fn within(&self, hostname: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.filter(|r| {
            r.hostname.as_deref() == Some(hostname)
                && r.instant().is_some_and(|t| t >= start && t <= end)
        })
    }
}

// ── Parsed samples ───────────────────────────────────────────────────

/// One telemetry reading with a resolved timestamp. `value` is raw, in the
/// unit of the series it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSample {
    pub timestamp: DateTime<Utc>,
    pub hostname: String,
    pub value: f64,
    pub fqdd: Option<String>,
}

/// Time-sorted samples for one host, sharing one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    hostname: String,
    unit: PowerUnit,
    samples: Vec<PowerSample>,
}

impl Series {
    /// Sorts `samples` ascending by timestamp. Equal timestamps keep their
    /// input order.
    pub fn new(hostname: impl Into<String>, unit: PowerUnit, mut samples: Vec<PowerSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            hostname: hostname.into(),
            unit,
            samples,
        }
    }

    /// Filter `set` to `hostname`, parse timestamps, and sort.
    ///
    /// Rows with a null value or an unparseable timestamp are dropped.
    pub fn from_result_set(
        set: &ResultSet,
        unit: &PowerUnit,
        hostname: &str,
    ) -> Result<Self, CoreError> {
        set.require_columns()?;
        Ok(Self::from_rows(
            set.rows()
                .iter()
                .filter(|r| r.hostname.as_deref() == Some(hostname)),
            unit,
            hostname,
        ))
    }

    pub(crate) fn from_rows<'a>(
        rows: impl Iterator<Item = &'a RawSample>,
        unit: &PowerUnit,
        hostname: &str,
    ) -> Self {
        let mut dropped = 0usize;
        let samples: Vec<PowerSample> = rows
            .filter_map(|row| {
                let parsed = row.instant().zip(row.value.filter(|v| v.is_finite()));
                if parsed.is_none() {
                    dropped += 1;
                }
                let (timestamp, value) = parsed?;
                Some(PowerSample {
                    timestamp,
                    hostname: hostname.to_owned(),
                    value,
                    fqdd: row.fqdd.clone(),
                })
            })
            .collect();
        if dropped > 0 {
            debug!(hostname, dropped, "dropped rows without a usable timestamp or value");
        }
        Self::new(hostname, unit.clone(), samples)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn unit(&self) -> &PowerUnit {
        &self.unit
    }

    pub fn samples(&self) -> &[PowerSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// `(timestamp, watts)` pairs in time order.
    pub fn points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.samples
            .iter()
            .map(|s| (s.timestamp, self.unit.to_watts(s.value)))
            .collect()
    }

    /// Readings normalized to Watts.
    pub fn watts(&self) -> Vec<f64> {
        self.samples.iter().map(|s| self.unit.to_watts(s.value)).collect()
    }

    /// The span actually covered by the samples.
    pub fn data_window(&self) -> Option<DataWindow> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some(DataWindow {
            start: first.timestamp,
            end: last.timestamp,
        })
    }

    /// Collapse samples sharing a timestamp into one by summing their values.
    pub fn summed_by_timestamp(&self) -> Self {
        let mut merged: Vec<PowerSample> = Vec::with_capacity(self.samples.len());
        for sample in &self.samples {
            match merged.last_mut() {
                Some(prev) if prev.timestamp == sample.timestamp => {
                    prev.value += sample.value;
                    if prev.fqdd != sample.fqdd {
                        prev.fqdd = None;
                    }
                }
                _ => merged.push(sample.clone()),
            }
        }
        Self {
            hostname: self.hostname.clone(),
            unit: self.unit.clone(),
            samples: merged,
        }
    }
}

// ── Windows ──────────────────────────────────────────────────────────

/// The time range originally requested. Either side may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl QueryWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Both edges are known.
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn duration_secs(&self) -> Option<f64> {
        Some(seconds_between(self.start?, self.end?))
    }
}

/// `[min(timestamp), max(timestamp)]` of the data actually returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DataWindow {
    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(ts: &str, host: &str, value: f64) -> RawSample {
        RawSample::new(ts, host, value)
    }

    #[test]
    fn header_matching_is_case_insensitive() {
        assert_eq!(Column::from_header(" Timestamp "), Some(Column::Timestamp));
        assert_eq!(Column::from_header("UNIT"), Some(Column::Units));
        assert_eq!(Column::from_header("units"), Some(Column::Units));
        assert_eq!(Column::from_header("metric"), None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let set = ResultSet::new([Column::Timestamp, Column::Value], vec![]);
        let err = set.require_columns().unwrap_err();
        match err {
            CoreError::InvalidInput { missing } => assert_eq!(missing, vec!["hostname"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unit_comes_from_first_tagged_row() {
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 10:00:00", "rpg-93-1", 1.0),
            sample("2025-05-01 10:01:00", "rpg-93-1", 1.0).with_units("mW"),
            sample("2025-05-01 10:02:00", "rpg-93-1", 1.0).with_units("W"),
        ]);
        assert_eq!(set.unit(), Some("mW"));
        assert!(set.has_column(Column::Units));
        assert!(!set.has_column(Column::Fqdd));
    }

    #[test]
    fn hostnames_keep_first_seen_order() {
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 10:00:00", "b", 1.0),
            sample("2025-05-01 10:00:00", "a", 1.0),
            sample("2025-05-01 10:01:00", "b", 1.0),
        ]);
        assert_eq!(set.hostnames(), vec!["b", "a"]);
    }

    #[test]
    fn series_sorts_and_drops_bad_rows() {
        let mut nulled = sample("2025-05-01 10:03:00", "h", 0.0);
        nulled.value = None;
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 10:02:00", "h", 2.0),
            sample("garbage", "h", 9.0),
            sample("2025-05-01 10:00:00", "h", 1.0),
            sample("2025-05-01 10:01:00", "other", 5.0),
            nulled,
        ]);
        let series = Series::from_result_set(&set, &PowerUnit::Watt, "h").unwrap();
        assert_eq!(series.watts(), vec![1.0, 2.0]);
        let window = series.data_window().unwrap();
        assert_eq!(window.duration_secs(), 120.0);
    }

    #[test]
    fn non_finite_readings_are_dropped() {
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 10:00:00", "h", 100.0),
            sample("2025-05-01 10:01:00", "h", 100.0),
            sample("2025-05-01 10:02:00", "h", f64::NAN),
            sample("2025-05-01 10:03:00", "h", f64::INFINITY),
            sample("2025-05-01 10:04:00", "h", f64::NEG_INFINITY),
        ]);
        let series = Series::from_result_set(&set, &PowerUnit::Watt, "h").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.watts(), vec![100.0, 100.0]);
    }

    #[test]
    fn summing_by_timestamp_merges_duplicates() {
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 10:00:00", "h", 1.0).with_fqdd("GPU.1"),
            sample("2025-05-01 10:00:00", "h", 2.0).with_fqdd("GPU.2"),
            sample("2025-05-01 10:01:00", "h", 4.0).with_fqdd("GPU.1"),
        ]);
        let series = Series::from_result_set(&set, &PowerUnit::Watt, "h")
            .unwrap()
            .summed_by_timestamp();
        assert_eq!(series.watts(), vec![3.0, 4.0]);
        assert_eq!(series.samples()[0].fqdd, None);
        assert_eq!(series.samples()[1].fqdd.as_deref(), Some("GPU.1"));
    }

    #[test]
    fn within_is_inclusive() {
        let set = ResultSet::from_rows(vec![
            sample("2025-05-01 09:59:59", "h", 1.0),
            sample("2025-05-01 10:00:00", "h", 2.0),
            sample("2025-05-01 10:10:00", "h", 3.0),
            sample("2025-05-01 10:10:00", "x", 3.0),
        ]);
        let start = parse_timestamp("2025-05-01 10:00:00").unwrap();
        let end = parse_timestamp("2025-05-01 10:10:00").unwrap();
        assert_eq!(set.within("h", start, end).len(), 2);
    }

    #[test]
    fn raw_instant_displays_with_offset() {
        let ts = RawTimestamp::from(parse_timestamp("2025-05-01 10:00:00").unwrap());
        assert_eq!(ts.to_string(), "2025-05-01 10:00:00+00:00");
    }
}
