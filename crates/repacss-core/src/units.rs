// ── Power unit normalization ──
//
// Telemetry arrives in mW, W, or kW depending on the metric. Everything
// downstream works in Watts. Unrecognized labels pass through unchanged:
// partially-tagged data is treated as already-Watts rather than rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Joules per kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

/// A power unit label as reported by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PowerUnit {
    MilliWatt,
    #[default]
    Watt,
    KiloWatt,
    /// Anything else, kept verbatim. Normalizes as Watts.
    Unknown(String),
}

impl PowerUnit {
    /// Parse a label permissively. Matching is case-insensitive and never fails.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "mw" => Self::MilliWatt,
            "w" => Self::Watt,
            "kw" => Self::KiloWatt,
            _ => Self::Unknown(label.to_owned()),
        }
    }

    /// Normalize a single reading to Watts.
    pub fn to_watts(&self, value: f64) -> f64 {
        match self {
            Self::MilliWatt => value / 1000.0,
            Self::KiloWatt => value * 1000.0,
            Self::Watt | Self::Unknown(_) => value,
        }
    }

    /// Normalize an ordered sequence of readings to Watts.
    pub fn series_to_watts(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.to_watts(*v)).collect()
    }

    /// SQL expression that performs the same conversion inside the query.
    pub fn sql_expression(&self, column: &str) -> String {
        match self {
            Self::MilliWatt => format!("{column} / 1000.0"),
            Self::KiloWatt => format!("{column} * 1000.0"),
            Self::Watt | Self::Unknown(_) => column.to_owned(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn label(&self) -> &str {
        match self {
            Self::MilliWatt => "mW",
            Self::Watt => "W",
            Self::KiloWatt => "kW",
            Self::Unknown(label) => label,
        }
    }
}

impl fmt::Display for PowerUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PowerUnit {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for PowerUnit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PowerUnit {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

// ── Free-function forms ──────────────────────────────────────────────

/// Normalize a single reading tagged with `unit` to Watts.
pub fn to_watts(value: f64, unit: &str) -> f64 {
    PowerUnit::parse(unit).to_watts(value)
}

/// Normalize a sequence of readings tagged with `unit` to Watts.
pub fn series_to_watts(values: &[f64], unit: &str) -> Vec<f64> {
    PowerUnit::parse(unit).series_to_watts(values)
}

/// SQL-side conversion, aliased as `value`.
pub fn to_watts_sql(column: &str, unit: &str) -> String {
    format!("{} AS value", PowerUnit::parse(unit).sql_expression(column))
}

pub fn joules_to_kwh(joules: f64) -> f64 {
    joules / JOULES_PER_KWH
}

// ── Unit info ────────────────────────────────────────────────────────

/// What a label converts from, to, and whether any scaling happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitInfo {
    pub original_unit: String,
    pub converted_unit: String,
    pub conversion_applied: bool,
}

impl UnitInfo {
    pub fn for_label(label: &str) -> Self {
        let unit = if label.is_empty() {
            PowerUnit::Watt
        } else {
            PowerUnit::parse(label)
        };
        let conversion_applied = matches!(unit, PowerUnit::MilliWatt | PowerUnit::KiloWatt);
        Self {
            original_unit: unit.label().to_owned(),
            converted_unit: "W".into(),
            conversion_applied,
        }
    }
}
