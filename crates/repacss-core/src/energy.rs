// ── Energy integration ──
//
// Trapezoidal integration of Watts over time, accumulated in Joules and
// reported in kWh. Where the data does not reach the query window edges the
// nearest observed power is held constant across the gap.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::boundary::{BoundaryDecision, BoundaryPolicy};
use crate::error::CoreError;
use crate::model::{QueryWindow, RawSample, ResultSet, Series};
use crate::time::seconds_between;
use crate::units::{PowerUnit, joules_to_kwh};

/// Integrate `(timestamp, watts)` points, sorted ascending, to kWh.
///
/// With two or more points the result is the trapezoid area plus edge-hold
/// estimates for any lead-in before the first point and tail after the last.
/// A single point only has meaning against a fully bounded window, where the
/// whole window is held at that power and no edge estimate is added.
/// The result is never negative.
pub fn integrate(points: &[(DateTime<Utc>, f64)], window: QueryWindow) -> f64 {
    let (Some(&(data_start, first_power)), Some(&(data_end, last_power))) =
        (points.first(), points.last())
    else {
        return 0.0;
    };

    let joules = if points.len() == 1 {
        match (window.start, window.end) {
            (Some(start), Some(end)) => first_power * seconds_between(start, end),
            _ => return 0.0,
        }
    } else {
        let mut joules: f64 = points
            .windows(2)
            .map(|pair| match pair {
                [(t0, p0), (t1, p1)] => (p0 + p1) / 2.0 * seconds_between(*t0, *t1),
                _ => 0.0,
            })
            .sum();
        if let Some(start) = window.start.filter(|start| data_start > *start) {
            joules += first_power * seconds_between(start, data_start);
        }
        if let Some(end) = window.end.filter(|end| data_end < *end) {
            joules += last_power * seconds_between(data_end, end);
        }
        joules
    };

    joules_to_kwh(joules).max(0.0)
}

impl Series {
    /// Energy of this series over `window`, in kWh.
    pub fn energy_kwh(&self, window: QueryWindow) -> f64 {
        integrate(&self.points(), window)
    }
}

/// Energy for `hostname` in `set`, with every value tagged `unit`.
///
/// Fails only when the set lacks timestamp, hostname, or value columns.
/// No matching rows, or nothing left after dropping unparseable rows,
/// yields `0.0`.
pub fn energy_kwh(
    set: &ResultSet,
    unit: &str,
    hostname: &str,
    window: QueryWindow,
) -> Result<f64, CoreError> {
    let series = Series::from_result_set(set, &PowerUnit::parse(unit), hostname)?;
    Ok(series.energy_kwh(window))
}

// ── Boundary-aware energy ────────────────────────────────────────────

/// Energy over one requested window after drift detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowEnergy {
    pub energy_kwh: f64,
    /// Usable samples behind the figure. Zero means "no data", not zero power.
    pub samples: usize,
    /// Present when the window was fully bounded and data existed.
    pub decision: Option<BoundaryDecision>,
    /// The window actually integrated over.
    pub window: QueryWindow,
}

impl WindowEnergy {
    pub fn has_data(&self) -> bool {
        self.samples > 0
    }

    pub fn used_boundaries(&self) -> bool {
        self.decision.is_none_or(|d| d.use_boundaries) && self.window != QueryWindow::unbounded()
    }
}

/// Integrate `hostname` over `window`, letting `policy` decide whether the
/// window edges can be trusted for extension.
pub fn energy_for_window(
    set: &ResultSet,
    unit: &PowerUnit,
    hostname: &str,
    window: QueryWindow,
    policy: &BoundaryPolicy,
) -> Result<WindowEnergy, CoreError> {
    let series = Series::from_result_set(set, unit, hostname)?;
    let Some(data) = series.data_window() else {
        debug!(hostname, "no usable samples in window");
        return Ok(WindowEnergy {
            energy_kwh: 0.0,
            samples: 0,
            decision: None,
            window,
        });
    };

    let (decision, effective) = match (window.start, window.end) {
        (Some(start), Some(end)) => {
            let decision = policy.decide(data, start, end);
            (Some(decision), decision.window(window))
        }
        _ => (None, window),
    };

    Ok(WindowEnergy {
        energy_kwh: series.energy_kwh(effective),
        samples: series.len(),
        decision,
        window: effective,
    })
}

// ── Per-device (FQDD) integration ────────────────────────────────────

/// Energy of each FQDD sub-device of `hostname`, in first-seen order.
///
/// Each device is integrated on its own after summing readings that share a
/// timestamp. A device's unit is its first tagged row, else `default_unit`.
/// Rows without an fqdd are ignored.
pub fn per_device_energy(
    set: &ResultSet,
    default_unit: &PowerUnit,
    hostname: &str,
    window: QueryWindow,
) -> Result<IndexMap<String, f64>, CoreError> {
    set.require_columns()?;

    let mut devices: IndexMap<&str, Vec<&RawSample>> = IndexMap::new();
    for row in set.rows() {
        if row.hostname.as_deref() != Some(hostname) {
            continue;
        }
        if let Some(fqdd) = row.fqdd.as_deref() {
            devices.entry(fqdd).or_default().push(row);
        }
    }

    Ok(devices
        .into_iter()
        .map(|(fqdd, rows)| {
            let unit = rows
                .iter()
                .find_map(|r| r.units.as_deref().filter(|u| !u.is_empty()))
                .map_or_else(|| default_unit.clone(), PowerUnit::parse);
            let series = Series::from_rows(rows.into_iter(), &unit, hostname).summed_by_timestamp();
            let kwh = series.energy_kwh(window);
            debug!(hostname, fqdd, samples = series.len(), kwh, "device energy");
            (fqdd.to_owned(), kwh)
        })
        .collect())
}

/// All devices summed per shared timestamp. For display only: category
/// energy comes from [`per_device_energy`].
pub fn total_series(set: &ResultSet, unit: &PowerUnit, hostname: &str) -> Result<Series, CoreError> {
    Ok(Series::from_result_set(set, unit, hostname)?.summed_by_timestamp())
}
