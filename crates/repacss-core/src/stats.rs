// ── Power statistics ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Series;
use crate::time::seconds_between;
use crate::units::joules_to_kwh;

/// Summary statistics over a Watts series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerStats {
    pub count: usize,
    pub mean_power_w: f64,
    pub median_power_w: f64,
    /// Sample standard deviation; absent below two points.
    pub std_power_w: Option<f64>,
    pub min_power_w: f64,
    pub max_power_w: f64,
    pub q25_power_w: f64,
    pub q75_power_w: f64,
    pub time_range_hours: Option<f64>,
    pub data_points_per_hour: Option<f64>,
    pub total_energy_kwh: f64,
}

impl PowerStats {
    /// `None` for an empty series.
    pub fn from_series(series: &Series) -> Option<Self> {
        let watts = series.watts();
        if watts.is_empty() {
            return None;
        }
        let cumulative = cumulative_energy(series);
        let mut sorted = watts.clone();
        sorted.sort_by(f64::total_cmp);

        let count = watts.len();
        let n = as_f64(count);
        let mean = watts.iter().sum::<f64>() / n;
        let std = (count > 1).then(|| {
            let var = watts.iter().map(|w| (w - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        });

        let (time_range_hours, data_points_per_hour) = match series.data_window() {
            Some(window) if count > 1 => {
                let hours = window.duration_secs() / 3600.0;
                let per_hour = if hours > 0.0 { n / hours } else { 0.0 };
                (Some(hours), Some(per_hour))
            }
            _ => (None, None),
        };

        Some(Self {
            count,
            mean_power_w: mean,
            median_power_w: quantile(&sorted, 0.5)?,
            std_power_w: std,
            min_power_w: *sorted.first()?,
            max_power_w: *sorted.last()?,
            q25_power_w: quantile(&sorted, 0.25)?,
            q75_power_w: quantile(&sorted, 0.75)?,
            time_range_hours,
            data_points_per_hour,
            total_energy_kwh: cumulative.last().map_or(0.0, |p| p.cumulative_kwh),
        })
    }
}

/// Linear-interpolated quantile of an ascending slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (*sorted.get(lo)?, *sorted.get(hi)?);
    Some(a + (b - a) * (pos - lo as f64))
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

// ── Cumulative energy ────────────────────────────────────────────────

/// One row of a running energy total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub timestamp: DateTime<Utc>,
    pub power_w: f64,
    /// Absent on the first row.
    pub interval_seconds: Option<f64>,
    pub avg_power_w: Option<f64>,
    pub interval_kwh: Option<f64>,
    pub cumulative_kwh: f64,
}

/// Trapezoid energy per interval and the running total, in time order.
pub fn cumulative_energy(series: &Series) -> Vec<CumulativePoint> {
    let mut out: Vec<CumulativePoint> = Vec::with_capacity(series.len());
    let mut running = 0.0;
    let mut prev: Option<(DateTime<Utc>, f64)> = None;

    for (timestamp, power_w) in series.points() {
        let (interval_seconds, avg_power_w, interval_kwh) = match prev {
            Some((t0, p0)) => {
                let dt = seconds_between(t0, timestamp);
                let avg = (p0 + power_w) / 2.0;
                let kwh = joules_to_kwh(avg * dt);
                running += kwh;
                (Some(dt), Some(avg), Some(kwh))
            }
            None => (None, None, None),
        };
        out.push(CumulativePoint {
            timestamp,
            power_w,
            interval_seconds,
            avg_power_w,
            interval_kwh,
            cumulative_kwh: running,
        });
        prev = Some((timestamp, power_w));
    }
    out
}
