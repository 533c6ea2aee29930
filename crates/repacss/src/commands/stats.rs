//! Power statistics command handler.

use serde::Serialize;
use tabled::Tabled;

use repacss_core::stats::cumulative_energy;
use repacss_core::{CumulativePoint, PowerStats, PowerUnit, Series};
use repacss_data::load_result_set;

use crate::cli::StatsArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct StatsReport {
    metric: String,
    hostname: String,
    unit: PowerUnit,
    #[serde(flatten)]
    stats: PowerStats,
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.precision$}"))
}

fn detail(r: &StatsReport) -> String {
    let s = &r.stats;
    [
        format!("Metric:          {} ({})", r.metric, r.unit),
        format!("Host:            {}", r.hostname),
        format!("Samples:         {}", s.count),
        format!("Mean (W):        {:.2}", s.mean_power_w),
        format!("Median (W):      {:.2}", s.median_power_w),
        format!("Std dev (W):     {}", opt(s.std_power_w, 2)),
        format!("Min (W):         {:.2}", s.min_power_w),
        format!("Max (W):         {:.2}", s.max_power_w),
        format!("Q25 / Q75 (W):   {:.2} / {:.2}", s.q25_power_w, s.q75_power_w),
        format!("Span (h):        {}", opt(s.time_range_hours, 3)),
        format!("Points / hour:   {}", opt(s.data_points_per_hour, 1)),
        format!("Energy (kWh):    {}", output::kwh(s.total_energy_kwh)),
    ]
    .join("\n")
}

#[derive(Tabled)]
struct CumulativeRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Power (W)")]
    power: String,
    #[tabled(rename = "Interval (s)")]
    interval: String,
    #[tabled(rename = "Interval (kWh)")]
    interval_kwh: String,
    #[tabled(rename = "Cumulative (kWh)")]
    cumulative: String,
}

impl From<&CumulativePoint> for CumulativeRow {
    fn from(p: &CumulativePoint) -> Self {
        Self {
            timestamp: p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            power: format!("{:.2}", p.power_w),
            interval: opt(p.interval_seconds, 0),
            interval_kwh: p.interval_kwh.map_or_else(|| "-".into(), output::kwh),
            cumulative: output::kwh(p.cumulative_kwh),
        }
    }
}

pub fn handle(args: StatsArgs, settings: &Settings) -> Result<(), CliError> {
    let hostname = settings.hostname(args.hostname)?;
    let set = load_result_set(&args.file)?;
    let metric = util::metric_name(&args.file);
    let unit = util::resolve_unit(args.unit.as_deref(), &set, &metric);
    let series = Series::from_result_set(&set, &unit, &hostname)?;

    let no_data = || CliError::NoData {
        hostname: hostname.clone(),
        source_name: args.file.display().to_string(),
    };

    let out = if args.cumulative {
        let points = cumulative_energy(&series);
        if points.is_empty() {
            return Err(no_data());
        }
        output::render_list(settings.output, &points, |p| CumulativeRow::from(p), |p| {
            p.cumulative_kwh.to_string()
        })?
    } else {
        let stats = PowerStats::from_series(&series).ok_or_else(no_data)?;
        let report = StatsReport {
            metric,
            hostname: hostname.clone(),
            unit,
            stats,
        };
        output::render_single(settings.output, &report, detail, |r| {
            r.stats.total_energy_kwh.to_string()
        })?
    };
    output::print_output(&out, settings.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(opt(None, 2), "-");
        assert_eq!(opt(Some(1.234_56), 2), "1.23");
        assert_eq!(opt(Some(60.0), 0), "60");
    }
}
