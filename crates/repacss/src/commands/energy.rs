//! Energy command handler.
//!
//! Files load on the blocking pool in parallel, then every (file, host)
//! pair integrates as its own task. Results are reported in argument order.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use repacss_core::{
    BoundaryPolicy, PowerUnit, QueryWindow, ResultSet, Series, WindowEnergy, energy_for_window,
};
use repacss_data::load_result_set;

use crate::cli::EnergyArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct EnergyReport {
    metric: String,
    hostname: String,
    energy_kwh: f64,
    samples: usize,
    unit: PowerUnit,
    boundaries_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift: Option<String>,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
}

#[derive(Tabled)]
struct EnergyRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Host")]
    hostname: String,
    #[tabled(rename = "Energy (kWh)")]
    energy: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Boundaries")]
    boundaries: String,
}

impl From<&EnergyReport> for EnergyRow {
    fn from(r: &EnergyReport) -> Self {
        let boundaries = match (&r.drift, r.boundaries_used) {
            (Some(reason), _) => format!("dropped: {reason}"),
            (None, true) => "used".into(),
            (None, false) => "-".into(),
        };
        Self {
            metric: r.metric.clone(),
            hostname: r.hostname.clone(),
            energy: output::kwh(r.energy_kwh),
            samples: r.samples,
            unit: r.unit.to_string(),
            boundaries,
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> CliError {
    CliError::Io(std::io::Error::other(err))
}

/// Integrate one host. `policy` is `None` for `--no-boundaries`.
fn integrate(
    metric: &str,
    set: &ResultSet,
    unit: &PowerUnit,
    hostname: String,
    window: QueryWindow,
    policy: Option<BoundaryPolicy>,
) -> Result<EnergyReport, CliError> {
    let energy = match policy {
        Some(policy) => energy_for_window(set, unit, &hostname, window, &policy)?,
        None => {
            let series = Series::from_result_set(set, unit, &hostname)?;
            WindowEnergy {
                energy_kwh: series.energy_kwh(QueryWindow::unbounded()),
                samples: series.len(),
                decision: None,
                window: QueryWindow::unbounded(),
            }
        }
    };
    if !energy.has_data() {
        warn!(metric, hostname, "no usable samples");
    }
    Ok(EnergyReport {
        metric: metric.to_owned(),
        hostname,
        energy_kwh: energy.energy_kwh,
        samples: energy.samples,
        unit: unit.clone(),
        boundaries_used: energy.has_data() && energy.used_boundaries(),
        drift: energy
            .decision
            .and_then(|d| d.reason)
            .map(|reason| reason.to_string()),
        window_start: energy.window.start,
        window_end: energy.window.end,
    })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: EnergyArgs, settings: &Settings) -> Result<(), CliError> {
    let window = util::query_window(settings, &args.window)?;
    let hostname = if args.all_hosts {
        None
    } else {
        Some(settings.hostname(args.hostname.clone())?)
    };
    let policy = (!args.no_boundaries).then_some(settings.policy);

    // 1. Load every file.
    let mut loads = JoinSet::new();
    for (index, path) in args.files.iter().cloned().enumerate() {
        loads.spawn_blocking(move || {
            let result = load_result_set(&path);
            (index, path, result)
        });
    }
    let mut sets: Vec<(usize, PathBuf, Arc<ResultSet>)> = Vec::new();
    let mut failures: Vec<(usize, CliError)> = Vec::new();
    while let Some(joined) = loads.join_next().await {
        let (index, path, result) = joined.map_err(join_error)?;
        match result {
            Ok(set) => sets.push((index, path, Arc::new(set))),
            Err(err) => {
                let err = CliError::from(err);
                util::warn_item(&path.display().to_string(), &err, settings.color);
                failures.push((index, err));
            }
        }
    }

    // 2. Integrate each (file, host) pair.
    let mut jobs = JoinSet::new();
    for (index, path, set) in &sets {
        let metric = util::metric_name(path);
        let unit = util::resolve_unit(args.unit.as_deref(), set, &metric);
        let hosts: Vec<String> = match &hostname {
            Some(host) => vec![host.clone()],
            None => set.hostnames().into_iter().map(str::to_owned).collect(),
        };
        debug!(metric, hosts = hosts.len(), %unit, "integrating");
        for (host_index, host) in hosts.into_iter().enumerate() {
            let set = Arc::clone(set);
            let metric = metric.clone();
            let unit = unit.clone();
            let key = (*index, host_index);
            jobs.spawn_blocking(move || {
                let label = format!("{metric}/{host}");
                (key, label, integrate(&metric, &set, &unit, host, window, policy))
            });
        }
    }

    let mut reports: Vec<((usize, usize), EnergyReport)> = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        let (key, label, result) = joined.map_err(join_error)?;
        match result {
            Ok(report) => reports.push((key, report)),
            Err(err) => {
                util::warn_item(&label, &err, settings.color);
                failures.push((key.0, err));
            }
        }
    }

    if reports.is_empty() {
        failures.sort_by_key(|(index, _)| *index);
        if let Some((_, first)) = failures.into_iter().next() {
            return Err(first);
        }
    }

    reports.sort_by_key(|(key, _)| *key);
    let reports: Vec<EnergyReport> = reports.into_iter().map(|(_, r)| r).collect();
    let out = output::render_list(settings.output, &reports, |r| EnergyRow::from(r), |r| {
        r.energy_kwh.to_string()
    })?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
