//! Component breakdown command handler.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;
use tokio::task::JoinSet;
use tracing::debug;

use repacss_core::breakdown::metric_energy;
use repacss_core::catalog::{self, Category};
use repacss_core::relationship::analyze;
use repacss_core::{
    CategoryEnergies, ComponentBreakdown, ComponentRow, MetricEnergy, QueryWindow, Relationship,
};
use repacss_data::{MetricDump, discover_metric_dumps};

use crate::cli::BreakdownArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct BreakdownReport {
    hostname: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    breakdown: ComponentBreakdown,
    components: Vec<ComponentRow>,
    detail: Vec<ComponentRow>,
    cpu_devices: Vec<ComponentRow>,
    metrics: Vec<MetricEnergy>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    relationships: Vec<Relationship>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<String>,
}

#[derive(Tabled)]
struct ComponentTableRow {
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Energy (kWh)")]
    energy: String,
    #[tabled(rename = "Share")]
    share: String,
}

fn component_rows(rows: &[ComponentRow], total: f64) -> Vec<ComponentTableRow> {
    rows.iter()
        .map(|r| ComponentTableRow {
            component: r.component.clone(),
            energy: output::kwh(r.energy_kwh),
            share: if total > 0.0 {
                format!("{:.1}%", r.energy_kwh / total * 100.0)
            } else {
                "-".into()
            },
        })
        .collect()
}

#[derive(Tabled)]
struct RelationshipRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Metric 1")]
    metric1: String,
    #[tabled(rename = "Metric 2")]
    metric2: String,
    #[tabled(rename = "kWh 1")]
    energy1: String,
    #[tabled(rename = "kWh 2")]
    energy2: String,
    #[tabled(rename = "Diff %")]
    percent: String,
    #[tabled(rename = "Relationship")]
    relationship: String,
}

fn relationship_row(r: &Relationship, color: bool) -> RelationshipRow {
    RelationshipRow {
        category: r.category.clone(),
        metric1: r.metric1.clone(),
        metric2: r.metric2.clone(),
        energy1: output::kwh(r.energy1_kwh),
        energy2: output::kwh(r.energy2_kwh),
        percent: format!("{:.2}", r.difference_percent),
        relationship: output::paint_status(r.relationship, color),
    }
}

fn detail(report: &BreakdownReport, color: bool) -> String {
    let b = &report.breakdown;
    let mut sections = vec![
        format!(
            "Host {}  {} .. {}",
            report.hostname,
            report.start.format("%Y-%m-%d %H:%M:%S"),
            report.end.format("%Y-%m-%d %H:%M:%S")
        ),
        output::render_table(&component_rows(&report.components, b.components_total() + b.other)),
        output::render_table(&component_rows(&report.detail, b.system_output)),
    ];
    if !report.cpu_devices.is_empty() {
        sections.push(output::render_table(&component_rows(&report.cpu_devices, b.cpu)));
    }
    if let Some(input) = b.system_input {
        sections.push(format!("SystemInputPower: {} kWh", output::kwh(input)));
    }
    if !report.relationships.is_empty() {
        let rows: Vec<_> = report
            .relationships
            .iter()
            .map(|r| relationship_row(r, color))
            .collect();
        sections.push(output::render_table(&rows));
    }
    sections.join("\n\n")
}

// ── Collection ──────────────────────────────────────────────────────

/// Dumps worth integrating, with their categories. The rest are named in
/// the returned skip list.
fn classify_dumps(dumps: Vec<MetricDump>) -> (Vec<(MetricDump, Category)>, Vec<String>) {
    let mut usable = Vec::new();
    let mut skipped = Vec::new();
    for dump in dumps {
        if catalog::is_excluded(&dump.metric) || catalog::is_derived(&dump.metric) {
            debug!(metric = %dump.metric, "skipping derived metric");
            skipped.push(dump.metric);
            continue;
        }
        match catalog::category_of(&dump.metric) {
            Some(category) => usable.push((dump, category)),
            None => {
                debug!(metric = %dump.metric, "metric has no category");
                skipped.push(dump.metric);
            }
        }
    }
    (usable, skipped)
}

async fn collect(
    dumps: Vec<(MetricDump, Category)>,
    hostname: &str,
    window: QueryWindow,
    color: bool,
) -> Result<CategoryEnergies, CliError> {
    let mut jobs = JoinSet::new();
    for (index, (dump, category)) in dumps.into_iter().enumerate() {
        let hostname = hostname.to_owned();
        jobs.spawn_blocking(move || {
            let result = dump
                .load()
                .map_err(CliError::from)
                .and_then(|set| {
                    metric_energy(&dump.metric, category, &set, &hostname, window)
                        .map_err(CliError::from)
                });
            (index, dump.metric, result)
        });
    }

    let mut found: Vec<(usize, MetricEnergy)> = Vec::new();
    let mut first_error: Option<(usize, CliError)> = None;
    while let Some(joined) = jobs.join_next().await {
        let (index, metric, result) =
            joined.map_err(|e| CliError::Io(std::io::Error::other(e)))?;
        match result {
            Ok(energy) => found.push((index, energy)),
            Err(err) => {
                util::warn_item(&metric, &err, color);
                if first_error.as_ref().is_none_or(|(i, _)| index < *i) {
                    first_error = Some((index, err));
                }
            }
        }
    }

    if found.is_empty() {
        if let Some((_, err)) = first_error {
            return Err(err);
        }
    }
    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, e)| e).collect())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: BreakdownArgs, settings: &Settings) -> Result<(), CliError> {
    let hostname = settings.hostname(args.hostname)?;
    let dir: PathBuf = args
        .dir
        .or_else(|| {
            settings
                .profile
                .as_ref()
                .and_then(|(_, p)| p.data_dir.clone())
        })
        .ok_or_else(|| CliError::Validation {
            field: "dir".into(),
            reason: "pass a dump directory or set data_dir in the profile".into(),
        })?;
    let start = settings.parse_time("start", &args.start)?;
    let end = settings.parse_time("end", &args.end)?;
    let window = util::window(Some(start), Some(end))?;

    let (usable, skipped) = classify_dumps(discover_metric_dumps(&dir)?);
    let energies = collect(usable, &hostname, window, settings.color).await?;
    if energies.is_empty() {
        return Err(CliError::NoData {
            hostname,
            source_name: dir.display().to_string(),
        });
    }

    let breakdown = ComponentBreakdown::from_energies(&energies);
    let relationships = if args.no_relationships {
        Vec::new()
    } else {
        analyze(&energies, &breakdown)
    };
    let report = BreakdownReport {
        hostname,
        start,
        end,
        components: breakdown.top_level_rows(),
        detail: breakdown.detail_rows(),
        cpu_devices: breakdown.cpu_device_rows(),
        metrics: energies.iter().cloned().collect(),
        breakdown,
        relationships,
        skipped,
    };

    let color = settings.color;
    let out = output::render_single(
        settings.output,
        &report,
        |r| detail(r, color),
        |r| {
            r.components
                .iter()
                .map(|c| format!("{}\t{}", c.component, c.energy_kwh))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
