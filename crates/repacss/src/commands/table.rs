//! Energy-table command handler.
//!
//! Each row's window selects its samples from the result set; the energy is
//! integrated with drift detection on. Rows that fail are warned about and
//! left unfilled.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use repacss_core::time::format_query_time;
use repacss_core::{PowerUnit, ResultSet, energy_for_window};
use repacss_data::{
    RawChunk, WindowRow, WindowTable, energy_column, filled_path, load_result_set, raw_data_path,
    save_raw_data,
};

use crate::cli::TableArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct TableSummary {
    rows: usize,
    filled: usize,
    skipped: usize,
    boundaries_dropped: usize,
    total_kwh: f64,
    mean_kwh: Option<f64>,
    min_kwh: Option<f64>,
    max_kwh: Option<f64>,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_data: Option<String>,
}

impl TableSummary {
    fn new(values: &[Option<f64>], boundaries_dropped: usize) -> Self {
        let filled: Vec<f64> = values.iter().flatten().copied().collect();
        let total: f64 = filled.iter().sum();
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let mean = (!filled.is_empty()).then(|| total / filled.len() as f64);
        Self {
            rows: values.len(),
            filled: filled.len(),
            skipped: values.len() - filled.len(),
            boundaries_dropped,
            total_kwh: total,
            mean_kwh: mean,
            min_kwh: filled.iter().copied().reduce(f64::min),
            max_kwh: filled.iter().copied().reduce(f64::max),
            output: String::new(),
            raw_data: None,
        }
    }
}

fn detail(s: &TableSummary) -> String {
    let opt = |v: Option<f64>| v.map_or_else(|| "-".into(), output::kwh);
    let mut lines = vec![
        format!("Rows:            {}", s.rows),
        format!("Filled:          {}", s.filled),
        format!("Skipped:         {}", s.skipped),
        format!("Drift detected:  {}", s.boundaries_dropped),
        format!("Total (kWh):     {}", output::kwh(s.total_kwh)),
        format!("Mean (kWh):      {}", opt(s.mean_kwh)),
        format!("Min (kWh):       {}", opt(s.min_kwh)),
        format!("Max (kWh):       {}", opt(s.max_kwh)),
        format!("Output:          {}", s.output),
    ];
    if let Some(raw) = &s.raw_data {
        lines.push(format!("Raw data:        {raw}"));
    }
    lines.join("\n")
}

// ── Row evaluation ──────────────────────────────────────────────────

/// Outcome of one table row.
struct RowEnergy {
    kwh: f64,
    dropped_boundaries: bool,
    chunk: RawChunk,
}

fn evaluate(
    row: &WindowRow<'_>,
    set: &ResultSet,
    unit: &PowerUnit,
    hostname: &str,
    settings: &Settings,
) -> Result<Option<RowEnergy>, CliError> {
    let start = settings.parse_time("Start time", row.start)?;
    let end = settings.parse_time("End time", row.end)?;
    let window = util::window(Some(start), Some(end))?;

    let subset = set.within(hostname, start, end);
    let energy = energy_for_window(&subset, unit, hostname, window, &settings.policy)?;
    if !energy.has_data() {
        return Ok(None);
    }
    Ok(Some(RowEnergy {
        kwh: energy.energy_kwh,
        dropped_boundaries: energy.decision.is_some_and(|d| !d.use_boundaries),
        chunk: RawChunk {
            rank: row
                .rank
                .map_or_else(|| (row.index + 1).to_string(), str::to_owned),
            query_start: format_query_time(start),
            query_end: format_query_time(end),
            set: subset,
        },
    }))
}

fn progress(len: usize, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(len).unwrap_or(u64::MAX));
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} rows {msg}") {
        bar.set_style(style);
    }
    bar
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &TableArgs, settings: &Settings) -> Result<(), CliError> {
    let hostname = settings.hostname(args.hostname.clone())?;
    let mut table = WindowTable::load(&args.input)?;
    let set = load_result_set(&args.data)?;
    set.require_columns()?;
    let unit = util::resolve_unit(args.unit.as_deref(), &set, &args.metric);
    debug!(rows = table.len(), samples = set.len(), %unit, "filling table");

    let bar = progress(table.len(), settings.quiet);
    let mut values: Vec<Option<f64>> = Vec::with_capacity(table.len());
    let mut chunks = Vec::new();
    let mut dropped = 0;
    for row in table.rows() {
        let label = match row.rank {
            Some(rank) => format!("row {rank}"),
            None => format!("row {}", row.index + 1),
        };
        match evaluate(&row, &set, &unit, &hostname, settings) {
            Ok(Some(result)) => {
                if result.dropped_boundaries {
                    dropped += 1;
                }
                values.push(Some(result.kwh));
                chunks.push(result.chunk);
            }
            Ok(None) => {
                bar.suspend(|| {
                    util::warn_item(
                        &label,
                        &CliError::NoData {
                            hostname: hostname.clone(),
                            source_name: args.data.display().to_string(),
                        },
                        settings.color,
                    );
                });
                values.push(None);
            }
            Err(err) => {
                bar.suspend(|| util::warn_item(&label, &err, settings.color));
                values.push(None);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let out_path = args
        .out
        .clone()
        .unwrap_or_else(|| filled_path(&args.input));
    table.fill(&energy_column(&args.metric), &values);
    table.save(&out_path)?;
    info!(path = %out_path.display(), "wrote filled table");

    let mut summary = TableSummary::new(&values, dropped);
    summary.output = out_path.display().to_string();
    if !args.no_raw_data && !chunks.is_empty() {
        let raw_path = raw_data_path(&args.input);
        save_raw_data(&raw_path, &chunks)?;
        summary.raw_data = Some(raw_path.display().to_string());
    }

    let out = output::render_single(settings.output, &summary, detail, |s| {
        s.total_kwh.to_string()
    })?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
