//! Output formatting: table, JSON, YAML, CSV, plain.
//!
//! Renders data in the format selected by `--output`. Table and CSV use the
//! `Tabled` row, structured formats serialize the original data via serde,
//! plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use repacss_core::RelationshipStatus;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Relationship verdict, colored when enabled.
pub fn paint_status(status: RelationshipStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        RelationshipStatus::Identical | RelationshipStatus::Matches => text.green().to_string(),
        RelationshipStatus::Different => text.yellow().to_string(),
        RelationshipStatus::Mismatch => text.red().to_string(),
    }
}

/// kWh with fixed precision for tables.
pub fn kwh(value: f64) -> String {
    format!("{value:.6}")
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Csv => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_csv(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`; CSV writes `field,value` pairs for the
/// top-level fields.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Csv => render_csv_pairs(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_error(format: &str, err: impl std::fmt::Display) -> CliError {
    CliError::Render {
        format: format.into(),
        message: err.to_string(),
    }
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    out.map_err(|e| render_error("json", e))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| render_error("yaml", e))
}

fn csv_string(write: impl FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>) -> Result<String, CliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write(&mut writer).map_err(|e| render_error("csv", e))?;
    let bytes = writer.into_inner().map_err(|e| render_error("csv", e))?;
    let text = String::from_utf8(bytes).map_err(|e| render_error("csv", e))?;
    Ok(text.trim_end().to_owned())
}

fn render_csv<R: Tabled>(rows: &[R]) -> Result<String, CliError> {
    csv_string(|w| {
        w.write_record(R::headers().iter().map(AsRef::<str>::as_ref))?;
        for row in rows {
            w.write_record(row.fields().iter().map(AsRef::<str>::as_ref))?;
        }
        Ok(())
    })
}

fn render_csv_pairs<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    let fields = match serde_json::to_value(data).map_err(|e| render_error("csv", e))? {
        serde_json::Value::Object(fields) => fields,
        other => return csv_string(|w| w.write_record([scalar(&other)])),
    };
    csv_string(|w| {
        w.write_record(["field", "value"])?;
        for (key, value) in &fields {
            w.write_record([key.as_str(), scalar(value).as_str()])?;
        }
        Ok(())
    })
}

fn scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
