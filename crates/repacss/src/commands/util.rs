//! Shared helpers for command handlers.

use std::path::Path;

use owo_colors::OwoColorize;

use repacss_core::{PowerUnit, QueryWindow, ResultSet, catalog};
use repacss_data::STDIN_PATH;

use crate::cli::WindowArgs;
use crate::config::Settings;
use crate::error::CliError;

/// The metric a result-set file holds: its file stem.
pub fn metric_name(path: &Path) -> String {
    if path.as_os_str() == STDIN_PATH {
        return "stdin".into();
    }
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

/// `--unit`, else the set's own units column, else the metric's default.
pub fn resolve_unit(flag: Option<&str>, set: &ResultSet, metric: &str) -> PowerUnit {
    flag.or_else(|| set.unit())
        .map_or_else(|| catalog::default_unit(metric), PowerUnit::parse)
}

/// Parse `--start` / `--end` into a window, rejecting an inverted one.
pub fn query_window(settings: &Settings, args: &WindowArgs) -> Result<QueryWindow, CliError> {
    let start = args
        .start
        .as_deref()
        .map(|v| settings.parse_time("start", v))
        .transpose()?;
    let end = args
        .end
        .as_deref()
        .map(|v| settings.parse_time("end", v))
        .transpose()?;
    window(start, end)
}

pub fn window(
    start: Option<chrono::DateTime<chrono::Utc>>,
    end: Option<chrono::DateTime<chrono::Utc>>,
) -> Result<QueryWindow, CliError> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(CliError::Validation {
                field: "start".into(),
                reason: "start must be <= end".into(),
            });
        }
    }
    Ok(QueryWindow::new(start, end))
}

/// Report a failed batch item on stderr without aborting the batch.
pub fn warn_item(item: &str, err: &CliError, color: bool) {
    let label = if color {
        "warning:".yellow().to_string()
    } else {
        "warning:".into()
    };
    eprintln!("{label} {item}: {err}");
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
