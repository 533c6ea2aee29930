//! CLI error types with miette diagnostics.
//!
//! Maps core, data, and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use repacss_config::ConfigError;
use repacss_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const INPUT_SHAPE: i32 = 10;
    pub const DATA: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input shape ──────────────────────────────────────────────────
    #[error("Result set is missing required columns: {}", missing.join(", "))]
    #[diagnostic(
        code(repacss::invalid_input),
        help("Export the query with timestamp, hostname, and value columns.")
    )]
    InvalidInput { missing: Vec<String> },

    #[error("{path} is missing required column '{column}'")]
    #[diagnostic(
        code(repacss::missing_column),
        help("Energy tables need 'Start time' and 'End time' columns.")
    )]
    MissingColumn { path: String, column: String },

    // ── Data ─────────────────────────────────────────────────────────
    #[error("No usable samples for host '{hostname}' in {source_name}")]
    #[diagnostic(
        code(repacss::no_data),
        help("Check the hostname, or pass --all-hosts to see which hosts the file contains.")
    )]
    NoData {
        hostname: String,
        source_name: String,
    },

    #[error("Not found: {path}")]
    #[diagnostic(code(repacss::not_found))]
    NotFound { path: String },

    #[error(transparent)]
    #[diagnostic(code(repacss::data))]
    Data(repacss_data::Error),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(repacss::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid time '{value}' for {field}")]
    #[diagnostic(
        code(repacss::invalid_time),
        help("Use 'YYYY-MM-DD HH:MM:SS' (read in --tz) or RFC 3339 with an offset.")
    )]
    InvalidTime { field: String, value: String },

    #[error("No hostname given")]
    #[diagnostic(
        code(repacss::no_hostname),
        help("Pass --hostname, or set `hostname` in the active profile.")
    )]
    NoHostname,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(repacss::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: repacss config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(repacss::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(repacss::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render {format} output: {message}")]
    #[diagnostic(code(repacss::render))]
    Render { format: String, message: String },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } | Self::MissingColumn { .. } => exit_code::INPUT_SHAPE,
            Self::NoData { .. } | Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Data(_) | Self::Io(_) => exit_code::DATA,
            Self::Validation { .. }
            | Self::InvalidTime { .. }
            | Self::NoHostname
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(_) | Self::Render { .. } => exit_code::GENERAL,
        }
    }
}

// ── Lower-layer error mapping ────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput { missing } => Self::InvalidInput { missing },
            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
        }
    }
}

impl From<repacss_data::Error> for CliError {
    fn from(err: repacss_data::Error) -> Self {
        match err {
            repacss_data::Error::NotFound { path } => Self::NotFound {
                path: path.display().to_string(),
            },
            repacss_data::Error::MissingColumn { path, column } => Self::MissingColumn {
                path: path.display().to_string(),
                column,
            },
            other => Self::Data(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn core_errors_keep_their_exit_codes() {
        let missing = CliError::from(CoreError::InvalidInput {
            missing: vec!["value".into()],
        });
        assert_eq!(missing.exit_code(), exit_code::INPUT_SHAPE);
        assert_eq!(
            missing.to_string(),
            "Result set is missing required columns: value"
        );

        let validation = CliError::from(CoreError::Validation {
            message: "bad".into(),
        });
        assert_eq!(validation.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn data_errors_split_by_kind() {
        let not_found = CliError::from(repacss_data::Error::NotFound {
            path: PathBuf::from("x.csv"),
        });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let column = CliError::from(repacss_data::Error::MissingColumn {
            path: PathBuf::from("t.csv"),
            column: "End time".into(),
        });
        assert_eq!(column.exit_code(), exit_code::INPUT_SHAPE);

        let io = CliError::from(repacss_data::Error::Io {
            path: PathBuf::from("t.csv"),
            source: std::io::Error::other("disk"),
        });
        assert_eq!(io.exit_code(), exit_code::DATA);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "timezone".into(),
            reason: "unknown".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
