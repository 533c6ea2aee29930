//! CLI configuration: a thin wrapper around `repacss_config` shared types.
//!
//! Re-exports the shared types and resolves the settings a command runs
//! with, letting `GlobalOpts` flags override profile and file values.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;

use repacss_core::BoundaryPolicy;
use repacss_core::time::parse_table_time;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use repacss_config::{
    Config, Profile, config_path, load_config, load_config_or_default, save_config,
};

// ── Resolved settings ───────────────────────────────────────────────

/// Everything a data command needs after flags, env, and config merge.
#[derive(Debug, Clone)]
pub struct Settings {
    pub output: OutputFormat,
    pub color: bool,
    pub tz: Tz,
    pub policy: BoundaryPolicy,
    pub profile: Option<(String, Profile)>,
    pub quiet: bool,
}

impl Settings {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let cfg = load_config()?;
        Self::from_config(global, &cfg)
    }

    pub fn from_config(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        let profile = match cfg.profile(global.profile.as_deref()) {
            Ok(found) => found.map(|(name, p)| (name.to_owned(), p.clone())),
            Err(_) => {
                return Err(CliError::ProfileNotFound {
                    name: global.profile.clone().unwrap_or_default(),
                    available: available_profiles(cfg),
                });
            }
        };

        let output = match global.output {
            Some(format) => format,
            None => OutputFormat::from_str(&cfg.defaults.output, true).map_err(|_| {
                CliError::Validation {
                    field: "defaults.output".into(),
                    reason: format!("unknown output format '{}'", cfg.defaults.output),
                }
            })?,
        };
        let color_mode = match global.color {
            Some(mode) => mode,
            None => ColorMode::from_str(&cfg.defaults.color, true).unwrap_or(ColorMode::Auto),
        };

        let tz = match global.tz.as_deref() {
            Some(name) => repacss_config::parse_timezone(name)?,
            None => cfg.defaults.tz()?,
        };

        let mut boundary = cfg.boundary;
        if let Some(secs) = global.hard_gap_secs {
            boundary.hard_gap_secs = secs;
        }
        if let Some(secs) = global.soft_gap_secs {
            boundary.soft_gap_secs = secs;
        }
        if let Some(ratio) = global.span_ratio {
            boundary.span_ratio = ratio;
        }

        Ok(Self {
            output,
            color: crate::output::should_color(color_mode),
            tz,
            policy: boundary.to_policy()?,
            profile,
            quiet: global.quiet,
        })
    }

    /// `--hostname`, else the profile's host.
    pub fn hostname(&self, flag: Option<String>) -> Result<String, CliError> {
        flag.or_else(|| self.profile.as_ref().and_then(|(_, p)| p.hostname.clone()))
            .ok_or(CliError::NoHostname)
    }

    /// Parse a command-line time; naive values are read in the configured zone.
    pub fn parse_time(&self, field: &str, value: &str) -> Result<DateTime<Utc>, CliError> {
        parse_table_time(value, self.tz).ok_or_else(|| CliError::InvalidTime {
            field: field.into(),
            value: value.into(),
        })
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}
