//! Shared configuration for REPACSS tools.
//!
//! TOML profiles naming a telemetry database and schema, output defaults,
//! and the boundary-drift thresholds. The CLI layers its flags on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use repacss_core::boundary::{DEFAULT_HARD_GAP_SECS, DEFAULT_SOFT_GAP_SECS, DEFAULT_SPAN_RATIO};
use repacss_core::{BoundaryPolicy, Database};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Boundary-drift thresholds.
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Named database profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            boundary: BoundaryConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// IANA zone that naive energy-table times are written in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timezone: default_timezone(),
        }
    }
}

impl Defaults {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        parse_timezone(&self.timezone)
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timezone() -> String {
    "UTC".into()
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| invalid("timezone", format!("unknown IANA zone '{name}'")))
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BoundaryConfig {
    #[serde(default = "default_hard_gap")]
    pub hard_gap_secs: f64,

    #[serde(default = "default_soft_gap")]
    pub soft_gap_secs: f64,

    #[serde(default = "default_span_ratio")]
    pub span_ratio: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            hard_gap_secs: DEFAULT_HARD_GAP_SECS,
            soft_gap_secs: DEFAULT_SOFT_GAP_SECS,
            span_ratio: DEFAULT_SPAN_RATIO,
        }
    }
}

fn default_hard_gap() -> f64 {
    DEFAULT_HARD_GAP_SECS
}
fn default_soft_gap() -> f64 {
    DEFAULT_SOFT_GAP_SECS
}
fn default_span_ratio() -> f64 {
    DEFAULT_SPAN_RATIO
}

impl BoundaryConfig {
    pub fn to_policy(&self) -> Result<BoundaryPolicy, ConfigError> {
        BoundaryPolicy::new(self.hard_gap_secs, self.soft_gap_secs, self.span_ratio)
            .map_err(|e| invalid("boundary", e.to_string()))
    }
}

/// A named telemetry profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// `h100`, `zen4`, or `infra`.
    pub database: Database,

    /// Defaults to the database's usual schema.
    pub schema: Option<String>,

    /// Directory holding metric dumps and energy tables.
    pub data_dir: Option<PathBuf>,

    /// Host used when a command gets no `--hostname`.
    pub hostname: Option<String>,
}

impl Profile {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            schema: None,
            data_dir: None,
            hostname: None,
        }
    }

    pub fn schema(&self) -> &str {
        self.schema
            .as_deref()
            .unwrap_or_else(|| self.database.default_schema())
    }

    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let schema = self.schema();
        if self.database.has_schema(schema) {
            Ok(())
        } else {
            Err(invalid(
                format!("profiles.{name}.schema"),
                format!(
                    "'{schema}' is not a {} schema (expected one of: {})",
                    self.database,
                    self.database.schemas().join(", ")
                ),
            ))
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.boundary.to_policy()?;
        self.defaults.tz()?;
        for (name, profile) in &self.profiles {
            profile.validate(name)?;
        }
        Ok(())
    }

    /// The profile `name`, or the default profile when `None`. An
    /// unconfigured default resolves to `Ok(None)`.
    pub fn profile(&self, name: Option<&str>) -> Result<Option<(&str, &Profile)>, ConfigError> {
        match name {
            Some(name) => self
                .profiles
                .get_key_value(name)
                .map(|(k, p)| Some((k.as_str(), p)))
                .ok_or_else(|| invalid("profile", format!("no profile named '{name}'"))),
            None => Ok(self
                .default_profile
                .as_deref()
                .and_then(|n| self.profiles.get_key_value(n))
                .map(|(k, p)| (k.as_str(), p))),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("edu", "repacss", "repacss").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("repacss");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the config from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then the TOML file at `path` (if any), then `REPACSS_*` env
/// vars with `__` separating nested keys.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("REPACSS_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if it is missing or invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.boundary, BoundaryConfig::default());
        assert_eq!(cfg.boundary.to_policy().unwrap(), BoundaryPolicy::default());
    }

    #[test]
    fn profiles_and_thresholds_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "gpu"

[defaults]
timezone = "America/Chicago"

[boundary]
hard_gap_secs = 10800.0

[profiles.gpu]
database = "h100"
hostname = "rpg-93-1"

[profiles.cooling]
database = "infra"
schema = "irc"
"#,
        );
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.boundary.hard_gap_secs, 10800.0);
        assert_eq!(cfg.boundary.soft_gap_secs, DEFAULT_SOFT_GAP_SECS);
        assert_eq!(cfg.defaults.tz().unwrap(), chrono_tz::America::Chicago);

        let (name, gpu) = cfg.profile(None).unwrap().unwrap();
        assert_eq!(name, "gpu");
        assert_eq!(gpu.schema(), "idrac");
        assert_eq!(gpu.hostname.as_deref(), Some("rpg-93-1"));
        let (_, cooling) = cfg.profile(Some("cooling")).unwrap().unwrap();
        assert_eq!(cooling.database, Database::Infra);
        assert_eq!(cooling.schema(), "irc");
        assert!(cfg.profile(Some("nope")).is_err());
    }

    #[test]
    fn schema_must_belong_to_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[profiles.bad]\ndatabase = \"zen4\"\nschema = \"pdu\"\n");
        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "profiles.bad.schema"));
    }

    #[test]
    fn unknown_database_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[profiles.bad]\ndatabase = \"a100\"\n");
        assert!(matches!(load_config_from(&path), Err(ConfigError::Figment(_))));
    }

    #[test]
    fn soft_gap_above_hard_gap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[boundary]\nhard_gap_secs = 600.0\nsoft_gap_secs = 900.0\n");
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(parse_timezone("Mars/Olympus").is_err());
        assert_eq!(parse_timezone("UTC").unwrap(), chrono_tz::UTC);
    }

    #[test]
    fn saved_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        let mut profile = Profile::new(Database::Zen4);
        profile.hostname = Some("rpc-91-1".into());
        cfg.profiles.insert("default".into(), profile);
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, cfg);
    }
}
