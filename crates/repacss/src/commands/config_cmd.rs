//! Config subcommand handlers.

use std::path::PathBuf;

use dialoguer::{Input, Select};

use repacss_core::Database;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util;

const DATABASES: [Database; 3] = [Database::H100, Database::Zen4, Database::Infra];

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn render_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# unrenderable config: {e}"))
}

/// `name *` for the default profile, sorted by name.
fn profile_lines(cfg: &Config) -> Vec<String> {
    let default = cfg.default_profile.as_deref().unwrap_or("default");
    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            if name == default {
                format!("{name} *")
            } else {
                name.clone()
            }
        })
        .collect()
}

fn set_default(cfg: &mut Config, name: String) -> Result<(), CliError> {
    if !cfg.profiles.contains_key(&name) {
        return Err(CliError::ProfileNotFound {
            name,
            available: config::available_profiles(cfg),
        });
    }
    cfg.default_profile = Some(name);
    Ok(())
}

// ── Init ────────────────────────────────────────────────────────────

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    if config_path.exists() {
        let message = format!("Overwrite {}?", config_path.display());
        if !util::confirm(&message, global.yes)? {
            eprintln!("Aborted.");
            return Ok(());
        }
    }
    eprintln!("REPACSS power CLI: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let suggested = config::active_profile_name(global, &config::load_config_or_default());
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(suggested)
        .interact_text()
        .map_err(prompt_err)?;

    let labels: Vec<String> = DATABASES
        .iter()
        .map(|db| match db {
            Database::H100 => "h100 (GPU nodes)".to_owned(),
            Database::Zen4 => "zen4 (CPU nodes)".to_owned(),
            Database::Infra => "infra (IRC and PDU)".to_owned(),
        })
        .collect();
    let selection = Select::new()
        .with_prompt("Database")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let database = DATABASES.get(selection).copied().unwrap_or(Database::H100);

    let schema: String = Input::new()
        .with_prompt("Schema")
        .default(database.default_schema().to_owned())
        .interact_text()
        .map_err(prompt_err)?;

    let hostname: String = Input::new()
        .with_prompt("Default hostname (blank for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let data_dir: String = Input::new()
        .with_prompt("Metric dump directory (blank for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile::new(database);
    profile.schema = Some(schema);
    profile.hostname = optional(&hostname);
    profile.data_dir = optional(&data_dir).map(PathBuf::from);
    profile.validate(&profile_name)?;

    let mut cfg = Config::default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\nConfiguration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::needless_pass_by_value)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let format = global.output.unwrap_or(OutputFormat::Table);
            let out = output::render_single(format, &cfg, render_toml, |_| {
                config::config_path().display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: repacss config init");
            } else {
                output::print_output(&profile_lines(&cfg).join("\n"), global.quiet);
            }
            Ok(())
        }

        ConfigCommand::SetDefault { name } => {
            let mut cfg = config::load_config()?;
            set_default(&mut cfg, name)?;
            config::save_config(&cfg)?;
            if let Some(name) = &cfg.default_profile {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn two_profiles() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert("gpu".into(), Profile::new(Database::H100));
        cfg.profiles.insert("default".into(), Profile::new(Database::Zen4));
        cfg
    }

    #[test]
    fn default_profile_is_starred() {
        assert_eq!(profile_lines(&two_profiles()), vec!["default *", "gpu"]);
    }

    #[test]
    fn set_default_requires_known_profile() {
        let mut cfg = two_profiles();
        set_default(&mut cfg, "gpu".into()).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("gpu"));

        let err = set_default(&mut cfg, "cooling".into()).unwrap_err();
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "cooling");
                assert_eq!(available, "default, gpu");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_answers_become_none() {
        assert_eq!(optional("  "), None);
        assert_eq!(optional(" rpg-93-1 "), Some("rpg-93-1".into()));
    }

    #[test]
    fn shown_config_is_toml() {
        let text = render_toml(&two_profiles());
        assert!(text.contains("[profiles.gpu]"));
        assert!(text.contains("database = \"h100\""));
    }
}
