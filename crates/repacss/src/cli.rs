//! Clap derive structures for the `repacss` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// repacss -- energy reports from REPACSS power telemetry
#[derive(Debug, Parser)]
#[command(
    name = "repacss",
    version,
    about = "Compute energy from REPACSS power telemetry",
    long_about = "Integrates power readings exported from the REPACSS telemetry databases\n\
        into kWh, fills energy-window tables, and breaks node energy down\n\
        by component.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Telemetry profile to use
    #[arg(long, short = 'p', env = "REPACSS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "REPACSS_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// IANA timezone for naive times (e.g. America/Chicago)
    #[arg(long, env = "REPACSS_TZ", global = true)]
    pub tz: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Gap (seconds) beyond which window boundaries are always discarded
    #[arg(long, global = true, value_name = "SECS")]
    pub hard_gap_secs: Option<f64>,

    /// Gap (seconds) beyond which boundaries are discarded on a span mismatch
    #[arg(long, global = true, value_name = "SECS")]
    pub soft_gap_secs: Option<f64>,

    /// Data span / query span ratio that counts as a mismatch
    #[arg(long, global = true, value_name = "RATIO")]
    pub span_ratio: Option<f64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// CSV with a header row
    Csv,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Integrate result-set exports into kWh
    #[command(alias = "e")]
    Energy(EnergyArgs),

    /// Fill an energy-window table from a result set
    #[command(alias = "t")]
    Table(TableArgs),

    /// Break a node's energy down by component
    #[command(alias = "b")]
    Breakdown(BreakdownArgs),

    /// Power statistics for one host
    Stats(StatsArgs),

    /// Node catalog: routing, racks, metrics
    #[command(alias = "n")]
    Nodes(NodesArgs),

    /// Power unit conversion
    Units(UnitsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENERGY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EnergyArgs {
    /// Result-set CSV files; the file stem names the metric (`-` for stdin)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Host to integrate [default: profile hostname]
    #[arg(long, short = 'H', conflicts_with = "all_hosts")]
    pub hostname: Option<String>,

    /// Integrate every hostname present in each file
    #[arg(long)]
    pub all_hosts: bool,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Unit of the values (mW, W, kW) [default: from the data]
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Integrate the data span only, without edge extension
    #[arg(long)]
    pub no_boundaries: bool,
}

/// Query window bounds. Naive times are read in `--tz`.
#[derive(Debug, Args)]
pub struct WindowArgs {
    /// Query window start
    #[arg(long, short = 's')]
    pub start: Option<String>,

    /// Query window end
    #[arg(long, short = 'e')]
    pub end: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TABLE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TableArgs {
    /// Energy-window table with `Start time` and `End time` columns
    pub input: PathBuf,

    /// Result set covering the table's windows (`-` for stdin)
    #[arg(long, short = 'd')]
    pub data: PathBuf,

    /// Host whose energy fills the table [default: profile hostname]
    #[arg(long, short = 'H')]
    pub hostname: Option<String>,

    /// Metric named in the energy column
    #[arg(long, short = 'm', default_value = "SystemPowerConsumption")]
    pub metric: String,

    /// Unit of the values [default: from the data]
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Filled table path [default: <input>_filled.csv]
    #[arg(long = "out", short = 'O', value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Skip the <input>_raw_data.csv companion
    #[arg(long)]
    pub no_raw_data: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BREAKDOWN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BreakdownArgs {
    /// Directory of <MetricId>.csv dumps [default: profile data_dir]
    pub dir: Option<PathBuf>,

    /// Host to report on [default: profile hostname]
    #[arg(long, short = 'H')]
    pub hostname: Option<String>,

    /// Query window start
    #[arg(long, short = 's')]
    pub start: String,

    /// Query window end
    #[arg(long, short = 'e')]
    pub end: String,

    /// Omit the metric relationship analysis
    #[arg(long)]
    pub no_relationships: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Result-set CSV (`-` for stdin)
    pub file: PathBuf,

    /// Host to summarize [default: profile hostname]
    #[arg(long, short = 'H')]
    pub hostname: Option<String>,

    /// Unit of the values [default: from the data]
    #[arg(long, short = 'u')]
    pub unit: Option<String>,

    /// Print the cumulative energy series instead
    #[arg(long)]
    pub cumulative: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NODES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NodesArgs {
    #[command(subcommand)]
    pub command: NodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum NodesCommand {
    /// Show the database and schema each host routes to
    Classify {
        /// Hostnames
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// List the members of one rack
    Rack {
        /// Rack number (91-97)
        number: u16,
    },

    /// List all racks
    Racks,

    /// Power metrics queried for a node kind
    Metrics {
        /// Node kind
        kind: NodeKindArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NodeKindArg {
    Compute,
    Irc,
    Pdu,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  UNITS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
pub struct UnitsArgs {
    #[command(subcommand)]
    pub command: Option<UnitsCommand>,

    /// Reading to convert to Watts
    #[arg(allow_negative_numbers = true)]
    pub value: Option<f64>,

    /// Unit of the reading (mW, W, kW)
    pub unit: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    /// Print the SQL expression normalizing a column to Watts
    Sql {
        /// Unit of the column
        unit: String,

        /// Column holding the readings
        #[arg(long, default_value = "value")]
        column: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    SetDefault {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
