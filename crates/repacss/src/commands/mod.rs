//! Command dispatch: bridges CLI args -> core computations -> output formatting.

pub mod breakdown;
pub mod config_cmd;
pub mod energy;
pub mod nodes;
pub mod stats;
pub mod table;
pub mod units;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;

/// Dispatch a data command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = Settings::resolve(global)?;
    match cmd {
        Command::Energy(args) => energy::handle(args, &settings).await,
        Command::Table(args) => table::handle(&args, &settings),
        Command::Breakdown(args) => breakdown::handle(args, &settings).await,
        Command::Stats(args) => stats::handle(args, &settings),
        Command::Nodes(args) => nodes::handle(args, &settings),
        Command::Units(args) => units::handle(args, &settings),
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
