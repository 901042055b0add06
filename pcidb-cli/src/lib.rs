//! Command-line interface for ingesting and inspecting the PCI ID registry.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod error;
mod show;
mod sync;

pub use error::CliError;

use show::{ShowArgs, ShowTarget, run_show};
use sync::{SyncArgs, WatchArgs, run_sync, run_watch};

const ARG_DATABASE: &str = "database";
const ARG_SOURCE_URL: &str = "source-url";
const ARG_SOURCE_FILE: &str = "source-file";
const ARG_USER_AGENT: &str = "user-agent";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ARG_VALIDATION: &str = "validation";
const ARG_HASH_MODE: &str = "hash-mode";
const ARG_INTERVAL_SECS: &str = "interval-secs";
const ENV_SYNC_DATABASE: &str = "PCIDB_CMDS_SYNC_DATABASE";
const ENV_WATCH_DATABASE: &str = "PCIDB_CMDS_WATCH_DATABASE";
const ENV_SHOW_DATABASE: &str = "PCIDB_CMDS_SHOW_DATABASE";

/// Run the pcidb CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, or the
/// selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => return Err(CliError::ArgumentParsing(err)),
    };
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Sync(args) => run_sync(args, writer),
        Command::Watch(args) => run_watch(args, writer),
        Command::Show { args, target } => run_show(args, &target, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pcidb",
    about = "Mirror the PCI ID registry into a local aggregate store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one ingestion pass.
    Sync(SyncArgs),
    /// Run ingestion passes on a fixed interval until interrupted.
    Watch(WatchArgs),
    /// Print stored aggregates as JSON.
    Show {
        #[command(flatten)]
        args: ShowArgs,
        #[command(subcommand)]
        target: ShowTarget,
    },
}

#[cfg(test)]
mod tests;
