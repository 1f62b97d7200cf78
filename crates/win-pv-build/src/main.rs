//! Main entry point for the win-pv-build CLI application.
//!
//! This module initializes the CLI, sets up tracing, and runs the specified
//! command. It uses the `clap` crate for command-line argument parsing and the
//! `tracing` crate for logging.

mod actions;
mod cli;
mod providers;
#[cfg(test)]
mod test_utils;
mod trace;

use anyhow::{Ok, Result};
use clap::{CommandFactory, Parser};
use cli::Cli;
use tracing::error;

/// Main function for the win-pv-build CLI application.
///
/// Prints the help and exits with status 1 when no subcommand is given.
///
/// # Errors
///
/// This function will return an error if the command execution fails, which
/// exits the process with status 1.
fn main() -> Result<()> {
    let started_at = chrono::Local::now();
    let cli: Cli = Cli::parse();
    trace::init_tracing(cli.loglevel, cli.verbose);
    if cli.sub_cmd.is_none() {
        Cli::command().print_help()?;
        std::process::exit(1);
    }
    cli.run(started_at).inspect_err(|e| error!("{:#}", e))?;
    Ok(())
}
