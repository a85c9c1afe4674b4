//! Command line interface for the Castboard bundler.
//!
//! This module provides the CLI for bundler operations, with argument
//! parsing, validation and subcommand execution.

pub mod args;
pub mod commands;

pub use args::{Args, Command, RuntimeConfig};

use crate::error::{CliError, Result};
use crate::runner::ShellExecutor;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = RuntimeConfig::from(&args);
    if config.shell_tools() {
        ShellExecutor::preflight()?;
    }

    commands::execute(&args.command, &config).await?;
    Ok(0)
}
