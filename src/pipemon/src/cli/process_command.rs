use super::commands::{Cli, Command};
use super::handlers;
use crate::config::ConfigLoader;
use crate::logging::setup_logging;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Runtime;

/// Parses the command line and runs the selected command.
///
/// Any error returned here ends the process with a non-zero status, which is how a responder
/// reports a failed startup to the launcher.
pub fn process_command() -> Result<()> {
    // NOTE: this exits the process if there is a parsing error
    let cli = Cli::parse();

    if let Command::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = ConfigLoader::load(cli.config.as_deref())?;
    setup_logging(&config.log_level, config.log_file.as_deref())?;

    let runtime = Runtime::new().context("failed to start async runtime")?;
    match cli.command {
        Command::Respond {
            definition,
            log_dir,
        } => runtime.block_on(handlers::respond(&config, &definition, &log_dir)),
        Command::Discover {
            timeout_ms,
            json,
            log_dir,
        } => runtime.block_on(handlers::discover(
            &config,
            timeout_ms,
            json,
            log_dir.as_deref(),
        )),
        Command::Version => Ok(()),
    }
}
