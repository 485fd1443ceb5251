use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn about_message() -> String {
    format!(
        "Discovers running pipelines on the local network and reports job status\nVersion: {}",
        env!("CARGO_PKG_VERSION")
    )
}

#[derive(Parser, Clone, Debug)]
#[clap(name = "pipemon", about = about_message(), version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to a TOML config file
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Answer discovery queries on behalf of a running pipeline. Runs until killed.
    Respond {
        /// Pipeline definition file (JSON)
        definition: PathBuf,

        /// Directory holding the job log files (`<node>.<pid>.err`)
        log_dir: PathBuf,
    },

    /// Find running pipelines and print their status
    Discover {
        /// Stop listening after this much silence (default: idle_timeout_ms from the config)
        #[clap(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Print one JSON document per pipeline
        #[clap(long)]
        json: bool,

        /// Only report the pipeline logging to this directory
        #[clap(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },

    /// Shows the current version
    Version,
}
