//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Keeps the non-blocking file writer alive for the process lifetime.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "heat", version, about = "Heating-plant controller")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/heat.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides the config
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate the sensor bus and print every address found
    Scan {
        /// Scan the simulated bus seeded from the config addresses
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Run the control loop
    Run {
        /// Stop after this many cycles (default: run until interrupted)
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
        /// Drive simulated hardware on virtual time
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
}
