//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "irrigator", version, about = "Loadcell tray irrigation controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/irrigator.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion loop and irrigation controller
    Run {
        /// Send a tare command to the board at startup
        #[arg(long, action = ArgAction::SetTrue)]
        tare: bool,
        /// Send a calibration command at startup (arms the sampling windows)
        #[arg(long, action = ArgAction::SetTrue)]
        calibrate: bool,
        /// Start a manual irrigation run once the loop is up
        #[arg(long, action = ArgAction::SetTrue)]
        start: bool,
        /// Stop after this many weight samples
        #[arg(long, value_name = "N")]
        exit_after_samples: Option<u64>,
        /// Read operator commands (tare, cal, start, status, quit) from stdin
        #[arg(long, action = ArgAction::SetTrue)]
        console: bool,
    },
    /// Estimate VWC for an average weight against a saturation weight
    Vwc {
        /// Average tray weight (g)
        #[arg(long, value_name = "GRAMS", allow_hyphen_values = true)]
        avg_weight: f64,
        /// Saturation weight (g)
        #[arg(long, value_name = "GRAMS", allow_hyphen_values = true)]
        saturation_weight: f64,
    },
    /// Validate the config and report the derived tray quantities
    SelfCheck,
}
