//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "curtain", version, about = "Curtain motor controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/curtain.toml")]
    pub config: PathBuf,

    /// Log and print replies as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop, reading JSON requests from stdin one per line
    Serve,
    /// Execute a single action and wait for any commanded move to settle
    Exec {
        /// Action name (move, stop, set_left, set_motor_params, ...)
        action: String,
        /// Optional action argument
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
        /// API key; defaults to [auth].api_key from the config
        #[arg(long, value_name = "KEY")]
        token: Option<String>,
    },
    /// Print the stored position, thresholds and motor profile
    Status,
    /// Restore factory settings
    Erase,
    /// Validate config, stepper wiring and the settings file
    SelfCheck,
}
