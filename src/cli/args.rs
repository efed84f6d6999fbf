//! CLI argument definitions
//!
//! All Clap derive structs for `stoptimer` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::PayloadType;

// ============================================================================
// Root CLI
// ============================================================================

/// Countdown timer node for line-oriented message streams.
#[derive(Parser, Debug)]
#[command(name = "stoptimer", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "STOPTIMER_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormat,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a timer node over stdin/stdout.
    Run(RunArgs),

    /// Print the resolved timer settings and exit.
    Resolve(ResolveArgs),
}

// ============================================================================
// Shared Timer Arguments
// ============================================================================

/// Timer configuration flags shared by every subcommand.
///
/// Flags override values from `--config`.
#[derive(Args, Debug, Default, Clone)]
pub struct TimerArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "STOPTIMER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Countdown magnitude (numeric string; invalid values count as 0).
    #[arg(short, long, env = "STOPTIMER_DURATION", allow_hyphen_values = true)]
    pub duration: Option<String>,

    /// Unit name: `Second`, `Minute` or `Hour` (anything else means milliseconds).
    #[arg(short, long, env = "STOPTIMER_UNITS")]
    pub units: Option<String>,

    /// Raw completion payload.
    #[arg(short, long, env = "STOPTIMER_PAYLOAD", allow_hyphen_values = true)]
    pub payload: Option<String>,

    /// Completion payload type.
    #[arg(long, env = "STOPTIMER_PAYLOAD_TYPE")]
    pub payload_type: Option<PayloadType>,
}

// ============================================================================
// Commands
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Timer configuration.
    #[command(flatten)]
    pub timer: TimerArgs,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "STOPTIMER_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Timer configuration.
    #[command(flatten)]
    pub timer: TimerArgs,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format for `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
