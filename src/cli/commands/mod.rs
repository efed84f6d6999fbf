//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod resolve;
pub mod run;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands, TimerArgs};
use crate::config::loader::ConfigLoader;
use crate::config::schema::{TimerConfig, parse_magnitude};
use crate::error::StopTimerError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), StopTimerError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Resolve(args) => resolve::run(&args),
    }
}

/// Builds the timer configuration: the `--config` file (or defaults), then
/// any flag or environment overrides on top.
///
/// # Errors
///
/// Returns a config error if the file cannot be loaded.
pub fn load_config(args: &TimerArgs) -> Result<TimerConfig, StopTimerError> {
    let mut config = match args.config {
        Some(ref path) => {
            tracing::info!(config = %path.display(), "loading configuration");
            ConfigLoader::with_defaults().load(path)?
        }
        None => TimerConfig::default(),
    };

    if let Some(ref duration) = args.duration {
        config.duration = parse_magnitude(duration);
    }
    if let Some(ref units) = args.units {
        config.units.clone_from(units);
    }
    if let Some(ref payload) = args.payload {
        config.payload.clone_from(payload);
    }
    if let Some(payload_type) = args.payload_type {
        config.payload_type = payload_type;
    }

    Ok(config)
}
