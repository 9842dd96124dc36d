//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::error::{ChainError, Result};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level. Engine events are logged
/// under the `persona::events` target, so `RUST_LOG=persona::events=info`
/// isolates them.
///
/// # Errors
/// Returns `ChainError::Telemetry` if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ChainError::Telemetry(e.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ChainError::Telemetry(e.to_string()))
}
