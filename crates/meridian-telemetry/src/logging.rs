//! # Logging Setup
//!
//! One global `tracing` subscriber, installed by the binary at startup.
//! Library crates only ever emit through `tracing` macros.

use tracing_subscriber::EnvFilter;

use crate::{TelemetryConfig, TelemetryError};

/// Install the global log subscriber.
///
/// The configured level acts as the default; the standard `RUST_LOG`
/// variable still takes precedence when set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| TelemetryError::LoggingInit(err.to_string()))
}
