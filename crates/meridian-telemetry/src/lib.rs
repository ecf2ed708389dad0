//! # Meridian Telemetry
//!
//! Observability plumbing shared by the indexer subsystems: structured
//! logging via `tracing` and a Prometheus registry of indexing metrics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meridian_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("logging init failed");
//!     // subsystems log through `tracing` and bump the metrics registry
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MI_LOG_LEVEL` | `info` | Log level filter (tracing env-filter syntax) |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log subscriber could not be installed.
    #[error("failed to install log subscriber: {0}")]
    LoggingInit(String),

    /// A metric could not be registered.
    #[error("failed to register metric: {0}")]
    MetricsInit(String),
}
