//! # Meridian Node Runtime
//!
//! Entry point for the `meridian-node` indexing service: reads a chain
//! record log and a ledger write-ahead log, builds the height-keyed
//! indexes, and leaves behind an index directory ready for the query APIs.
//!
//! Configuration comes from `MI_*` environment variables; see
//! [`config::NodeConfig`].

use anyhow::Result;
use tracing::info;

use meridian_node::config::NodeConfig;
use meridian_node::container;
use meridian_telemetry::{init_logging, metrics, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(&TelemetryConfig::from_env())?;
    metrics::register_metrics()?;

    info!("===========================================");
    info!("  Meridian Node Runtime v0.1.0");
    info!("===========================================");

    let config = NodeConfig::from_env()?;
    config.validate()?;

    container::run_node(config).await
}
