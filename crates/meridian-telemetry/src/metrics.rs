//! # Prometheus Metrics
//!
//! Metrics for the indexing pipeline. Naming convention:
//! `mi_<subsystem>_<metric>_<unit>`.
//!
//! Counters are bumped by the index writer's metrics decorator; the gauge
//! and histogram are updated by the mapper at commit time.

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, Encoder, Gauge, Histogram, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INDEX WRITER METRICS
    // =========================================================================

    /// Total blocks indexed.
    pub static ref BLOCKS_INDEXED: Counter = Counter::new(
        "mi_index_blocks_total",
        "Total number of blocks indexed"
    ).expect("metric creation failed");

    /// Total ledger registers indexed.
    pub static ref REGISTERS_INDEXED: Counter = Counter::new(
        "mi_index_registers_total",
        "Total number of ledger register versions indexed"
    ).expect("metric creation failed");

    /// Total collections indexed.
    pub static ref COLLECTIONS_INDEXED: Counter = Counter::new(
        "mi_index_collections_total",
        "Total number of collections indexed"
    ).expect("metric creation failed");

    /// Total transactions indexed.
    pub static ref TRANSACTIONS_INDEXED: Counter = Counter::new(
        "mi_index_transactions_total",
        "Total number of transactions indexed"
    ).expect("metric creation failed");

    /// Total events indexed.
    pub static ref EVENTS_INDEXED: Counter = Counter::new(
        "mi_index_events_total",
        "Total number of events indexed"
    ).expect("metric creation failed");

    /// Total seals indexed.
    pub static ref SEALS_INDEXED: Counter = Counter::new(
        "mi_index_seals_total",
        "Total number of seals indexed"
    ).expect("metric creation failed");

    // =========================================================================
    // MAPPER METRICS
    // =========================================================================

    /// Height of the last committed block.
    pub static ref INDEXED_HEIGHT: Gauge = Gauge::new(
        "mi_mapper_indexed_height",
        "Height of the last committed block"
    ).expect("metric creation failed");

    /// Time spent committing one height.
    pub static ref COMMIT_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "mi_mapper_commit_duration_seconds",
            "Time spent committing all indexes for one height"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("bucket creation failed"))
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Call once at startup.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BLOCKS_INDEXED.clone()),
        Box::new(REGISTERS_INDEXED.clone()),
        Box::new(COLLECTIONS_INDEXED.clone()),
        Box::new(TRANSACTIONS_INDEXED.clone()),
        Box::new(EVENTS_INDEXED.clone()),
        Box::new(SEALS_INDEXED.clone()),
        Box::new(INDEXED_HEIGHT.clone()),
        Box::new(COMMIT_DURATION.clone()),
    ];

    for collector in collectors {
        REGISTRY
            .register(collector)
            .map_err(|err| TelemetryError::MetricsInit(err.to_string()))?;
    }
    Ok(())
}

/// Render the registry in Prometheus text exposition format.
pub fn gather() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
