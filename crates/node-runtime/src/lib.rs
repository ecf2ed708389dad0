//! # Meridian Node Library
//!
//! Wiring for the indexing service: configuration, the batch-mode chain
//! adapter, and the container that assembles subsystems into a running
//! mapper. The binary in `main.rs` is a thin shell over this.

pub mod chain;
pub mod config;
pub mod container;

pub use chain::RecordLogChain;
pub use config::{NodeConfig, SourceConfig};
