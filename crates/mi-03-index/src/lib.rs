//! # Index Access (mi-03)
//!
//! The typed index API the mapper writes through and the API servers read
//! through. This layer adds what raw storage does not have:
//!
//! - **Range guard**: ledger and event queries fail fast outside the
//!   indexed `[first, last]` range instead of returning stale emptiness.
//! - **Null payloads**: register reads translate absence into the
//!   first-class null payload; every other read surfaces `NotFound`.
//! - **Per-height event bucketing**: events are grouped by a 64-bit hash of
//!   their type name and stored one bucket per type.
//! - **Batched payload writes**: a trie update can carry hundreds of
//!   thousands of paths; those flow through chunked write batches with an
//!   idle-interval background flush.
//! - **Metrics passthrough**: a decorator counts indexed entities without
//!   changing any contract.

pub mod errors;
pub mod metrics;
pub mod reader;
pub mod traits;
pub mod writer;

pub use errors::IndexError;
pub use metrics::MetricsWriter;
pub use reader::Reader;
pub use traits::{IndexReader, IndexWriter};
pub use writer::{Writer, WriterConfig};
