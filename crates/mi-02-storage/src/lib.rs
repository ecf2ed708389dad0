//! # Storage Library (mi-02)
//!
//! Typed read/write operations over the embedded key/value store. This crate
//! owns the key schema and hides all byte layout from higher layers: callers
//! deal in heights, identifiers, and domain entities, never in raw keys.
//!
//! ## Layers
//!
//! - `keys` - namespace prefixes and deterministic key encoding
//! - `store` - RocksDB wrapper: transactions, write batches, prefix iterators
//! - `operations` - the typed `Library` of save/retrieve operations
//! - `combinators` - `combine` / `fallback` composition of operations
//!
//! ## Transactional Discipline
//!
//! All writes for a single height go through either one transaction or one
//! write batch. `combine` (first error aborts) and `fallback` (first success
//! wins) are the only composition primitives exposed to the mapper.

pub mod combinators;
pub mod errors;
pub mod keys;
pub mod operations;
pub mod store;

pub use combinators::{combine, fallback, Operation};
pub use errors::StorageError;
pub use keys::{encode_key, event_type_hash, prefixes, Segment};
pub use operations::Library;
pub use store::{Direction, Store, StoreBatch, StoreConfig, StoreTransaction, StoreView};
