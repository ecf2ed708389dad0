//! # Meridian Test Suite
//!
//! Cross-crate tests exercising the full indexing pipeline the way the
//! node runs it: chain records and WAL segments on disk, a real RocksDB
//! index directory, and the mapper in between. Crate-local unit tests live
//! next to their subjects; everything here spans subsystem boundaries.

pub mod fixtures;

#[cfg(test)]
mod properties;
#[cfg(test)]
mod scenarios;
