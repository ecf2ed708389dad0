//! # Shared Types Crate
//!
//! Domain entities shared by every Meridian subsystem: block metadata,
//! ledger payloads, trie updates, and the execution artifacts (collections,
//! transactions, events, seals) that the indexer persists per height.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Deterministic Identity**: entity identifiers are the SHA-256 of the
//!   entity's canonical encoding, so the same content always has the same id.
//! - **Plain Data**: entities carry no behavior beyond identity and trivial
//!   constructors; all indexing logic lives in the subsystem crates.

pub mod entities;

pub use entities::*;
