//! # Mapper (mi-05)
//!
//! The indexing state machine. Two independently paced input streams meet
//! here: block records from the chain collaborator and trie updates from
//! the feeder. The mapper applies updates to an in-memory trie forest
//! until some tree's root equals the block's target commitment, commits
//! every derived index for that height atomically, and prunes the forest
//! down to the finalized tree.
//!
//! ## Crate Structure
//!
//! - `trie` - sparse Merkle trie over 32-byte paths, arena-backed
//! - `forest` - trees keyed by root commitment with parent links by value
//! - `chain` - the chain collaborator port and the per-height block record
//! - `loader` - root checkpoint dump/load for bootstrap
//! - `mapper` - the state machine itself

pub mod chain;
pub mod errors;
pub mod forest;
pub mod loader;
pub mod mapper;
pub mod trie;

pub use chain::{BlockRecord, Chain, ChainError};
pub use errors::MapperError;
pub use forest::Forest;
pub use mapper::{Mapper, MapperConfig};
pub use trie::TrieStore;
