//! # Mapper Errors

use mi_03_index::IndexError;
use mi_04_feeder::FeedError;
use shared_types::Commitment;
use thiserror::Error;

use crate::chain::ChainError;

/// Errors surfaced by the indexing state machine.
///
/// The inconsistency variants mean the chain and feeder streams disagree in
/// a way the mapper cannot recover from; an operator must investigate.
#[derive(Debug, Error)]
pub enum MapperError {
    /// The chain collaborator failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The update feeder failed.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// An index write or read failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Cooperative shutdown was requested.
    #[error("mapper cancelled")]
    Cancelled,

    /// The forest holds more trees than the configured cap allows.
    #[error("forest overflow: {trees} trees exceeds limit {limit}")]
    ForestOverflow {
        /// Trees currently in the forest.
        trees: usize,
        /// Configured cap.
        limit: usize,
    },

    /// A speculative branch grew deeper than the configured cap.
    #[error("forest branch overflow: depth {depth} exceeds limit {limit}")]
    BranchOverflow {
        /// Distance of the offending tree from the finalized root.
        depth: u64,
        /// Configured cap.
        limit: u64,
    },

    /// Too many updates are buffered for roots the mapper never reached.
    #[error("pending update overflow: {buffered} updates exceeds limit {limit}")]
    PendingOverflow {
        /// Updates currently buffered.
        buffered: usize,
        /// Configured cap.
        limit: usize,
    },

    /// Resume found a persisted commitment the replayed streams never
    /// produce.
    #[error("replayed update stream never reaches persisted commitment {}", hex_prefix(.commit))]
    UnreachableCommit {
        /// The commitment recorded for the last indexed height.
        commit: Commitment,
    },

    /// The root checkpoint could not be read.
    #[error("checkpoint load failed: {context}")]
    Checkpoint {
        /// What went wrong while loading.
        context: String,
    },
}

fn hex_prefix(commit: &Commitment) -> String {
    hex::encode(&commit[..4])
}
