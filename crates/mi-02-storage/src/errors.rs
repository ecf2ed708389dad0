//! # Storage Errors

use mi_01_codec::CodecError;
use thiserror::Error;

/// Errors surfaced by the storage library.
///
/// A missing key (`NotFound`) is always distinguished from engine failure;
/// callers rely on that to translate absence into domain-level nulls.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested key is not present in the store.
    #[error("key not found")]
    NotFound,

    /// The storage engine reported an error.
    #[error("storage engine error: {0}")]
    Engine(#[from] rocksdb::Error),

    /// A stored value failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A stored value has an impossible shape for its namespace.
    #[error("malformed stored value: {context}")]
    Malformed {
        /// What was being decoded and what was wrong with it.
        context: String,
    },

    /// A transaction kept conflicting after the retry budget was spent.
    #[error("transaction failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Engine error from the final attempt.
        #[source]
        last: rocksdb::Error,
    },

    /// Every operation handed to `fallback` failed.
    #[error("all {count} fallback operations failed; last: {last}")]
    FallbackExhausted {
        /// Number of operations attempted.
        count: usize,
        /// Error from the final operation.
        #[source]
        last: Box<StorageError>,
    },
}

impl StorageError {
    /// Whether this error means "the key simply is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound)
    }
}
