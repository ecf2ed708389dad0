//! # Index Errors

use mi_02_storage::StorageError;
use shared_types::Height;
use thiserror::Error;

/// Errors surfaced by the index reader and writer.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The requested entity is not indexed.
    #[error("entity not indexed")]
    NotFound,

    /// The requested height lies outside the indexed range.
    #[error("height {height} outside indexed range [{first}, {last}]")]
    OutOfRange {
        /// Requested height.
        height: Height,
        /// Lowest indexed height.
        first: Height,
        /// Highest indexed height.
        last: Height,
    },

    /// The writer has been closed; no further writes succeed.
    #[error("index writer is closed")]
    Closed,

    /// An underlying storage failure.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for IndexError {
    fn from(err: StorageError) -> Self {
        // Absence is a domain condition here, not a storage failure.
        if err.is_not_found() {
            IndexError::NotFound
        } else {
            IndexError::Storage(err)
        }
    }
}
