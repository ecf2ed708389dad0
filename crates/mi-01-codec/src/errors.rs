//! # Codec Errors

use thiserror::Error;

/// Errors surfaced by encoding, decoding, or the compression layer.
///
/// A codec error always means a structural mismatch between the bytes and
/// the expected value shape; it is fatal for the writer path and reportable
/// for readers.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("value encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    /// Bytes could not be decoded into the expected value.
    #[error("value decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    /// Compression of an encoded value failed.
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),

    /// Decompression failed with every configured dictionary.
    #[error("decompression failed under all {attempts} configured dictionaries: {last}")]
    Decompress {
        /// Number of dictionaries (including dictionary-less) attempted.
        attempts: usize,
        /// Error from the final attempt.
        #[source]
        last: std::io::Error,
    },
}
