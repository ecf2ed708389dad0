//! # Feeder Errors

use thiserror::Error;

/// Errors surfaced by an update source.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The stream has delivered everything it ever will. In batch mode
    /// this is the clean end; in live mode it means the subscription
    /// terminated.
    #[error("update stream finished")]
    Finished,

    /// Cooperative shutdown was requested.
    #[error("update stream cancelled")]
    Cancelled,

    /// A record failed structural validation.
    #[error("corrupt record: {context}")]
    Corrupt {
        /// What was wrong with the record.
        context: String,
    },

    /// A record body failed to decode.
    #[error("record decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    /// Reading a segment failed.
    #[error("i/o failure on segment {segment}: {source}")]
    Io {
        /// Segment file the failure occurred on.
        segment: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
