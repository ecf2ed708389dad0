//! # Feeder Port

use async_trait::async_trait;
use shared_types::TrieUpdate;

use crate::errors::FeedError;

/// A single-consumer source of in-order trie updates.
///
/// `next` either yields the next update, ends the stream with
/// [`FeedError::Finished`], or fails. The live source may block awaiting
/// the next record; cancellation is cooperative and surfaces on the next
/// call.
#[async_trait]
pub trait UpdateFeeder: Send {
    /// Produce the next trie update in stream order.
    async fn next(&mut self) -> Result<TrieUpdate, FeedError>;
}
