//! # Live Subscription Source
//!
//! Receives write-ahead-log records over a channel fed by a subscription
//! to the execution layer. Same post-conditions as the WAL source; the
//! difference is pacing, since the next record may not exist yet.

use async_trait::async_trait;
use shared_types::TrieUpdate;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::FeedError;
use crate::traits::UpdateFeeder;
use crate::wal::{into_trie_update, WalRecord};

/// Update source over a live record subscription.
pub struct LiveFeeder {
    records: mpsc::Receiver<WalRecord>,
}

impl LiveFeeder {
    /// Source reading from the given subscription channel. A closed
    /// channel ends the stream.
    pub fn new(records: mpsc::Receiver<WalRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl UpdateFeeder for LiveFeeder {
    async fn next(&mut self) -> Result<TrieUpdate, FeedError> {
        loop {
            match self.records.recv().await {
                Some(WalRecord::Update(wire)) => return into_trie_update(wire, "subscription"),
                Some(_) => continue,
                None => {
                    debug!("subscription terminated");
                    return Err(FeedError::Finished);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::WalUpdate;
    use shared_types::Payload;

    #[tokio::test]
    async fn test_delivers_updates_and_finishes_on_close() {
        let (tx, rx) = mpsc::channel(4);
        let mut feeder = LiveFeeder::new(rx);

        tx.send(WalRecord::Update(WalUpdate {
            root: vec![0x01; 32],
            paths: vec![vec![0xAA; 32]],
            payloads: vec![Payload::null()],
        }))
        .await
        .unwrap();
        drop(tx);

        let update = feeder.next().await.unwrap();
        assert_eq!(update.root, [0x01; 32]);
        assert_eq!(update.paths, vec![[0xAA; 32]]);

        assert!(matches!(feeder.next().await, Err(FeedError::Finished)));
    }

    #[tokio::test]
    async fn test_skips_non_update_records() {
        let (tx, rx) = mpsc::channel(4);
        let mut feeder = LiveFeeder::new(rx);

        tx.send(WalRecord::Checkpoint { root: vec![0; 32] })
            .await
            .unwrap();
        tx.send(WalRecord::Update(WalUpdate {
            root: vec![0x02; 32],
            paths: vec![],
            payloads: vec![],
        }))
        .await
        .unwrap();
        drop(tx);

        assert_eq!(feeder.next().await.unwrap().root, [0x02; 32]);
    }

    #[tokio::test]
    async fn test_blocks_until_record_arrives() {
        let (tx, rx) = mpsc::channel(1);
        let mut feeder = LiveFeeder::new(rx);

        let producer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tx.send(WalRecord::Update(WalUpdate {
                root: vec![0x03; 32],
                paths: vec![],
                payloads: vec![],
            }))
            .await
            .unwrap();
        });

        let update = feeder.next().await.unwrap();
        assert_eq!(update.root, [0x03; 32]);
        producer.await.unwrap();
    }
}
