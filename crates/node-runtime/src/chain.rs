//! # Record Log Chain
//!
//! Batch-mode chain collaborator: per-height block records read from one
//! framed log file, the same framing the write-ahead log uses. Produced by
//! an external export step; the indexer treats its content as trusted.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path as FsPath;

use async_trait::async_trait;
use tracing::info;

use mi_04_feeder::framing::{decode_body, read_frame, Frame};
use mi_05_mapper::{BlockRecord, Chain, ChainError};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Seal, Transaction,
    TransactionResult,
};

/// Chain source over a block record log.
pub struct RecordLogChain {
    records: HashMap<Height, BlockRecord>,
    root: Height,
    head: Height,
}

impl RecordLogChain {
    /// Load a record log. `root_override` replaces the lowest recorded
    /// height as the bootstrap root when set.
    pub fn open(path: impl AsRef<FsPath>, root_override: Option<Height>) -> Result<Self, ChainError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|err| ChainError::Internal(format!("cannot open {}: {err}", path.display())))?;
        let mut reader = BufReader::new(file);
        let name = path.display().to_string();

        let mut records = HashMap::new();
        let mut buf = Vec::new();
        loop {
            match read_frame(&mut reader, &mut buf, &name)
                .map_err(|err| ChainError::Internal(err.to_string()))?
            {
                Frame::End => break,
                Frame::Record => {}
            }
            let record: BlockRecord =
                decode_body(&buf).map_err(|err| ChainError::Internal(err.to_string()))?;
            records.insert(record.height, record);
        }

        if records.is_empty() {
            return Err(ChainError::Internal(format!(
                "record log {name} holds no blocks"
            )));
        }

        let lowest = records.keys().copied().min().unwrap_or(0);
        let head = records.keys().copied().max().unwrap_or(0);
        let root = root_override.unwrap_or_else(|| lowest.saturating_sub(1));

        info!(blocks = records.len(), root, head, "loaded chain record log");
        Ok(Self {
            records,
            root,
            head,
        })
    }

    fn lookup(&self, height: Height) -> Result<BlockRecord, ChainError> {
        match self.records.get(&height) {
            Some(record) => Ok(record.clone()),
            // Past the recorded range the log has nothing more to give;
            // inside it, a hole means the export was incomplete.
            None if height > self.head => Err(ChainError::Finished),
            None => Err(ChainError::Internal(format!(
                "record log has a hole at height {height}"
            ))),
        }
    }
}

#[async_trait]
impl Chain for RecordLogChain {
    async fn root(&self) -> Result<Height, ChainError> {
        Ok(self.root)
    }

    async fn head(&self) -> Result<Height, ChainError> {
        Ok(self.head)
    }

    async fn header(&self, height: Height) -> Result<BlockHeader, ChainError> {
        self.lookup(height).map(|record| record.header)
    }

    async fn commit(&self, height: Height) -> Result<Commitment, ChainError> {
        self.lookup(height).map(|record| record.commit)
    }

    async fn collections(&self, height: Height) -> Result<Vec<Collection>, ChainError> {
        self.lookup(height).map(|record| record.collections)
    }

    async fn guarantees(&self, height: Height) -> Result<Vec<Guarantee>, ChainError> {
        self.lookup(height).map(|record| record.guarantees)
    }

    async fn transactions(&self, height: Height) -> Result<Vec<Transaction>, ChainError> {
        self.lookup(height).map(|record| record.transactions)
    }

    async fn results(&self, height: Height) -> Result<Vec<TransactionResult>, ChainError> {
        self.lookup(height).map(|record| record.results)
    }

    async fn events(&self, height: Height) -> Result<Vec<Event>, ChainError> {
        self.lookup(height).map(|record| record.events)
    }

    async fn seals(&self, height: Height) -> Result<Vec<Seal>, ChainError> {
        self.lookup(height).map(|record| record.seals)
    }

    async fn record(&self, height: Height) -> Result<BlockRecord, ChainError> {
        self.lookup(height)
    }
}

/// Append block records to a log file. Fixture and export helper.
pub fn write_record_log(
    path: impl AsRef<FsPath>,
    records: &[BlockRecord],
) -> Result<(), std::io::Error> {
    use std::io::BufWriter;

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    for record in records {
        mi_04_feeder::framing::write_record(&mut writer, record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(height: Height) -> BlockRecord {
        BlockRecord {
            height,
            header: BlockHeader {
                chain_id: "meridian-test".to_string(),
                height,
                parent_id: [0; 32],
                timestamp: height,
                payload_hash: [0; 32],
                parent_voter_sig_data: vec![],
                proposer_id: [0; 32],
                proposer_sig_data: vec![],
            },
            commit: [height as u8; 32],
            collections: vec![],
            guarantees: vec![],
            transactions: vec![],
            results: vec![],
            events: vec![],
            seals: vec![],
        }
    }

    #[tokio::test]
    async fn test_roundtrip_and_bounds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        write_record_log(&path, &[record(1), record(2), record(3)]).unwrap();

        let chain = RecordLogChain::open(&path, None).unwrap();
        assert_eq!(chain.root().await.unwrap(), 0);
        assert_eq!(chain.head().await.unwrap(), 3);
        assert_eq!(chain.commit(2).await.unwrap(), [2; 32]);
        assert!(matches!(
            chain.record(4).await,
            Err(ChainError::Finished)
        ));
    }

    #[tokio::test]
    async fn test_hole_is_internal_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        write_record_log(&path, &[record(1), record(3)]).unwrap();

        let chain = RecordLogChain::open(&path, None).unwrap();
        assert!(matches!(
            chain.record(2).await,
            Err(ChainError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_root_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        write_record_log(&path, &[record(101)]).unwrap();

        let chain = RecordLogChain::open(&path, Some(100)).unwrap();
        assert_eq!(chain.root().await.unwrap(), 100);
    }

    #[test]
    fn test_empty_log_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chain.log");
        write_record_log(&path, &[]).unwrap();

        assert!(RecordLogChain::open(&path, None).is_err());
    }
}
