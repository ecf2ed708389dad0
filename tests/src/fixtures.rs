//! # Shared Fixtures
//!
//! Builders for on-disk input streams (chain record log, WAL segments) and
//! a harness that runs the mapper over them against a real index store.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::watch;

use mi_01_codec::Codec;
use mi_02_storage::{Library, Store, StoreConfig};
use mi_03_index::{MetricsWriter, Reader, Writer, WriterConfig};
use mi_04_feeder::test_utils::WalWriter;
use mi_04_feeder::WalFeeder;
use mi_05_mapper::{BlockRecord, Mapper, MapperConfig, MapperError, TrieStore};
use meridian_node::chain::{write_record_log, RecordLogChain};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Height, Path, Payload, PayloadKey, Seal,
    Transaction, TransactionResult, TrieUpdate, ZERO_COMMITMENT,
};

/// One on-disk index plus everything needed to run and query it.
pub struct TestIndex {
    /// Owns the temp directory for the store, logs, and segments.
    pub dir: TempDir,
    /// The index store.
    pub store: Arc<Store>,
    /// Storage library over the store.
    pub lib: Library,
}

impl TestIndex {
    /// Fresh empty index in a temp directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let store = Arc::new(
            Store::open(StoreConfig::for_testing(dir.path().join("index"))).expect("open store"),
        );
        let lib = Library::new(Codec::new());
        Self { dir, store, lib }
    }

    /// A fresh reader over the index.
    pub fn reader(&self) -> Reader {
        Reader::new(Arc::clone(&self.store), self.lib.clone())
    }

    /// Write the input streams to disk and run the mapper over them until
    /// they are exhausted.
    pub async fn run_mapper(
        &self,
        records: &[BlockRecord],
        updates: &[TrieUpdate],
    ) -> Result<(), MapperError> {
        self.run_mapper_with(records, updates, MapperConfig::default())
            .await
    }

    /// Same as [`run_mapper`](Self::run_mapper) with explicit mapper
    /// configuration.
    pub async fn run_mapper_with(
        &self,
        records: &[BlockRecord],
        updates: &[TrieUpdate],
        config: MapperConfig,
    ) -> Result<(), MapperError> {
        let chain_log = self.dir.path().join("chain.log");
        write_record_log(&chain_log, records).expect("write chain log");

        let wal_dir = self.dir.path().join("wal");
        std::fs::create_dir_all(&wal_dir).expect("create wal dir");
        // Clear previous segments so reruns replay the same stream.
        for entry in std::fs::read_dir(&wal_dir).expect("list wal dir") {
            std::fs::remove_file(entry.expect("entry").path()).expect("remove segment");
        }
        let mut segment = WalWriter::create(&wal_dir, 0).expect("create segment");
        for update in updates {
            let writes = update
                .paths
                .iter()
                .copied()
                .zip(update.payloads.iter().cloned())
                .collect();
            segment
                .append_update(update.root, writes)
                .expect("append update");
        }
        segment.finish().expect("finish segment");

        let chain = RecordLogChain::open(&chain_log, None).expect("open chain log");
        let feeder = WalFeeder::open(&wal_dir).expect("open wal");
        let writer = MetricsWriter::new(Writer::new(
            Arc::clone(&self.store),
            self.lib.clone(),
            WriterConfig::default(),
        ));
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        Mapper::new(chain, feeder, self.reader(), writer, config, cancel_rx)
            .run()
            .await
    }
}

impl Default for TestIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// A payload with a recognizable value.
pub fn payload(value: &[u8]) -> Payload {
    Payload {
        key: PayloadKey {
            owner: vec![0x01; 8],
            controller: vec![],
            key: b"register".to_vec(),
        },
        value: value.to_vec(),
    }
}

/// A path with the given low byte, zero elsewhere.
pub fn path(low: u8) -> Path {
    let mut path = [0u8; 32];
    path[31] = low;
    path
}

/// A trie update.
pub fn update(root: Commitment, writes: &[(Path, Payload)]) -> TrieUpdate {
    TrieUpdate {
        root,
        paths: writes.iter().map(|(p, _)| *p).collect(),
        payloads: writes.iter().map(|(_, v)| v.clone()).collect(),
    }
}

/// A block header at a height.
pub fn header(height: Height) -> BlockHeader {
    BlockHeader {
        chain_id: "meridian-test".to_string(),
        height,
        parent_id: [height as u8; 32],
        timestamp: 1_700_000_000_000 + height * 800,
        payload_hash: [0x20; 32],
        parent_voter_sig_data: vec![0x01],
        proposer_id: [0x30; 32],
        proposer_sig_data: vec![0x02],
    }
}

/// A bare block record with a target commitment.
pub fn block(height: Height, commit: Commitment) -> BlockRecord {
    BlockRecord {
        height,
        header: header(height),
        commit,
        collections: vec![],
        guarantees: vec![],
        transactions: vec![],
        results: vec![],
        events: vec![],
        seals: vec![],
    }
}

/// An event of the given type.
pub fn event(event_type: &str, tx_index: u32, event_index: u32) -> Event {
    Event {
        event_type: event_type.to_string(),
        transaction_id: [tx_index as u8; 32],
        transaction_index: tx_index,
        event_index,
        payload: vec![event_index as u8],
    }
}

/// A transaction with a distinguishing script.
pub fn transaction(tag: u8) -> Transaction {
    Transaction {
        script: vec![tag; 16],
        arguments: vec![],
        reference_block_id: [tag; 32],
        gas_limit: 100,
        payer: vec![tag; 8],
        authorizers: vec![],
    }
}

/// The result for a transaction.
pub fn result(transaction: &Transaction) -> TransactionResult {
    TransactionResult {
        transaction_id: transaction.id(),
        error_message: String::new(),
    }
}

/// A seal for a block.
pub fn seal(tag: u8) -> Seal {
    Seal {
        block_id: [tag; 32],
        result_id: [tag.wrapping_add(1); 32],
        final_state: [tag.wrapping_add(2); 32],
    }
}

/// A collection over the given transactions.
pub fn collection(transactions: &[Transaction]) -> Collection {
    Collection {
        transaction_ids: transactions.iter().map(Transaction::id).collect(),
    }
}

/// Compute the commitments a sequence of updates produces, starting from
/// the empty trie. Returns one commitment per update, in order.
pub fn expected_commits(updates: &[TrieUpdate]) -> Vec<Commitment> {
    let mut probe = TrieStore::new();
    let mut current = ZERO_COMMITMENT;
    let mut commits = Vec::with_capacity(updates.len());
    for update in updates {
        assert_eq!(
            update.root, current,
            "expected_commits requires a linear update chain"
        );
        current = probe.apply_update(update);
        commits.push(current);
    }
    commits
}
