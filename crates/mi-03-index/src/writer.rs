//! # Index Writer
//!
//! Storage-backed `IndexWriter`. Scalar writes for a height are staged and
//! committed in one transaction when `last` is called; bulk payload writes
//! stream through chunked write batches as they arrive.
//!
//! ## Commit Ordering
//!
//! `last(h)` performs, in order: the pending payload batch, the staged
//! scalar writes in one transaction, and finally the last-height bump in
//! its own transaction. A crash before the bump leaves height `h`
//! invisible to readers and safe to re-index; a crash after it leaves the
//! height fully visible.
//!
//! ## Buffering
//!
//! The payload batch flushes when it crosses the size threshold or when a
//! background task finds it idle past the configured interval. `close`
//! flushes the batch and waits; staged scalar writes of an uncommitted
//! height are discarded, matching crash semantics for a hard stop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rayon::prelude::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use mi_01_codec::{Codec, ValueCodec};
use mi_02_storage::{combine, fallback, Library, Operation, Store, StoreBatch};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Identifier, Path, Payload, Seal,
    Transaction, TransactionResult,
};

use crate::errors::IndexError;
use crate::traits::IndexWriter;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Flush the payload batch once it has been idle this long.
    pub flush_interval: Duration,
    /// Flush the payload batch once it grows past this size.
    pub max_batch_bytes: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(1),
            max_batch_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Default)]
struct Staged {
    batch: StoreBatch,
    batch_touched: Option<Instant>,
    ops: Vec<Operation<'static>>,
}

/// Storage-backed index writer.
///
/// Must be created inside a tokio runtime; the idle flusher runs as a
/// background task until `close`.
pub struct Writer<C: ValueCodec = Codec> {
    store: Arc<Store>,
    lib: Library<C>,
    config: WriterConfig,
    staged: Arc<Mutex<Staged>>,
    closed: AtomicBool,
    shutdown: watch::Sender<bool>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl<C: ValueCodec + 'static> Writer<C> {
    /// Create the writer and spawn its idle flusher.
    pub fn new(store: Arc<Store>, lib: Library<C>, config: WriterConfig) -> Self {
        let staged = Arc::new(Mutex::new(Staged::default()));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let flusher = tokio::spawn(run_flusher(
            Arc::clone(&store),
            Arc::clone(&staged),
            config.flush_interval,
            shutdown_rx,
        ));

        Self {
            store,
            lib,
            config,
            staged,
            closed: AtomicBool::new(false),
            shutdown,
            flusher: Mutex::new(Some(flusher)),
        }
    }

    /// Flush buffered payloads, stop the flusher, and refuse further
    /// writes. Staged scalar writes of an uncommitted height are dropped.
    pub async fn close(&self) -> Result<(), IndexError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let _ = self.shutdown.send(true);
        let handle = self.flusher.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        let (batch, dropped_ops) = {
            let mut staged = self.staged.lock();
            let batch = std::mem::take(&mut staged.batch);
            let ops = std::mem::take(&mut staged.ops);
            (batch, ops.len())
        };
        if dropped_ops > 0 {
            warn!(dropped_ops, "discarding staged writes of uncommitted height");
        }
        if !batch.is_empty() {
            self.store.write_batch(batch)?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), IndexError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(IndexError::Closed);
        }
        Ok(())
    }

    fn stage(&self, op: Operation<'static>) -> Result<(), IndexError> {
        self.ensure_open()?;
        self.staged.lock().ops.push(op);
        Ok(())
    }
}

async fn run_flusher(
    store: Arc<Store>,
    staged: Arc<Mutex<Staged>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        let batch = {
            let mut staged = staged.lock();
            let idle = staged
                .batch_touched
                .map(|touched| touched.elapsed() >= interval)
                .unwrap_or(false);
            if staged.batch.is_empty() || !idle {
                continue;
            }
            staged.batch_touched = None;
            std::mem::take(&mut staged.batch)
        };

        debug!(entries = batch.len(), "idle-flushing payload batch");
        if let Err(err) = store.write_batch(batch) {
            // The mapper's next synchronous flush will surface the failure;
            // the flusher itself has no one to report to.
            warn!(error = %err, "background payload flush failed");
        }
    }
}

impl<C: ValueCodec + 'static> IndexWriter for Writer<C> {
    fn first(&self, height: Height) -> Result<(), IndexError> {
        self.ensure_open()?;
        // Idempotent: an existing first-height sentinel wins, so a crashed
        // bootstrap can simply run again.
        self.store.update(fallback(vec![
            self.lib.require_first(),
            self.lib.save_first(height),
        ]))?;
        Ok(())
    }

    fn header(&self, height: Height, header: &BlockHeader) -> Result<(), IndexError> {
        self.stage(self.lib.save_header(height, header.clone()))
    }

    fn commit(&self, height: Height, commit: Commitment) -> Result<(), IndexError> {
        self.stage(self.lib.save_commit(height, commit))
    }

    fn height_for_block(&self, block_id: Identifier, height: Height) -> Result<(), IndexError> {
        self.stage(self.lib.save_height_for_block(block_id, height))
    }

    fn payloads(
        &self,
        height: Height,
        paths: &[Path],
        payloads: &[Payload],
    ) -> Result<(), IndexError> {
        self.ensure_open()?;

        // Last write per path wins within one height.
        let mut deduped: HashMap<&Path, &Payload> = HashMap::with_capacity(paths.len());
        for (path, payload) in paths.iter().zip(payloads.iter()) {
            deduped.insert(path, payload);
        }

        let entries = deduped
            .into_par_iter()
            .map(|(path, payload)| self.lib.payload_entry(height, path, payload))
            .collect::<Result<Vec<_>, _>>()?;

        let full = {
            let mut staged = self.staged.lock();
            for (key, value) in &entries {
                staged.batch.put(key, value);
            }
            staged.batch_touched = Some(Instant::now());
            if staged.batch.size_bytes() >= self.config.max_batch_bytes {
                staged.batch_touched = None;
                Some(std::mem::take(&mut staged.batch))
            } else {
                None
            }
        };

        if let Some(batch) = full {
            debug!(entries = batch.len(), "size-flushing payload batch");
            self.store.write_batch(batch)?;
        }
        Ok(())
    }

    fn events(&self, height: Height, events: &[Event]) -> Result<(), IndexError> {
        self.ensure_open()?;

        // One bucket per type hash, preserving delivery order inside each.
        let mut buckets: Vec<(u64, Vec<Event>)> = Vec::new();
        for event in events {
            let hash = mi_02_storage::event_type_hash(&event.event_type);
            match buckets.iter_mut().find(|(h, _)| *h == hash) {
                Some((_, bucket)) => bucket.push(event.clone()),
                None => buckets.push((hash, vec![event.clone()])),
            }
        }

        for (hash, bucket) in buckets {
            self.stage(self.lib.save_events(height, hash, bucket))?;
        }
        Ok(())
    }

    fn collections(&self, height: Height, collections: &[Collection]) -> Result<(), IndexError> {
        let ids: Vec<Identifier> = collections.iter().map(Collection::id).collect();
        for collection in collections {
            let collection_id = collection.id();
            self.stage(self.lib.save_collection(collection.clone()))?;
            self.stage(
                self.lib
                    .save_transactions_for_collection(collection_id, collection.transaction_ids.clone()),
            )?;
        }
        self.stage(self.lib.save_collections_for_height(height, ids))
    }

    fn guarantees(&self, guarantees: &[Guarantee]) -> Result<(), IndexError> {
        for guarantee in guarantees {
            self.stage(self.lib.save_guarantee(guarantee.clone()))?;
        }
        Ok(())
    }

    fn transactions(&self, height: Height, transactions: &[Transaction]) -> Result<(), IndexError> {
        let ids: Vec<Identifier> = transactions.iter().map(Transaction::id).collect();
        for (transaction, id) in transactions.iter().zip(ids.iter()) {
            self.stage(self.lib.save_transaction(transaction.clone()))?;
            self.stage(self.lib.save_height_for_transaction(*id, height))?;
        }
        self.stage(self.lib.save_transactions_for_height(height, ids))
    }

    fn results(&self, results: &[TransactionResult]) -> Result<(), IndexError> {
        for result in results {
            self.stage(self.lib.save_result(result.clone()))?;
        }
        Ok(())
    }

    fn seals(&self, height: Height, seals: &[Seal]) -> Result<(), IndexError> {
        let ids: Vec<Identifier> = seals.iter().map(Seal::id).collect();
        for seal in seals {
            self.stage(self.lib.save_seal(seal.clone()))?;
        }
        self.stage(self.lib.save_seals_for_height(height, ids))
    }

    fn last(&self, height: Height) -> Result<(), IndexError> {
        self.ensure_open()?;

        // Payloads first: they must be durable before the height becomes
        // visible.
        let batch = {
            let mut staged = self.staged.lock();
            staged.batch_touched = None;
            std::mem::take(&mut staged.batch)
        };
        if !batch.is_empty() {
            self.store.write_batch(batch)?;
        }

        // All scalar writes of the height in one transaction.
        let ops = std::mem::take(&mut self.staged.lock().ops);
        if !ops.is_empty() {
            self.store.update(combine(ops))?;
        }

        // The bump is the commit point.
        self.store.update(self.lib.save_last(height))?;
        Ok(())
    }
}

impl<C: ValueCodec> Drop for Writer<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.flusher.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;
    use crate::traits::IndexReader;
    use mi_02_storage::StoreConfig;
    use shared_types::PayloadKey;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<Store>, Library, Writer) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(StoreConfig::for_testing(dir.path())).unwrap());
        let lib = Library::new(Codec::new());
        let writer = Writer::new(Arc::clone(&store), lib.clone(), WriterConfig::default());
        (dir, store, lib, writer)
    }

    fn payload(value: &[u8]) -> Payload {
        Payload {
            key: PayloadKey::default(),
            value: value.to_vec(),
        }
    }

    fn header(height: Height) -> BlockHeader {
        BlockHeader {
            chain_id: "meridian-test".to_string(),
            height,
            parent_id: [0; 32],
            timestamp: height * 1000,
            payload_hash: [0; 32],
            parent_voter_sig_data: vec![],
            proposer_id: [0; 32],
            proposer_sig_data: vec![],
        }
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_last() {
        let (_dir, store, lib, writer) = setup();

        writer.first(1).unwrap();
        writer.header(1, &header(1)).unwrap();
        writer.commit(1, [0xAB; 32]).unwrap();

        let reader = Reader::new(Arc::clone(&store), lib);
        assert!(matches!(reader.header(1), Err(IndexError::NotFound)));

        writer.last(1).unwrap();
        assert_eq!(reader.header(1).unwrap(), header(1));
        assert_eq!(reader.last().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_payload_duplicate_keeps_last_write() {
        let (_dir, store, lib, writer) = setup();

        let path: Path = [0x07; 32];
        writer.first(1).unwrap();
        writer
            .payloads(1, &[path, path], &[payload(b"old"), payload(b"new")])
            .unwrap();
        writer.last(1).unwrap();

        let reader = Reader::new(Arc::clone(&store), lib);
        assert_eq!(reader.values(1, &[path]).unwrap(), vec![payload(b"new")]);
    }

    #[tokio::test]
    async fn test_values_out_of_range() {
        let (_dir, store, lib, writer) = setup();

        writer.first(100).unwrap();
        writer.last(200).unwrap();

        let reader = Reader::new(Arc::clone(&store), lib);
        let path: Path = [0; 32];

        for height in [50, 250] {
            match reader.values(height, &[path]) {
                Err(IndexError::OutOfRange { first, last, .. }) => {
                    assert_eq!((first, last), (100, 200));
                }
                other => panic!("expected OutOfRange, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_null_payload_for_unwritten_path() {
        let (_dir, store, lib, writer) = setup();

        writer.first(1).unwrap();
        writer.last(1).unwrap();

        let reader = Reader::new(Arc::clone(&store), lib);
        let values = reader.values(1, &[[0x42; 32]]).unwrap();
        assert_eq!(values, vec![Payload::null()]);
    }

    #[tokio::test]
    async fn test_event_bucketing_by_type() {
        let (_dir, store, lib, writer) = setup();

        let ev = |t: &str, index| Event {
            event_type: t.to_string(),
            transaction_id: [0; 32],
            transaction_index: 0,
            event_index: index,
            payload: vec![],
        };

        writer.first(7).unwrap();
        writer
            .events(7, &[ev("T1", 0), ev("T2", 1), ev("T1", 2)])
            .unwrap();
        writer.last(7).unwrap();

        let reader = Reader::new(Arc::clone(&store), lib);

        let t1 = reader.events(7, &["T1".to_string()]).unwrap();
        assert_eq!(t1.len(), 2);
        assert_eq!(t1[0].event_index, 0);
        assert_eq!(t1[1].event_index, 2);

        let t2 = reader.events(7, &["T2".to_string()]).unwrap();
        assert_eq!(t2.len(), 1);

        let all = reader.events(7, &[]).unwrap();
        assert_eq!(all.len(), 3);

        let unknown = reader.events(7, &["UNKNOWN".to_string()]).unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_close_refuses_further_writes() {
        let (_dir, _store, _lib, writer) = setup();

        writer.close().await.unwrap();
        assert!(matches!(writer.first(1), Err(IndexError::Closed)));
        assert!(matches!(
            writer.payloads(1, &[], &[]),
            Err(IndexError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_flushes_pending_payloads() {
        let (_dir, store, lib, writer) = setup();

        let path: Path = [0x09; 32];
        writer.first(1).unwrap();
        writer.payloads(1, &[path], &[payload(b"kept")]).unwrap();
        writer.last(1).unwrap();

        // Payloads staged after the commit point belong to the next height;
        // close must still push them to disk.
        writer.payloads(2, &[path], &[payload(b"next")]).unwrap();
        writer.close().await.unwrap();

        let restored = store
            .view(|view| lib.retrieve_payload(view, 2, &path))
            .unwrap();
        assert_eq!(restored, Some(payload(b"next")));
    }
}
