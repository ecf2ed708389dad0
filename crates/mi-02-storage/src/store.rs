//! # Store
//!
//! RocksDB wrapper exposing the three access shapes the indexer needs:
//! read-only views, pessimistic transactions, and write batches. The batch
//! path exists because a single trie update can carry hundreds of thousands
//! of payloads, more than a transaction can hold.
//!
//! Iteration is exposed through one prefix-bounded range iterator with an
//! explicit direction; every multi-key lookup in the schema layers onto it.

use std::path::Path as FsPath;

use rocksdb::{
    DBIteratorWithThreadMode, ErrorKind, IteratorMode, Options, ReadOptions, TransactionDB,
    TransactionDBOptions, TransactionOptions, WriteBatchWithTransaction, WriteOptions,
};
use tracing::warn;

use crate::errors::StorageError;

/// Transactions that keep conflicting are retried this many times in total
/// before the error is surfaced.
const MAX_TXN_ATTEMPTS: u32 = 3;

/// Iteration direction for range scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order.
    Forward,
    /// Descending key order.
    Reverse,
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the index database.
    pub path: std::path::PathBuf,
    /// Block cache size in bytes.
    pub block_cache_size: usize,
    /// Memtable size in bytes.
    pub write_buffer_size: usize,
    /// fsync on every commit and batch. Default on: a crash can then never
    /// lose an acknowledged height. Turning it off roughly doubles bulk
    /// indexing throughput at the cost of the last few heights on power
    /// loss.
    pub sync_writes: bool,
}

impl StoreConfig {
    /// Production defaults rooted at the given directory.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 256 * 1024 * 1024,
            write_buffer_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }

    /// Small buffers, no fsync. For tests only.
    pub fn for_testing(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

/// The embedded key/value store.
///
/// One `Store` owns one RocksDB directory. The mapper is the only writer;
/// readers operate on `view` and never mutate.
pub struct Store {
    db: TransactionDB,
    config: StoreConfig,
}

impl Store {
    /// Open or create the store at the configured directory.
    pub fn open(config: StoreConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let txn_opts = TransactionDBOptions::default();
        let db = TransactionDB::open(&opts, &txn_opts, &config.path)?;

        Ok(Self { db, config })
    }

    /// Open with defaults rooted at `path`.
    pub fn open_default(path: impl AsRef<FsPath>) -> Result<Self, StorageError> {
        Self::open(StoreConfig::new(path.as_ref()))
    }

    fn write_opts(&self) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        write_opts
    }

    /// Run `op` inside one transaction; commit on success, roll back on
    /// error. Conflicting commits are retried up to the attempt budget.
    pub fn update<T>(
        &self,
        op: impl Fn(&StoreTransaction<'_>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let txn = self
                .db
                .transaction_opt(&self.write_opts(), &TransactionOptions::default());
            let wrapper = StoreTransaction { inner: txn };

            let value = match op(&wrapper) {
                Ok(value) => value,
                Err(err) => {
                    wrapper.inner.rollback()?;
                    return Err(err);
                }
            };

            match wrapper.inner.commit() {
                Ok(()) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < MAX_TXN_ATTEMPTS => {
                    warn!(attempt, error = %err, "transaction conflict, retrying");
                }
                Err(err) if is_transient(&err) => {
                    return Err(StorageError::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Run `f` against a read-only view of the store.
    pub fn view<T>(
        &self,
        f: impl FnOnce(&StoreView<'_>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let view = StoreView { db: &self.db };
        f(&view)
    }

    /// Apply one write batch atomically.
    pub fn write_batch(&self, batch: StoreBatch) -> Result<(), StorageError> {
        self.db.write_opt(batch.inner, &self.write_opts())?;
        Ok(())
    }
}

fn is_transient(err: &rocksdb::Error) -> bool {
    matches!(err.kind(), ErrorKind::Busy | ErrorKind::TryAgain)
}

/// A read/write transaction.
pub struct StoreTransaction<'db> {
    inner: rocksdb::Transaction<'db, TransactionDB>,
}

impl StoreTransaction<'_> {
    /// Read a key within the transaction.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.inner.get(key)?)
    }

    /// Write a key within the transaction.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        Ok(self.inner.put(key, value)?)
    }
}

/// A read-only view of the store.
pub struct StoreView<'db> {
    db: &'db TransactionDB,
}

impl<'db> StoreView<'db> {
    /// Read a key.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(key)?)
    }

    /// Iterate all keys under `prefix` in the given direction.
    pub fn prefix_iter(&self, prefix: Vec<u8>, direction: Direction) -> PrefixIter<'db> {
        let upper = prefix_successor(&prefix);
        self.bounded_iter(prefix, upper, direction)
    }

    /// Iterate keys under `prefix` that are `<= until`, in reverse order
    /// starting from `until`. This is the payload point-query shape.
    pub fn prefix_iter_back_from(&self, prefix: Vec<u8>, until: &[u8]) -> PrefixIter<'db> {
        // Exclusive upper bound of `until ++ 0x00` keeps `until` itself in
        // range while excluding every longer or greater key.
        let mut upper = until.to_vec();
        upper.push(0x00);
        self.bounded_iter(prefix, Some(upper), Direction::Reverse)
    }

    fn bounded_iter(
        &self,
        prefix: Vec<u8>,
        upper: Option<Vec<u8>>,
        direction: Direction,
    ) -> PrefixIter<'db> {
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_lower_bound(prefix.clone());
        if let Some(upper) = upper {
            read_opts.set_iterate_upper_bound(upper);
        }

        let mode = match direction {
            Direction::Forward => IteratorMode::Start,
            Direction::Reverse => IteratorMode::End,
        };

        PrefixIter {
            inner: self.db.iterator_opt(mode, read_opts),
            prefix,
        }
    }
}

/// Prefix-bounded range iterator.
///
/// The namespace prefix is re-validated on every step: a key that escapes
/// the prefix ends the iteration instead of leaking a neighboring
/// namespace's entries into the result.
pub struct PrefixIter<'db> {
    inner: DBIteratorWithThreadMode<'db, TransactionDB>,
    prefix: Vec<u8>,
}

impl Iterator for PrefixIter<'_> {
    type Item = Result<(Box<[u8]>, Box<[u8]>), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok((key, value)) => {
                if !key.starts_with(&self.prefix) {
                    return None;
                }
                Some(Ok((key, value)))
            }
            Err(err) => Some(Err(err.into())),
        }
    }
}

/// Smallest byte string strictly greater than every string prefixed by
/// `prefix`, or `None` when no such bound exists.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return Some(upper);
        }
        upper.pop();
    }
    None
}

/// A write batch with size accounting.
///
/// Batches bypass transaction size limits; chunking decisions belong to the
/// caller, which can watch `size_bytes`.
#[derive(Default)]
pub struct StoreBatch {
    inner: WriteBatchWithTransaction<true>,
}

impl StoreBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.inner.put(key, value);
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Approximate serialized size of the batch.
    pub fn size_bytes(&self) -> usize {
        self.inner.size_in_bytes()
    }
}
