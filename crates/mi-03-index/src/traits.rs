//! # Index Port Traits
//!
//! `IndexWriter` is what the mapper drives; `IndexReader` is what the API
//! servers consume. Both are traits so decorators (metrics) and test
//! doubles can stand in for the storage-backed implementations.

use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Identifier, Path, Payload, Seal,
    Transaction, TransactionResult,
};

use crate::errors::IndexError;

/// Write access to the index. The mapper is the sole writer; concurrent
/// writers over overlapping heights are undefined behavior.
pub trait IndexWriter: Send + Sync {
    /// Record the first indexed height. Written once at bootstrap.
    fn first(&self, height: Height) -> Result<(), IndexError>;

    /// Stage the block header for a height.
    fn header(&self, height: Height, header: &BlockHeader) -> Result<(), IndexError>;

    /// Stage the state commitment reached at a height.
    fn commit(&self, height: Height, commit: Commitment) -> Result<(), IndexError>;

    /// Stage the block-id-to-height mapping.
    fn height_for_block(&self, block_id: Identifier, height: Height) -> Result<(), IndexError>;

    /// Write ledger payloads touched at a height. `paths` and `payloads`
    /// are parallel slices; duplicate paths keep the last write.
    fn payloads(
        &self,
        height: Height,
        paths: &[Path],
        payloads: &[Payload],
    ) -> Result<(), IndexError>;

    /// Stage the events emitted at a height.
    fn events(&self, height: Height, events: &[Event]) -> Result<(), IndexError>;

    /// Stage the collections included at a height.
    fn collections(&self, height: Height, collections: &[Collection]) -> Result<(), IndexError>;

    /// Stage the collection guarantees included at a height.
    fn guarantees(&self, guarantees: &[Guarantee]) -> Result<(), IndexError>;

    /// Stage the transactions executed at a height.
    fn transactions(&self, height: Height, transactions: &[Transaction]) -> Result<(), IndexError>;

    /// Stage the transaction results of a height.
    fn results(&self, results: &[TransactionResult]) -> Result<(), IndexError>;

    /// Stage the seals landed at a height.
    fn seals(&self, height: Height, seals: &[Seal]) -> Result<(), IndexError>;

    /// Commit the height: flush payload batches, persist all staged writes
    /// in one transaction, then advance the last-height sentinel. After
    /// this returns, the height is visible to readers in its entirety.
    fn last(&self, height: Height) -> Result<(), IndexError>;
}

/// Read access to the index, over a read-only store view.
pub trait IndexReader: Send + Sync {
    /// Lowest indexed height.
    fn first(&self) -> Result<Height, IndexError>;

    /// Highest indexed height.
    fn last(&self) -> Result<Height, IndexError>;

    /// Height of the block with the given identifier.
    fn height_for_block(&self, block_id: &Identifier) -> Result<Height, IndexError>;

    /// Header of the block at a height.
    fn header(&self, height: Height) -> Result<BlockHeader, IndexError>;

    /// State commitment reached at a height.
    fn commit(&self, height: Height) -> Result<Commitment, IndexError>;

    /// Ledger values at the given paths as of a height. Never-written paths
    /// yield the null payload. Fails with `OutOfRange` outside the indexed
    /// range.
    fn values(&self, height: Height, paths: &[Path]) -> Result<Vec<Payload>, IndexError>;

    /// Events at a height, filtered by type name; no filter returns all.
    /// Fails with `OutOfRange` outside the indexed range.
    fn events(&self, height: Height, types: &[String]) -> Result<Vec<Event>, IndexError>;

    /// Light collection by identifier.
    fn collection(&self, collection_id: &Identifier) -> Result<Collection, IndexError>;

    /// Collections included at a height.
    fn collections_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError>;

    /// Guarantee for a collection.
    fn guarantee(&self, collection_id: &Identifier) -> Result<Guarantee, IndexError>;

    /// Transaction body by identifier.
    fn transaction(&self, transaction_id: &Identifier) -> Result<Transaction, IndexError>;

    /// Transactions executed at a height.
    fn transactions_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError>;

    /// Height a transaction executed at.
    fn height_for_transaction(&self, transaction_id: &Identifier) -> Result<Height, IndexError>;

    /// Result of a transaction.
    fn result(&self, transaction_id: &Identifier) -> Result<TransactionResult, IndexError>;

    /// Seal by identifier.
    fn seal(&self, seal_id: &Identifier) -> Result<Seal, IndexError>;

    /// Seals landed at a height.
    fn seals_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError>;
}
