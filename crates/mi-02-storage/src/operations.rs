//! # Typed Operations
//!
//! The `Library` turns domain values into keyed store operations. Writes
//! come back as composable `Operation` closures; reads run directly against
//! a view. No caller above this layer ever sees a raw key.
//!
//! Sentinels (`First`, `Last`), commitments, and height pointers are stored
//! as fixed-width raw bytes; every other value goes through the codec under
//! the resource kind its namespace implies.

use std::sync::Arc;

use mi_01_codec::{Codec, ResourceKind, ValueCodec};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Identifier, Path, Payload, Seal,
    Transaction, TransactionResult,
};

use crate::combinators::Operation;
use crate::errors::StorageError;
use crate::keys::{encode_key, prefixes, Segment};
use crate::store::{Direction, StoreBatch, StoreView};

/// Typed operations over the store.
pub struct Library<C: ValueCodec = Codec> {
    codec: Arc<C>,
}

impl<C: ValueCodec> Clone for Library<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: ValueCodec + 'static> Library<C> {
    /// Library using the given codec for value bytes.
    pub fn new(codec: C) -> Self {
        Self {
            codec: Arc::new(codec),
        }
    }

    // =========================================================================
    // SENTINELS
    // =========================================================================

    /// Write the first indexed height. Written once at bootstrap.
    pub fn save_first(&self, height: Height) -> Operation<'static> {
        Box::new(move |txn| {
            txn.put(
                &encode_key(prefixes::FIRST, &[]),
                &height.to_be_bytes(),
            )
        })
    }

    /// Write the last indexed height. The caller guarantees monotonicity.
    pub fn save_last(&self, height: Height) -> Operation<'static> {
        Box::new(move |txn| {
            txn.put(&encode_key(prefixes::LAST, &[]), &height.to_be_bytes())
        })
    }

    /// Succeeds only when the first-height sentinel already exists. Used in
    /// bootstrap fallbacks to make initialization idempotent.
    pub fn require_first(&self) -> Operation<'static> {
        Box::new(move |txn| {
            txn.get(&encode_key(prefixes::FIRST, &[]))?
                .map(|_| ())
                .ok_or(StorageError::NotFound)
        })
    }

    /// Lowest indexed height.
    pub fn retrieve_first(&self, view: &StoreView<'_>) -> Result<Height, StorageError> {
        retrieve_height_value(view, &encode_key(prefixes::FIRST, &[]))
    }

    /// Highest indexed height.
    pub fn retrieve_last(&self, view: &StoreView<'_>) -> Result<Height, StorageError> {
        retrieve_height_value(view, &encode_key(prefixes::LAST, &[]))
    }

    // =========================================================================
    // BLOCK METADATA
    // =========================================================================

    /// Write the state commitment reached at a height.
    pub fn save_commit(&self, height: Height, commit: Commitment) -> Operation<'static> {
        Box::new(move |txn| {
            txn.put(
                &encode_key(prefixes::COMMIT, &[Segment::Height(height)]),
                &commit,
            )
        })
    }

    /// State commitment reached at a height.
    pub fn retrieve_commit(
        &self,
        view: &StoreView<'_>,
        height: Height,
    ) -> Result<Commitment, StorageError> {
        let key = encode_key(prefixes::COMMIT, &[Segment::Height(height)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        value
            .as_slice()
            .try_into()
            .map_err(|_| StorageError::Malformed {
                context: format!("commitment at height {height} has {} bytes", value.len()),
            })
    }

    /// Write the header of the block at a height.
    pub fn save_header(&self, height: Height, header: BlockHeader) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &header)?;
            txn.put(
                &encode_key(prefixes::HEADER, &[Segment::Height(height)]),
                &value,
            )
        })
    }

    /// Header of the block at a height.
    pub fn retrieve_header(
        &self,
        view: &StoreView<'_>,
        height: Height,
    ) -> Result<BlockHeader, StorageError> {
        let key = encode_key(prefixes::HEADER, &[Segment::Height(height)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }

    /// Map a block identifier to its height.
    pub fn save_height_for_block(&self, block_id: Identifier, height: Height) -> Operation<'static> {
        Box::new(move |txn| {
            txn.put(
                &encode_key(prefixes::HEIGHT_FOR_BLOCK, &[Segment::Id(&block_id)]),
                &height.to_be_bytes(),
            )
        })
    }

    /// Height of the block with the given identifier.
    pub fn retrieve_height_for_block(
        &self,
        view: &StoreView<'_>,
        block_id: &Identifier,
    ) -> Result<Height, StorageError> {
        retrieve_height_value(
            view,
            &encode_key(prefixes::HEIGHT_FOR_BLOCK, &[Segment::Id(block_id)]),
        )
    }

    // =========================================================================
    // LEDGER PAYLOADS
    // =========================================================================

    /// Write one payload version at `(path, height)`.
    pub fn save_payload(&self, height: Height, path: Path, payload: Payload) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Payload, &payload)?;
            txn.put(
                &encode_key(
                    prefixes::PAYLOAD,
                    &[Segment::Path(&path), Segment::Height(height)],
                ),
                &value,
            )
        })
    }

    /// Encode one payload version as a raw `(key, value)` batch entry.
    ///
    /// Bulk payload writes go through write batches rather than operations;
    /// this is the encode half, kept separate so callers can parallelize it.
    pub fn payload_entry(
        &self,
        height: Height,
        path: &Path,
        payload: &Payload,
    ) -> Result<(Vec<u8>, Vec<u8>), StorageError> {
        let key = encode_key(
            prefixes::PAYLOAD,
            &[Segment::Path(path), Segment::Height(height)],
        );
        let value = self.codec.encode(ResourceKind::Payload, payload)?;
        Ok((key, value))
    }

    /// Queue one payload version into a write batch.
    pub fn batch_payload(
        &self,
        batch: &mut StoreBatch,
        height: Height,
        path: &Path,
        payload: &Payload,
    ) -> Result<(), StorageError> {
        let (key, value) = self.payload_entry(height, path, payload)?;
        batch.put(&key, &value);
        Ok(())
    }

    /// Payload written at the greatest height `<= height` for `path`, or
    /// `None` when the path has never been written up to that height.
    pub fn retrieve_payload(
        &self,
        view: &StoreView<'_>,
        height: Height,
        path: &Path,
    ) -> Result<Option<Payload>, StorageError> {
        let prefix = encode_key(prefixes::PAYLOAD, &[Segment::Path(path)]);
        let until = encode_key(
            prefixes::PAYLOAD,
            &[Segment::Path(path), Segment::Height(height)],
        );

        match view.prefix_iter_back_from(prefix, &until).next() {
            Some(Ok((_, value))) => Ok(Some(self.codec.decode(ResourceKind::Payload, &value)?)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Write one per-type event bucket at a height.
    pub fn save_events(
        &self,
        height: Height,
        type_hash: u64,
        events: Vec<Event>,
    ) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Event, &events)?;
            txn.put(
                &encode_key(
                    prefixes::EVENTS,
                    &[Segment::Height(height), Segment::TypeHash(type_hash)],
                ),
                &value,
            )
        })
    }

    /// Events at a height, filtered by type hash.
    ///
    /// An empty filter returns every bucket. Bucket order follows type-hash
    /// order; order inside a bucket is the write order.
    pub fn retrieve_events(
        &self,
        view: &StoreView<'_>,
        height: Height,
        type_hashes: &[u64],
    ) -> Result<Vec<Event>, StorageError> {
        let prefix = encode_key(prefixes::EVENTS, &[Segment::Height(height)]);
        let prefix_len = prefix.len();

        let mut events = Vec::new();
        for item in view.prefix_iter(prefix, Direction::Forward) {
            let (key, value) = item?;

            let hash_bytes: [u8; 8] = key
                .get(prefix_len..prefix_len + 8)
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or_else(|| StorageError::Malformed {
                    context: format!("event bucket key of {} bytes at height {height}", key.len()),
                })?;
            let bucket_hash = u64::from_be_bytes(hash_bytes);

            if !type_hashes.is_empty() && !type_hashes.contains(&bucket_hash) {
                continue;
            }

            let bucket: Vec<Event> = self.codec.decode(ResourceKind::Event, &value)?;
            events.extend(bucket);
        }
        Ok(events)
    }

    // =========================================================================
    // TRANSACTIONS AND COLLECTIONS
    // =========================================================================

    /// Write a transaction body.
    pub fn save_transaction(&self, transaction: Transaction) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        let id = transaction.id();
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Transaction, &transaction)?;
            txn.put(&encode_key(prefixes::TRANSACTION, &[Segment::Id(&id)]), &value)
        })
    }

    /// Transaction body by identifier.
    pub fn retrieve_transaction(
        &self,
        view: &StoreView<'_>,
        transaction_id: &Identifier,
    ) -> Result<Transaction, StorageError> {
        let key = encode_key(prefixes::TRANSACTION, &[Segment::Id(transaction_id)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Transaction, &value)?)
    }

    /// Map a transaction identifier to the height it executed at.
    pub fn save_height_for_transaction(
        &self,
        transaction_id: Identifier,
        height: Height,
    ) -> Operation<'static> {
        Box::new(move |txn| {
            txn.put(
                &encode_key(
                    prefixes::HEIGHT_FOR_TRANSACTION,
                    &[Segment::Id(&transaction_id)],
                ),
                &height.to_be_bytes(),
            )
        })
    }

    /// Height the given transaction executed at.
    pub fn retrieve_height_for_transaction(
        &self,
        view: &StoreView<'_>,
        transaction_id: &Identifier,
    ) -> Result<Height, StorageError> {
        retrieve_height_value(
            view,
            &encode_key(
                prefixes::HEIGHT_FOR_TRANSACTION,
                &[Segment::Id(transaction_id)],
            ),
        )
    }

    /// Write a transaction result.
    pub fn save_result(&self, result: TransactionResult) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &result)?;
            txn.put(
                &encode_key(prefixes::RESULT, &[Segment::Id(&result.transaction_id)]),
                &value,
            )
        })
    }

    /// Result of the given transaction.
    pub fn retrieve_result(
        &self,
        view: &StoreView<'_>,
        transaction_id: &Identifier,
    ) -> Result<TransactionResult, StorageError> {
        let key = encode_key(prefixes::RESULT, &[Segment::Id(transaction_id)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }

    /// Write a light collection.
    pub fn save_collection(&self, collection: Collection) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        let id = collection.id();
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &collection)?;
            txn.put(&encode_key(prefixes::COLLECTION, &[Segment::Id(&id)]), &value)
        })
    }

    /// Light collection by identifier.
    pub fn retrieve_collection(
        &self,
        view: &StoreView<'_>,
        collection_id: &Identifier,
    ) -> Result<Collection, StorageError> {
        let key = encode_key(prefixes::COLLECTION, &[Segment::Id(collection_id)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }

    /// Write a collection guarantee.
    pub fn save_guarantee(&self, guarantee: Guarantee) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &guarantee)?;
            txn.put(
                &encode_key(prefixes::GUARANTEE, &[Segment::Id(&guarantee.collection_id)]),
                &value,
            )
        })
    }

    /// Guarantee for the given collection.
    pub fn retrieve_guarantee(
        &self,
        view: &StoreView<'_>,
        collection_id: &Identifier,
    ) -> Result<Guarantee, StorageError> {
        let key = encode_key(prefixes::GUARANTEE, &[Segment::Id(collection_id)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }

    // =========================================================================
    // SEALS
    // =========================================================================

    /// Write a seal.
    pub fn save_seal(&self, seal: Seal) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        let id = seal.id();
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &seal)?;
            txn.put(&encode_key(prefixes::SEAL, &[Segment::Id(&id)]), &value)
        })
    }

    /// Seal by identifier.
    pub fn retrieve_seal(
        &self,
        view: &StoreView<'_>,
        seal_id: &Identifier,
    ) -> Result<Seal, StorageError> {
        let key = encode_key(prefixes::SEAL, &[Segment::Id(seal_id)]);
        let value = view.get(&key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }

    // =========================================================================
    // PER-HEIGHT MEMBERSHIP LISTS
    // =========================================================================

    /// Write the transaction list of a height.
    pub fn save_transactions_for_height(
        &self,
        height: Height,
        transaction_ids: Vec<Identifier>,
    ) -> Operation<'static> {
        self.save_id_list(
            encode_key(prefixes::TRANSACTIONS_FOR_HEIGHT, &[Segment::Height(height)]),
            transaction_ids,
        )
    }

    /// Transactions executed at a height.
    pub fn retrieve_transactions_for_height(
        &self,
        view: &StoreView<'_>,
        height: Height,
    ) -> Result<Vec<Identifier>, StorageError> {
        self.retrieve_id_list(
            view,
            &encode_key(prefixes::TRANSACTIONS_FOR_HEIGHT, &[Segment::Height(height)]),
        )
    }

    /// Write the transaction list of a collection.
    pub fn save_transactions_for_collection(
        &self,
        collection_id: Identifier,
        transaction_ids: Vec<Identifier>,
    ) -> Operation<'static> {
        self.save_id_list(
            encode_key(
                prefixes::TRANSACTIONS_FOR_COLLECTION,
                &[Segment::Id(&collection_id)],
            ),
            transaction_ids,
        )
    }

    /// Transactions contained in a collection.
    pub fn retrieve_transactions_for_collection(
        &self,
        view: &StoreView<'_>,
        collection_id: &Identifier,
    ) -> Result<Vec<Identifier>, StorageError> {
        self.retrieve_id_list(
            view,
            &encode_key(
                prefixes::TRANSACTIONS_FOR_COLLECTION,
                &[Segment::Id(collection_id)],
            ),
        )
    }

    /// Write the collection list of a height.
    pub fn save_collections_for_height(
        &self,
        height: Height,
        collection_ids: Vec<Identifier>,
    ) -> Operation<'static> {
        self.save_id_list(
            encode_key(prefixes::COLLECTIONS_FOR_HEIGHT, &[Segment::Height(height)]),
            collection_ids,
        )
    }

    /// Collections included at a height.
    pub fn retrieve_collections_for_height(
        &self,
        view: &StoreView<'_>,
        height: Height,
    ) -> Result<Vec<Identifier>, StorageError> {
        self.retrieve_id_list(
            view,
            &encode_key(prefixes::COLLECTIONS_FOR_HEIGHT, &[Segment::Height(height)]),
        )
    }

    /// Write the seal list of a height.
    pub fn save_seals_for_height(
        &self,
        height: Height,
        seal_ids: Vec<Identifier>,
    ) -> Operation<'static> {
        self.save_id_list(
            encode_key(prefixes::SEALS_FOR_HEIGHT, &[Segment::Height(height)]),
            seal_ids,
        )
    }

    /// Seals landed at a height.
    pub fn retrieve_seals_for_height(
        &self,
        view: &StoreView<'_>,
        height: Height,
    ) -> Result<Vec<Identifier>, StorageError> {
        self.retrieve_id_list(
            view,
            &encode_key(prefixes::SEALS_FOR_HEIGHT, &[Segment::Height(height)]),
        )
    }

    fn save_id_list(&self, key: Vec<u8>, ids: Vec<Identifier>) -> Operation<'static> {
        let codec = Arc::clone(&self.codec);
        Box::new(move |txn| {
            let value = codec.encode(ResourceKind::Other, &ids)?;
            txn.put(&key, &value)
        })
    }

    fn retrieve_id_list(
        &self,
        view: &StoreView<'_>,
        key: &[u8],
    ) -> Result<Vec<Identifier>, StorageError> {
        let value = view.get(key)?.ok_or(StorageError::NotFound)?;
        Ok(self.codec.decode(ResourceKind::Other, &value)?)
    }
}

fn retrieve_height_value(view: &StoreView<'_>, key: &[u8]) -> Result<Height, StorageError> {
    let value = view.get(key)?.ok_or(StorageError::NotFound)?;
    let bytes: [u8; 8] = value
        .as_slice()
        .try_into()
        .map_err(|_| StorageError::Malformed {
            context: format!("height value has {} bytes", value.len()),
        })?;
    Ok(Height::from_be_bytes(bytes))
}
