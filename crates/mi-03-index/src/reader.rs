//! # Index Reader
//!
//! Storage-backed `IndexReader`. All reads run against a read-only view;
//! the reader never mutates state and can be shared freely across API
//! server workers.

use std::sync::Arc;

use mi_01_codec::{Codec, ValueCodec};
use mi_02_storage::{event_type_hash, Library, Store};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Identifier, Path, Payload, Seal,
    Transaction, TransactionResult,
};

use crate::errors::IndexError;
use crate::traits::IndexReader;

/// Storage-backed index reader.
pub struct Reader<C: ValueCodec = Codec> {
    store: Arc<Store>,
    lib: Library<C>,
}

impl<C: ValueCodec + 'static> Reader<C> {
    /// Reader over the given store, decoding values with `lib`'s codec.
    pub fn new(store: Arc<Store>, lib: Library<C>) -> Self {
        Self { store, lib }
    }

    /// Check a height against the indexed `[first, last]` range.
    fn guard(&self, height: Height) -> Result<(), IndexError> {
        let (first, last) = self.store.view(|view| {
            Ok((
                self.lib.retrieve_first(view)?,
                self.lib.retrieve_last(view)?,
            ))
        })?;

        if height < first || height > last {
            return Err(IndexError::OutOfRange {
                height,
                first,
                last,
            });
        }
        Ok(())
    }
}

impl<C: ValueCodec + 'static> IndexReader for Reader<C> {
    fn first(&self) -> Result<Height, IndexError> {
        Ok(self.store.view(|view| self.lib.retrieve_first(view))?)
    }

    fn last(&self) -> Result<Height, IndexError> {
        Ok(self.store.view(|view| self.lib.retrieve_last(view))?)
    }

    fn height_for_block(&self, block_id: &Identifier) -> Result<Height, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_height_for_block(view, block_id))?)
    }

    fn header(&self, height: Height) -> Result<BlockHeader, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_header(view, height))?)
    }

    fn commit(&self, height: Height) -> Result<Commitment, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_commit(view, height))?)
    }

    fn values(&self, height: Height, paths: &[Path]) -> Result<Vec<Payload>, IndexError> {
        self.guard(height)?;

        let payloads = self.store.view(|view| {
            paths
                .iter()
                .map(|path| self.lib.retrieve_payload(view, height, path))
                .collect::<Result<Vec<_>, _>>()
        })?;

        // A path that was never written reads as the null payload.
        Ok(payloads
            .into_iter()
            .map(|payload| payload.unwrap_or_else(Payload::null))
            .collect())
    }

    fn events(&self, height: Height, types: &[String]) -> Result<Vec<Event>, IndexError> {
        self.guard(height)?;

        let hashes: Vec<u64> = types.iter().map(|name| event_type_hash(name)).collect();
        Ok(self
            .store
            .view(|view| self.lib.retrieve_events(view, height, &hashes))?)
    }

    fn collection(&self, collection_id: &Identifier) -> Result<Collection, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_collection(view, collection_id))?)
    }

    fn collections_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_collections_for_height(view, height))?)
    }

    fn guarantee(&self, collection_id: &Identifier) -> Result<Guarantee, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_guarantee(view, collection_id))?)
    }

    fn transaction(&self, transaction_id: &Identifier) -> Result<Transaction, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_transaction(view, transaction_id))?)
    }

    fn transactions_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_transactions_for_height(view, height))?)
    }

    fn height_for_transaction(&self, transaction_id: &Identifier) -> Result<Height, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_height_for_transaction(view, transaction_id))?)
    }

    fn result(&self, transaction_id: &Identifier) -> Result<TransactionResult, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_result(view, transaction_id))?)
    }

    fn seal(&self, seal_id: &Identifier) -> Result<Seal, IndexError> {
        Ok(self.store.view(|view| self.lib.retrieve_seal(view, seal_id))?)
    }

    fn seals_by_height(&self, height: Height) -> Result<Vec<Identifier>, IndexError> {
        Ok(self
            .store
            .view(|view| self.lib.retrieve_seals_for_height(view, height))?)
    }
}
