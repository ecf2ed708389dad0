//! # Chain Port
//!
//! The external collaborator that advances block by block and exposes
//! per-height metadata. The mapper only ever asks for one height at a
//! time and never reorders what it is given.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{
    BlockHeader, Collection, Commitment, Event, Guarantee, Height, Seal, Transaction,
    TransactionResult,
};
use thiserror::Error;

/// Errors surfaced by the chain collaborator.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The requested height is not available yet; retry later.
    #[error("height not available yet")]
    Unavailable,

    /// The chain source has delivered everything it ever will.
    #[error("chain source finished")]
    Finished,

    /// Cooperative shutdown was requested.
    #[error("chain source cancelled")]
    Cancelled,

    /// The chain source failed internally.
    #[error("chain source failure: {0}")]
    Internal(String),
}

/// Everything the chain knows about one height, bundled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Height this record describes.
    pub height: Height,
    /// Block header at the height.
    pub header: BlockHeader,
    /// State commitment the mapper must reach for this height.
    pub commit: Commitment,
    /// Collections included in the block.
    pub collections: Vec<Collection>,
    /// Guarantees over those collections.
    pub guarantees: Vec<Guarantee>,
    /// Transactions executed in the block, in execution order.
    pub transactions: Vec<Transaction>,
    /// Results of those transactions.
    pub results: Vec<TransactionResult>,
    /// Events emitted during execution, in emission order.
    pub events: Vec<Event>,
    /// Seals landed in the block.
    pub seals: Vec<Seal>,
}

/// Per-height access to chain data.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Root height of the indexed range (spork start).
    async fn root(&self) -> Result<Height, ChainError>;

    /// Current finalized head height, for readiness tracking.
    async fn head(&self) -> Result<Height, ChainError>;

    /// Header of the block at a height.
    async fn header(&self, height: Height) -> Result<BlockHeader, ChainError>;

    /// Target state commitment for a height.
    async fn commit(&self, height: Height) -> Result<Commitment, ChainError>;

    /// Collections included at a height.
    async fn collections(&self, height: Height) -> Result<Vec<Collection>, ChainError>;

    /// Guarantees included at a height.
    async fn guarantees(&self, height: Height) -> Result<Vec<Guarantee>, ChainError>;

    /// Transactions executed at a height.
    async fn transactions(&self, height: Height) -> Result<Vec<Transaction>, ChainError>;

    /// Results of the transactions at a height.
    async fn results(&self, height: Height) -> Result<Vec<TransactionResult>, ChainError>;

    /// Events emitted at a height.
    async fn events(&self, height: Height) -> Result<Vec<Event>, ChainError>;

    /// Seals landed at a height.
    async fn seals(&self, height: Height) -> Result<Vec<Seal>, ChainError>;

    /// Assemble the full record for a height. The default implementation
    /// fans out to the individual accessors.
    async fn record(&self, height: Height) -> Result<BlockRecord, ChainError> {
        Ok(BlockRecord {
            height,
            header: self.header(height).await?,
            commit: self.commit(height).await?,
            collections: self.collections(height).await?,
            guarantees: self.guarantees(height).await?,
            transactions: self.transactions(height).await?,
            results: self.results(height).await?,
            events: self.events(height).await?,
            seals: self.seals(height).await?,
        })
    }
}
