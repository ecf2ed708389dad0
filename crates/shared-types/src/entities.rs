//! # Core Domain Entities
//!
//! Defines the entities the indexer consumes and persists, grouped the way
//! they arrive: ledger data from the trie-update stream, block metadata and
//! execution artifacts from the chain collaborator.
//!
//! ## Clusters
//!
//! - **Ledger**: `Path`, `PayloadKey`, `Payload`, `TrieUpdate`, `Commitment`
//! - **Chain**: `BlockHeader`, `Collection`, `Guarantee`, `Transaction`
//! - **Execution**: `Event`, `TransactionResult`, `Seal`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// =============================================================================
// CLUSTER A: IDENTITY AND LEDGER PRIMITIVES
// =============================================================================

/// A 32-byte hash.
pub type Hash = [u8; 32];

/// Unique identifier of a chain entity (block, collection, transaction, ...).
pub type Identifier = [u8; 32];

/// A 32-byte key into the sparse Merkle ledger.
pub type Path = [u8; 32];

/// Root hash of the ledger after a block's execution.
pub type Commitment = [u8; 32];

/// Block position counted from the start of the indexed range.
pub type Height = u64;

/// Root commitment of the empty ledger.
pub const ZERO_COMMITMENT: Commitment = [0u8; 32];

/// Compute the canonical identifier of an encodable entity.
///
/// Identity is content-derived: SHA-256 over the entity's deterministic
/// encoding. Two entities with equal content share an identifier.
fn canonical_id<T: Serialize>(entity: &T) -> Identifier {
    let encoded = bincode::serialize(entity).expect("entity encoding cannot fail");
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hasher.finalize().into()
}

/// Semantic key embedded in a ledger payload.
///
/// The triple mirrors the ledger's register addressing: which account owns
/// the register, which controller namespace it sits in, and the register
/// name itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadKey {
    /// Owning account of the register.
    pub owner: Vec<u8>,
    /// Controller namespace within the owner.
    pub controller: Vec<u8>,
    /// Register name.
    pub key: Vec<u8>,
}

/// Value stored at a ledger path, together with its semantic key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Semantic key of the register.
    pub key: PayloadKey,
    /// Opaque register value.
    pub value: Vec<u8>,
}

impl Payload {
    /// The null payload: what a read returns for a path that has never
    /// been written. A first-class value, not an error.
    pub fn null() -> Self {
        Self::default()
    }

    /// Whether this is the null payload.
    pub fn is_null(&self) -> bool {
        self.value.is_empty() && self.key == PayloadKey::default()
    }
}

/// A batch of ledger writes produced by one execution step.
///
/// Applying the update to the trie whose root is `root` yields a new trie;
/// `paths` and `payloads` are parallel vectors of equal length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieUpdate {
    /// Root of the trie this update applies to.
    pub root: Commitment,
    /// Ledger paths written by the update.
    pub paths: Vec<Path>,
    /// Payloads written at the corresponding paths.
    pub payloads: Vec<Payload>,
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// Per-height block metadata as delivered by the chain collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain this block belongs to (e.g. a spork-specific network name).
    pub chain_id: String,
    /// Block height.
    pub height: Height,
    /// Identifier of the parent block.
    pub parent_id: Identifier,
    /// Unix timestamp (milliseconds) of block proposal.
    pub timestamp: u64,
    /// Hash over the block's payload (collections, seals, ...).
    pub payload_hash: Hash,
    /// Aggregated signature data of the parent's voters.
    pub parent_voter_sig_data: Vec<u8>,
    /// Identifier of the proposing node.
    pub proposer_id: Identifier,
    /// Proposer's signature data over the block.
    pub proposer_sig_data: Vec<u8>,
}

impl BlockHeader {
    /// Canonical identifier of the block described by this header.
    pub fn id(&self) -> Identifier {
        canonical_id(self)
    }
}

/// An ordered group of transactions included in a block.
///
/// Stored in light form: the member transactions are indexed separately and
/// referenced by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Identifiers of the member transactions, in execution order.
    pub transaction_ids: Vec<Identifier>,
}

impl Collection {
    /// Canonical identifier of the collection.
    pub fn id(&self) -> Identifier {
        canonical_id(self)
    }
}

/// A collector-cluster attestation that a collection is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantee {
    /// Collection being guaranteed.
    pub collection_id: Identifier,
    /// Compact encoding of the guaranteeing signers.
    pub signer_indices: Vec<u8>,
    /// Aggregated signature over the collection.
    pub signature: Vec<u8>,
}

/// A transaction body as included in a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Script executed by the transaction.
    pub script: Vec<u8>,
    /// Encoded arguments passed to the script.
    pub arguments: Vec<Vec<u8>>,
    /// Block the transaction was signed against.
    pub reference_block_id: Identifier,
    /// Maximum computation budget.
    pub gas_limit: u64,
    /// Account paying for the transaction.
    pub payer: Vec<u8>,
    /// Accounts authorizing the transaction.
    pub authorizers: Vec<Vec<u8>>,
}

impl Transaction {
    /// Canonical identifier of the transaction.
    pub fn id(&self) -> Identifier {
        canonical_id(self)
    }
}

// =============================================================================
// CLUSTER C: EXECUTION ARTIFACTS
// =============================================================================

/// An event emitted during transaction execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Fully qualified event type name.
    pub event_type: String,
    /// Transaction that emitted the event.
    pub transaction_id: Identifier,
    /// Index of that transaction within its block.
    pub transaction_index: u32,
    /// Index of the event within its transaction.
    pub event_index: u32,
    /// Encoded event payload.
    pub payload: Vec<u8>,
}

/// Outcome of executing one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Transaction this result belongs to.
    pub transaction_id: Identifier,
    /// Empty on success, the failure description otherwise.
    pub error_message: String,
}

/// Attestation that a block's execution result is final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seal {
    /// Block whose result is sealed.
    pub block_id: Identifier,
    /// Execution result being sealed.
    pub result_id: Identifier,
    /// State commitment the sealed result ends in.
    pub final_state: Commitment,
}

impl Seal {
    /// Canonical identifier of the seal.
    pub fn id(&self) -> Identifier {
        canonical_id(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
