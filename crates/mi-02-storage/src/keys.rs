//! # Key Schema
//!
//! Every key in the store starts with a single-byte namespace prefix,
//! followed by a deterministic concatenation of typed segments. The segment
//! set is closed: only the shapes below can appear in a key, so malformed
//! keys are unrepresentable rather than a runtime error.
//!
//! ## Layout Rules
//!
//! - `u64` segments (heights, type hashes) are big-endian so lexicographic
//!   key order equals numeric order.
//! - The payload namespace concatenates `path` then `height`, which makes
//!   all versions of one path a contiguous, height-ascending run; the point
//!   query walks that run backward.

use shared_types::{Commitment, Height, Identifier, Path};
use xxhash_rust::xxh64::xxh64;

/// Namespace prefixes. The numbers are part of the on-disk format.
pub mod prefixes {
    /// `() -> Height` - lowest indexed height, written once at bootstrap.
    pub const FIRST: u8 = 1;
    /// `() -> Height` - highest indexed height, advances monotonically.
    pub const LAST: u8 = 2;
    /// `(block id) -> Height`.
    pub const HEIGHT_FOR_BLOCK: u8 = 3;
    /// `(height) -> Commitment`.
    pub const COMMIT: u8 = 4;
    /// `(height) -> BlockHeader`.
    pub const HEADER: u8 = 5;
    /// `(height, type hash) -> Vec<Event>`.
    pub const EVENTS: u8 = 6;
    /// `(path, height) -> Payload`.
    pub const PAYLOAD: u8 = 7;
    /// `(transaction id) -> Height`.
    pub const HEIGHT_FOR_TRANSACTION: u8 = 8;
    /// `(transaction id) -> Transaction`.
    pub const TRANSACTION: u8 = 9;
    /// `(collection id) -> Collection`.
    pub const COLLECTION: u8 = 10;
    /// `(collection id) -> Guarantee`.
    pub const GUARANTEE: u8 = 11;
    /// `(seal id) -> Seal`.
    pub const SEAL: u8 = 12;
    /// `(transaction id) -> TransactionResult`.
    pub const RESULT: u8 = 13;
    /// `(height) -> Vec<Identifier>` of transactions.
    pub const TRANSACTIONS_FOR_HEIGHT: u8 = 14;
    /// `(collection id) -> Vec<Identifier>` of transactions.
    pub const TRANSACTIONS_FOR_COLLECTION: u8 = 15;
    /// `(height) -> Vec<Identifier>` of collections.
    pub const COLLECTIONS_FOR_HEIGHT: u8 = 16;
    /// `(height) -> Vec<Identifier>` of seals.
    pub const SEALS_FOR_HEIGHT: u8 = 17;
}

/// A typed key segment.
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    /// Big-endian 64-bit height.
    Height(Height),
    /// 32-byte entity identifier.
    Id(&'a Identifier),
    /// 32-byte ledger path.
    Path(&'a Path),
    /// 32-byte state commitment.
    Commitment(&'a Commitment),
    /// Big-endian 64-bit event-type hash.
    TypeHash(u64),
}

impl Segment<'_> {
    fn len(&self) -> usize {
        match self {
            Segment::Height(_) | Segment::TypeHash(_) => 8,
            Segment::Id(_) | Segment::Path(_) | Segment::Commitment(_) => 32,
        }
    }

    fn write_to(&self, key: &mut Vec<u8>) {
        match self {
            Segment::Height(height) => key.extend_from_slice(&height.to_be_bytes()),
            Segment::TypeHash(hash) => key.extend_from_slice(&hash.to_be_bytes()),
            Segment::Id(id) => key.extend_from_slice(*id),
            Segment::Path(path) => key.extend_from_slice(*path),
            Segment::Commitment(commit) => key.extend_from_slice(*commit),
        }
    }
}

/// Encode a key from a namespace prefix and typed segments.
pub fn encode_key(prefix: u8, segments: &[Segment]) -> Vec<u8> {
    let len = 1 + segments.iter().map(Segment::len).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.push(prefix);
    for segment in segments {
        segment.write_to(&mut key);
    }
    key
}

/// 64-bit hash of an event-type name, as used in the events namespace.
pub fn event_type_hash(event_type: &str) -> u64 {
    xxh64(event_type.as_bytes(), 0)
}
