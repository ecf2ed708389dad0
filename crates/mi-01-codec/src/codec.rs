//! # Codec
//!
//! The `ValueCodec` trait is the seam between the storage library and the
//! byte level: callers hand it a value and a resource kind, and get back the
//! bytes that go under a storage key.
//!
//! `Codec` is the production implementation: deterministic bincode encoding
//! wrapped in per-kind dictionary compression. With the `compression`
//! feature disabled it degrades to plain bincode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::CodecError;

#[cfg(feature = "compression")]
use crate::compression::Dictionaries;

/// Resource kinds the codec distinguishes for compression selection.
///
/// The kind is implied by the storage namespace a value is written under,
/// so decoding always knows which dictionary set to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Ledger register payloads.
    Payload,
    /// Execution events.
    Event,
    /// Transaction bodies.
    Transaction,
    /// Everything else; never dictionary-compressed.
    Other,
}

/// Deterministic encode/decode of domain values.
pub trait ValueCodec: Send + Sync {
    /// Encode a value for storage under the given resource kind.
    fn encode<T: Serialize>(&self, kind: ResourceKind, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode a value previously written under the given resource kind.
    fn decode<T: DeserializeOwned>(&self, kind: ResourceKind, data: &[u8])
        -> Result<T, CodecError>;
}

/// Production codec: bincode + per-kind zstd dictionaries.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    #[cfg(feature = "compression")]
    dictionaries: Dictionaries,
}

impl Codec {
    /// Codec without compression dictionaries; values are still compressed
    /// dictionary-less when the feature is enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with a pre-loaded dictionary set.
    #[cfg(feature = "compression")]
    pub fn with_dictionaries(dictionaries: Dictionaries) -> Self {
        Self { dictionaries }
    }
}

impl ValueCodec for Codec {
    #[allow(unused_variables)]
    fn encode<T: Serialize>(&self, kind: ResourceKind, value: &T) -> Result<Vec<u8>, CodecError> {
        let encoded = bincode::serialize(value).map_err(CodecError::Encode)?;

        #[cfg(feature = "compression")]
        {
            self.dictionaries.compress(kind, &encoded)
        }
        #[cfg(not(feature = "compression"))]
        {
            Ok(encoded)
        }
    }

    #[allow(unused_variables)]
    fn decode<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        data: &[u8],
    ) -> Result<T, CodecError> {
        #[cfg(feature = "compression")]
        let encoded = self.dictionaries.decompress(kind, data)?;
        #[cfg(not(feature = "compression"))]
        let encoded = data.to_vec();

        bincode::deserialize(&encoded).map_err(CodecError::Decode)
    }
}
