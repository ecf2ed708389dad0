//! # Value Codec (mi-01)
//!
//! Turns domain values into byte sequences and back. The encoding is
//! deterministic bincode; on top of it sits an optional content-aware
//! compression layer with one pre-trained dictionary per resource kind.
//!
//! ## Guarantees
//!
//! - Encoding is deterministic for fixed input.
//! - Round-trips are exact for every shared-types entity.
//! - Decompression accepts any dictionary that has ever been configured
//!   for a kind, falling back through the historical list.
//!
//! ## Crate Structure
//!
//! - `codec` - the `ValueCodec` trait and the `Codec` implementation
//! - `compression` - zstd dictionary handling
//! - `errors` - `CodecError`

pub mod codec;
pub mod errors;

#[cfg(feature = "compression")]
pub mod compression;

pub use codec::{Codec, ResourceKind, ValueCodec};
pub use errors::CodecError;

#[cfg(feature = "compression")]
pub use compression::Dictionaries;
