//! # Update Feeder (mi-04)
//!
//! Produces the lazy, in-order stream of trie updates the mapper consumes.
//! Two sources share one contract:
//!
//! - **WAL source**: reads a directory of append-only log segments,
//!   decodes each record, and skips every record kind other than an
//!   update. End of the last segment is a clean end of stream.
//! - **Live source**: receives the same records over a subscription
//!   channel and blocks awaiting the next one.
//!
//! Both validate that the prior root and every path are exactly 32 bytes
//! and hand out owned data, never views into internal read buffers.

pub mod errors;
pub mod framing;
pub mod live;
pub mod test_utils;
pub mod traits;
pub mod wal;

pub use errors::FeedError;
pub use live::LiveFeeder;
pub use traits::UpdateFeeder;
pub use wal::WalFeeder;
