//! # Write-Ahead Log Source
//!
//! Reads trie updates out of a directory of append-only log segments. The
//! execution layer writes several record kinds into the log; only update
//! records matter here, everything else is skipped in place.
//!
//! Segments are consumed in file-name order, which is write order for the
//! zero-padded names the log uses. Wire shapes use untyped byte vectors,
//! so every root and path is length-checked before it becomes a fixed
//! 32-byte array.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path as FsPath, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{Commitment, Path, Payload, TrieUpdate};
use tracing::debug;

use crate::errors::FeedError;
use crate::framing::{decode_body, read_frame, Frame};
use crate::traits::UpdateFeeder;

/// One record of the write-ahead log, tagged by operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalRecord {
    /// A ledger trie update: the only kind the indexer consumes.
    Update(WalUpdate),
    /// Ledger paths removed by pruning. Not indexed.
    Delete {
        /// Paths removed from the ledger.
        paths: Vec<Vec<u8>>,
    },
    /// A checkpoint marker emitted when the trie was dumped. Not indexed.
    Checkpoint {
        /// Root the checkpoint was taken at.
        root: Vec<u8>,
    },
}

/// Wire shape of an update record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalUpdate {
    /// Root of the trie the update applies to.
    pub root: Vec<u8>,
    /// Written paths, parallel to `payloads`.
    pub paths: Vec<Vec<u8>>,
    /// Written payloads, parallel to `paths`.
    pub payloads: Vec<Payload>,
}

/// Validate a wire update and copy it into its domain shape.
pub(crate) fn into_trie_update(wire: WalUpdate, segment: &str) -> Result<TrieUpdate, FeedError> {
    let root: Commitment = wire
        .root
        .as_slice()
        .try_into()
        .map_err(|_| FeedError::Corrupt {
            context: format!(
                "update root has {} bytes in segment {segment}",
                wire.root.len()
            ),
        })?;

    if wire.paths.len() != wire.payloads.len() {
        return Err(FeedError::Corrupt {
            context: format!(
                "update has {} paths but {} payloads in segment {segment}",
                wire.paths.len(),
                wire.payloads.len()
            ),
        });
    }

    let mut paths = Vec::with_capacity(wire.paths.len());
    for path in &wire.paths {
        let path: Path = path.as_slice().try_into().map_err(|_| FeedError::Corrupt {
            context: format!("update path has {} bytes in segment {segment}", path.len()),
        })?;
        paths.push(path);
    }

    Ok(TrieUpdate {
        root,
        paths,
        payloads: wire.payloads,
    })
}

/// Update source over a directory of log segments.
pub struct WalFeeder {
    segments: VecDeque<PathBuf>,
    current: Option<(String, BufReader<File>)>,
    buf: Vec<u8>,
}

impl WalFeeder {
    /// Open a segment directory. Segments are read in name order.
    pub fn open(dir: impl AsRef<FsPath>) -> Result<Self, FeedError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|err| FeedError::Io {
            segment: dir.display().to_string(),
            source: err,
        })?;

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| FeedError::Io {
                segment: dir.display().to_string(),
                source: err,
            })?;
            if entry.path().is_file() {
                segments.push(entry.path());
            }
        }
        segments.sort();

        debug!(count = segments.len(), dir = %dir.display(), "opened WAL directory");
        Ok(Self {
            segments: segments.into(),
            current: None,
            buf: Vec::new(),
        })
    }

    fn next_update(&mut self) -> Result<TrieUpdate, FeedError> {
        loop {
            let (segment, reader) = match self.current.as_mut() {
                Some(current) => current,
                None => match self.segments.pop_front() {
                    Some(path) => {
                        let name = path.display().to_string();
                        let file = File::open(&path).map_err(|err| FeedError::Io {
                            segment: name.clone(),
                            source: err,
                        })?;
                        self.current = Some((name, BufReader::new(file)));
                        continue;
                    }
                    None => return Err(FeedError::Finished),
                },
            };

            match read_frame(reader, &mut self.buf, segment)? {
                Frame::End => {
                    self.current = None;
                    continue;
                }
                Frame::Record => {}
            }

            let segment = segment.clone();
            match decode_body::<WalRecord>(&self.buf)? {
                WalRecord::Update(wire) => return into_trie_update(wire, &segment),
                WalRecord::Delete { .. } | WalRecord::Checkpoint { .. } => continue,
            }
        }
    }
}

#[async_trait]
impl UpdateFeeder for WalFeeder {
    async fn next(&mut self) -> Result<TrieUpdate, FeedError> {
        self.next_update()
    }
}
