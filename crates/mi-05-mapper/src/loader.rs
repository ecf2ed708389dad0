//! # Checkpoint Loader
//!
//! Reads and writes root checkpoints: a serialized dump of the ledger
//! trie's leaves used to seed the forest at bootstrap. The root is never
//! trusted from the file; it is recomputed by rebuilding the trie.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use shared_types::{Commitment, Path, Payload, ZERO_COMMITMENT};
use tracing::info;

use mi_04_feeder::framing::{decode_body, read_frame, write_record, Frame};

use crate::errors::MapperError;
use crate::trie::TrieStore;

/// On-disk shape of a trie checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointDump {
    leaves: Vec<(Path, Payload)>,
}

/// Load a checkpoint file into a fresh arena, returning the arena and the
/// recomputed root commitment.
pub fn load_checkpoint(path: impl AsRef<FsPath>) -> Result<(TrieStore, Commitment), MapperError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| MapperError::Checkpoint {
        context: format!("cannot open {}: {err}", path.display()),
    })?;
    let mut reader = BufReader::new(file);

    let mut buf = Vec::new();
    let name = path.display().to_string();
    match read_frame(&mut reader, &mut buf, &name).map_err(|err| MapperError::Checkpoint {
        context: err.to_string(),
    })? {
        Frame::Record => {}
        Frame::End => {
            return Err(MapperError::Checkpoint {
                context: format!("{name} holds no checkpoint record"),
            })
        }
    }

    let dump: CheckpointDump = decode_body(&buf).map_err(|err| MapperError::Checkpoint {
        context: err.to_string(),
    })?;

    let mut store = TrieStore::new();
    let mut root = ZERO_COMMITMENT;
    for (path, payload) in &dump.leaves {
        root = store.apply(root, std::slice::from_ref(path), std::slice::from_ref(payload));
    }

    info!(
        leaves = dump.leaves.len(),
        root = %hex_prefix(&root),
        "loaded root checkpoint"
    );
    Ok((store, root))
}

/// Write a checkpoint file from a leaf list. Intended for tooling and
/// fixtures; the indexer itself only reads checkpoints.
pub fn dump_checkpoint(
    path: impl AsRef<FsPath>,
    leaves: Vec<(Path, Payload)>,
) -> Result<(), MapperError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| MapperError::Checkpoint {
        context: format!("cannot create {}: {err}", path.display()),
    })?;
    let mut writer = BufWriter::new(file);

    write_record(&mut writer, &CheckpointDump { leaves }).map_err(|err| {
        MapperError::Checkpoint {
            context: format!("cannot write {}: {err}", path.display()),
        }
    })?;
    Ok(())
}

fn hex_prefix(commit: &Commitment) -> String {
    hex::encode(&commit[..4])
}
