//! # Test Utilities
//!
//! A minimal segment writer so tests and tooling can produce well-formed
//! log directories without the real execution layer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path as FsPath, PathBuf};

use serde::Serialize;
use shared_types::{Commitment, Path, Payload};

use crate::framing::write_record;
use crate::wal::{WalRecord, WalUpdate};

/// Canonical zero-padded segment file name.
pub fn segment_name(index: u64) -> String {
    format!("{index:08}")
}

/// Appends framed records to one segment file.
pub struct WalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl WalWriter {
    /// Create segment `index` inside `dir`.
    pub fn create(dir: impl AsRef<FsPath>, index: u64) -> std::io::Result<Self> {
        let path = dir.as_ref().join(segment_name(index));
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append an update record.
    pub fn append_update(
        &mut self,
        root: Commitment,
        writes: Vec<(Path, Payload)>,
    ) -> std::io::Result<()> {
        let (paths, payloads): (Vec<Path>, Vec<Payload>) = writes.into_iter().unzip();
        let record = WalRecord::Update(WalUpdate {
            root: root.to_vec(),
            paths: paths.iter().map(|path| path.to_vec()).collect(),
            payloads,
        });
        self.append_record(&record)
    }

    /// Append any serializable record, including malformed wire shapes for
    /// negative tests.
    pub fn append_record<T: Serialize>(&mut self, record: &T) -> std::io::Result<()> {
        write_record(&mut self.writer, record)
    }

    /// Flush and close the segment.
    pub fn finish(mut self) -> std::io::Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }
}
