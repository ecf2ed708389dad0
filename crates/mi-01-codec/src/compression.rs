//! # Dictionary Compression
//!
//! Zstd compression of encoded values, with one pre-trained dictionary per
//! resource kind. Dictionaries are data shipped alongside the binary; they
//! are trained offline on representative payloads, events, and transactions.
//!
//! Decoding must accept values written under any dictionary that has ever
//! shipped, so each kind keeps its full historical list: decompression tries
//! the current dictionary first, then older ones, then no dictionary at all.

use std::io::{Read, Write};
use std::path::Path as FsPath;

use tracing::info;

use crate::codec::ResourceKind;
use crate::errors::CodecError;

/// Zstd compression level for index values. Speed over ratio: values are
/// written once per height but read on every query.
const COMPRESSION_LEVEL: i32 = 3;

/// Per-kind dictionary sets, newest first.
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    payloads: Vec<Vec<u8>>,
    events: Vec<Vec<u8>>,
    transactions: Vec<Vec<u8>>,
}

impl Dictionaries {
    /// An empty dictionary set; compression still runs dictionary-less.
    pub fn none() -> Self {
        Self::default()
    }

    /// Register a dictionary for a kind, making it the current one.
    ///
    /// Previously registered dictionaries remain available for decoding.
    pub fn register(&mut self, kind: ResourceKind, dictionary: Vec<u8>) {
        if let Some(set) = self.set_mut(kind) {
            set.insert(0, dictionary);
        }
    }

    /// Load a dictionary from a file and register it for a kind.
    pub fn register_file(
        &mut self,
        kind: ResourceKind,
        path: impl AsRef<FsPath>,
    ) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        let dictionary = std::fs::read(path)?;
        info!(
            ?kind,
            bytes = dictionary.len(),
            file = %path.display(),
            "registered compression dictionary"
        );
        self.register(kind, dictionary);
        Ok(())
    }

    fn set(&self, kind: ResourceKind) -> &[Vec<u8>] {
        match kind {
            ResourceKind::Payload => &self.payloads,
            ResourceKind::Event => &self.events,
            ResourceKind::Transaction => &self.transactions,
            ResourceKind::Other => &[],
        }
    }

    fn set_mut(&mut self, kind: ResourceKind) -> Option<&mut Vec<Vec<u8>>> {
        match kind {
            ResourceKind::Payload => Some(&mut self.payloads),
            ResourceKind::Event => Some(&mut self.events),
            ResourceKind::Transaction => Some(&mut self.transactions),
            ResourceKind::Other => None,
        }
    }

    /// Compress encoded bytes using the current dictionary for `kind`.
    pub fn compress(&self, kind: ResourceKind, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        match self.set(kind).first() {
            Some(dictionary) => {
                let prepared = zstd::dict::EncoderDictionary::copy(dictionary, COMPRESSION_LEVEL);
                let mut output = Vec::new();
                let mut encoder =
                    zstd::stream::Encoder::with_prepared_dictionary(&mut output, &prepared)
                        .map_err(CodecError::Compress)?;
                encoder.write_all(data).map_err(CodecError::Compress)?;
                encoder.finish().map_err(CodecError::Compress)?;
                Ok(output)
            }
            None => zstd::encode_all(data, COMPRESSION_LEVEL).map_err(CodecError::Compress),
        }
    }

    /// Decompress bytes written under any dictionary ever configured for
    /// `kind`, newest first, finishing with a dictionary-less attempt.
    pub fn decompress(&self, kind: ResourceKind, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut last_err = None;
        let mut attempts = 0;

        for dictionary in self.set(kind) {
            attempts += 1;
            match decompress_with(data, Some(dictionary)) {
                Ok(output) => return Ok(output),
                Err(err) => last_err = Some(err),
            }
        }

        attempts += 1;
        match decompress_with(data, None) {
            Ok(output) => Ok(output),
            Err(err) => Err(CodecError::Decompress {
                attempts,
                last: last_err.unwrap_or(err),
            }),
        }
    }
}

fn decompress_with(data: &[u8], dictionary: Option<&[u8]>) -> Result<Vec<u8>, std::io::Error> {
    let mut output = Vec::new();
    match dictionary {
        Some(dict) => {
            let prepared = zstd::dict::DecoderDictionary::copy(dict);
            let mut decoder = zstd::stream::Decoder::with_prepared_dictionary(data, &prepared)?;
            decoder.read_to_end(&mut output)?;
        }
        None => {
            let mut decoder = zstd::stream::Decoder::new(data)?;
            decoder.read_to_end(&mut output)?;
        }
    }
    Ok(output)
}
