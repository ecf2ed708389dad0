//! # Record Framing
//!
//! On-disk framing shared by the write-ahead log and the chain record log:
//! `u32` little-endian body length, `u32` little-endian CRC32 of the body,
//! then the bincode-encoded body. The CRC catches torn tails of
//! append-only files without trusting the decoder to fail cleanly.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::FeedError;

/// Records larger than this are rejected as corrupt framing rather than
/// attempted as one giant allocation.
pub const MAX_RECORD_BYTES: u32 = 256 * 1024 * 1024;

/// Write one framed record.
pub fn write_record<T: Serialize>(writer: &mut impl Write, record: &T) -> io::Result<()> {
    let body = bincode::serialize(record)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    let crc = crc32fast::hash(&body);

    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&body)?;
    Ok(())
}

/// Outcome of reading one frame.
pub enum Frame {
    /// A complete, checksummed record body.
    Record,
    /// The reader is at a clean end of the file.
    End,
}

/// Read one framed record body into `buf`, reusing its allocation.
///
/// Returns `Frame::End` at a clean end of file. A torn or corrupt frame is
/// a [`FeedError::Corrupt`]; callers decide whether a torn tail is fatal.
pub fn read_frame(
    reader: &mut impl Read,
    buf: &mut Vec<u8>,
    segment: &str,
) -> Result<Frame, FeedError> {
    let mut header = [0u8; 8];
    match reader.read_exact(&mut header[..1]) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(Frame::End),
        Err(err) => {
            return Err(FeedError::Io {
                segment: segment.to_string(),
                source: err,
            })
        }
    }
    reader
        .read_exact(&mut header[1..])
        .map_err(|err| truncated(segment, err))?;

    let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    if len > MAX_RECORD_BYTES {
        return Err(FeedError::Corrupt {
            context: format!("record length {len} exceeds limit in segment {segment}"),
        });
    }

    buf.clear();
    buf.resize(len as usize, 0);
    reader
        .read_exact(buf)
        .map_err(|err| truncated(segment, err))?;

    if crc32fast::hash(buf) != crc {
        return Err(FeedError::Corrupt {
            context: format!("checksum mismatch in segment {segment}"),
        });
    }
    Ok(Frame::Record)
}

/// Decode a record body read by [`read_frame`].
pub fn decode_body<T: DeserializeOwned>(buf: &[u8]) -> Result<T, FeedError> {
    bincode::deserialize(buf).map_err(FeedError::Decode)
}

fn truncated(segment: &str, err: io::Error) -> FeedError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FeedError::Corrupt {
            context: format!("truncated record at end of segment {segment}"),
        }
    } else {
        FeedError::Io {
            segment: segment.to_string(),
            source: err,
        }
    }
}
