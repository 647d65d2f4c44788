//! Binary encode/decode for the operation log.
//!
//! Every record is one tag byte followed by a fixed-width payload. All
//! integers are little-endian. There is no header, no length prefix and no
//! compression.

use std::io::{ErrorKind, Read, Write};

use super::event::OperationRecord;
use crate::error::{MagicStreamError, Result};

pub const TAG_READ: u8 = 1;
pub const TAG_SEEK: u8 = 2;
pub const TAG_TELL: u8 = 3;
pub const TAG_LENGTH: u8 = 4;
pub const TAG_EOF: u8 = 5;
pub const TAG_FLUSH: u8 = 6;

/// Largest encoded record (a read: tag + three 8-byte fields).
pub const MAX_RECORD_LEN: usize = 1 + 24;

fn payload_len(tag: u8) -> Option<usize> {
    match tag {
        TAG_READ => Some(24),
        TAG_SEEK | TAG_TELL | TAG_LENGTH => Some(8),
        TAG_EOF => Some(1),
        TAG_FLUSH => Some(0),
        _ => None,
    }
}

/// Encode one record into its wire bytes.
pub fn encode(record: &OperationRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_RECORD_LEN);
    match *record {
        OperationRecord::Read {
            offset,
            length,
            checksum,
        } => {
            out.push(TAG_READ);
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&length.to_le_bytes());
            out.extend_from_slice(&checksum.to_le_bytes());
        }
        OperationRecord::Seek { target } => {
            out.push(TAG_SEEK);
            out.extend_from_slice(&target.to_le_bytes());
        }
        OperationRecord::Tell { offset } => {
            out.push(TAG_TELL);
            out.extend_from_slice(&offset.to_le_bytes());
        }
        OperationRecord::Length { length } => {
            out.push(TAG_LENGTH);
            out.extend_from_slice(&length.to_le_bytes());
        }
        OperationRecord::Eof { at_eof } => {
            out.push(TAG_EOF);
            out.push(u8::from(at_eof));
        }
        OperationRecord::Flush => out.push(TAG_FLUSH),
    }
    out
}

/// Write one encoded record to `w`.
pub fn write_record(w: &mut dyn Write, record: &OperationRecord) -> std::io::Result<()> {
    w.write_all(&encode(record))
}

fn le_i64(payload: &[u8], at: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&payload[at..at + 8]);
    i64::from_le_bytes(buf)
}

fn le_u64(payload: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&payload[at..at + 8]);
    u64::from_le_bytes(buf)
}

/// Decode a payload whose length has already been checked against the tag.
/// `offset` is the position of the tag byte, used for error reporting.
fn decode_payload(tag: u8, payload: &[u8], offset: u64) -> Result<OperationRecord> {
    let record = match tag {
        TAG_READ => OperationRecord::Read {
            offset: le_i64(payload, 0),
            length: le_i64(payload, 8),
            checksum: le_u64(payload, 16),
        },
        TAG_SEEK => OperationRecord::Seek {
            target: le_i64(payload, 0),
        },
        TAG_TELL => OperationRecord::Tell {
            offset: le_i64(payload, 0),
        },
        TAG_LENGTH => OperationRecord::Length {
            length: le_i64(payload, 0),
        },
        TAG_EOF => match payload[0] {
            0 => OperationRecord::Eof { at_eof: false },
            1 => OperationRecord::Eof { at_eof: true },
            other => {
                return Err(MagicStreamError::corrupt(
                    offset + 1,
                    format!("invalid eof flag {other:#04x}"),
                ))
            }
        },
        TAG_FLUSH => OperationRecord::Flush,
        other => {
            return Err(MagicStreamError::corrupt(
                offset,
                format!("unknown record tag {other:#04x}"),
            ))
        }
    };
    Ok(record)
}

/// Decode the record at the start of `bytes`, returning it with the number of
/// bytes it occupied.
pub fn decode_prefix(bytes: &[u8]) -> Result<(OperationRecord, usize)> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| MagicStreamError::corrupt(0, "empty record"))?;
    let len = payload_len(tag)
        .ok_or_else(|| MagicStreamError::corrupt(0, format!("unknown record tag {tag:#04x}")))?;
    if rest.len() < len {
        return Err(MagicStreamError::corrupt(
            0,
            format!(
                "truncated {}-byte payload for tag {tag:#04x}: only {} bytes left",
                len,
                rest.len()
            ),
        ));
    }
    let record = decode_payload(tag, &rest[..len], 0)?;
    Ok((record, 1 + len))
}

/// Decode exactly one record. Trailing bytes are rejected.
pub fn decode(bytes: &[u8]) -> Result<OperationRecord> {
    let (record, used) = decode_prefix(bytes)?;
    if used != bytes.len() {
        return Err(MagicStreamError::corrupt(
            used as u64,
            format!("{} trailing bytes after record", bytes.len() - used),
        ));
    }
    Ok(record)
}

/// Read the next record from a log stream.
///
/// `offset` is the stream position of the record, used in error messages.
/// Returns `Ok(None)` on a clean end of stream before a tag byte; running out
/// of bytes inside a payload is a corrupt log.
pub fn read_record(r: &mut dyn Read, offset: u64) -> Result<Option<(OperationRecord, usize)>> {
    let mut tag = [0u8; 1];
    loop {
        match r.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(MagicStreamError::LogRead { offset, source }),
        }
    }
    let tag = tag[0];
    let len = payload_len(tag).ok_or_else(|| {
        MagicStreamError::corrupt(offset, format!("unknown record tag {tag:#04x}"))
    })?;

    let mut payload = [0u8; MAX_RECORD_LEN - 1];
    let payload = &mut payload[..len];
    match r.read_exact(payload) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(MagicStreamError::corrupt(
                offset,
                format!("log ends inside the {len}-byte payload of tag {tag:#04x}"),
            ))
        }
        Err(source) => return Err(MagicStreamError::LogRead { offset, source }),
    }
    let record = decode_payload(tag, payload, offset)?;
    Ok(Some((record, 1 + len)))
}

/// Decode a complete log held in memory.
pub fn decode_all(mut bytes: &[u8]) -> Result<Vec<OperationRecord>> {
    let mut records = Vec::new();
    let mut offset = 0u64;
    while let Some((record, used)) = read_record(&mut bytes, offset)? {
        records.push(record);
        offset += used as u64;
    }
    Ok(records)
}
