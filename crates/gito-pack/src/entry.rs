//! Packed entry parsing.
//!
//! Each entry starts with a header byte: bit 7 continues the size varint,
//! bits 6-4 are the kind, bits 3-0 the low nibble of the inflated size.
//! Kinds 1-4 are self-contained objects; 6 (ofs-delta) and 7 (ref-delta)
//! carry a base reference and a deflated hunk stream. Kinds 0 and 5 are
//! reserved.

use std::io::Read;

use flate2::bufread::ZlibDecoder;
use gito_hash::ObjectId;
use gito_object::{Object, ObjectType};
use gito_utils::Cursor;

use crate::delta::{self, Delta};
use crate::{varint, PackError};

/// One entry of a pack, before delta resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackEntry {
    /// A self-contained object embedded in the pack.
    Raw(Object),
    /// A delta whose base lies `base_offset` bytes before this entry's
    /// start in the same pack.
    OfsDelta { base_offset: u64, delta: Delta },
    /// A delta whose base is named by hash, possibly outside this pack.
    RefDelta { base: ObjectId, delta: Delta },
}

impl PackEntry {
    pub fn is_delta(&self) -> bool {
        !matches!(self, Self::Raw(_))
    }
}

/// Parse one packed entry off the cursor.
///
/// On success the cursor sits just past the entry's compressed payload, so
/// a sequential caller can parse the next entry directly.
pub fn parse_entry(cur: &mut Cursor<'_>, version: u32) -> Result<PackEntry, PackError> {
    let b0 = cur.read_u8()?;
    let kind = (b0 >> 4) & 0x07;
    let mut size = u64::from(b0 & 0x0f);
    if b0 & 0x80 != 0 {
        let rest = varint::read_size(cur)?;
        if rest > (u64::MAX >> 4) {
            return Err(cur.error("entry size overflows 64 bits").into());
        }
        size |= rest << 4;
    }
    let size = size as usize;

    match kind {
        1 | 2 | 3 | 4 => {
            let obj_type = match kind {
                1 => ObjectType::Commit,
                2 => ObjectType::Tree,
                3 => ObjectType::Blob,
                _ => ObjectType::Tag,
            };
            let payload = inflate(cur, size)?;
            Ok(PackEntry::Raw(Object::parse_payload(obj_type, &payload)?))
        }
        6 => {
            let base_offset = varint::read_base_offset(cur)?;
            let stream = inflate(cur, size)?;
            Ok(PackEntry::OfsDelta {
                base_offset,
                delta: delta::parse_hunks(&stream, version)?,
            })
        }
        7 => {
            let base = ObjectId::from_bytes(cur.take(20)?)?;
            let stream = inflate(cur, size)?;
            Ok(PackEntry::RefDelta {
                base,
                delta: delta::parse_hunks(&stream, version)?,
            })
        }
        other => Err(PackError::UnsupportedEntryKind(other)),
    }
}

/// Inflate the zlib stream at the cursor, requiring the declared size, and
/// advance the cursor past exactly the compressed bytes consumed.
fn inflate(cur: &mut Cursor<'_>, declared: usize) -> Result<Vec<u8>, PackError> {
    let mut decoder = ZlibDecoder::new(cur.rest_slice());
    let mut out = Vec::with_capacity(declared);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| cur.error(format!("zlib: {e}")))?;
    let consumed = decoder.total_in() as usize;
    cur.advance(consumed)?;

    if out.len() != declared {
        return Err(PackError::SizeMismatch {
            declared,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Encode an entry header byte sequence. Test apparatus for building
/// synthetic packs.
pub fn encode_entry_header(kind: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut s = size;

    let mut byte = (kind << 4) | (s & 0x0f) as u8;
    s >>= 4;
    while s > 0 {
        buf.push(byte | 0x80);
        byte = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(byte);
    buf
}
