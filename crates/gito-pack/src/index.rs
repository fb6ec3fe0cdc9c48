//! Pack index (v2) reading.
//!
//! The index maps object hashes to byte offsets in the companion pack.
//! Layout:
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 × 4-byte big-endian cumulative counts
//! Names:   N × 20-byte sorted hashes
//! CRC32:   N × 4-byte CRC32 values
//! Offsets: N × 4-byte offsets (high bit set → index into 64-bit table)
//! 64-bit:  M × 8-byte offsets (for packs > 2GB)
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! The whole file is parsed once into two maps: hash → offset, and
//! hash → byte length of the entry in the pack. Lengths come from sorting
//! entries by offset and differencing neighbours; the entry with the
//! largest offset has no successor and gets `None` (it runs to the pack
//! trailer).

use std::collections::HashMap;

use gito_hash::{FanoutTable, ObjectId};
use gito_utils::Cursor;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

/// A fully parsed pack index.
#[derive(Debug, Clone)]
pub struct PackIndex {
    offsets: HashMap<ObjectId, u64>,
    lengths: HashMap<ObjectId, Option<u64>>,
    crcs: HashMap<ObjectId, u32>,
    pack_checksum: ObjectId,
    count: u32,
}

impl PackIndex {
    /// Parse a v2 pack index from its byte view.
    pub fn parse(data: &[u8]) -> Result<Self, PackError> {
        let mut cur = Cursor::new("pack index", data);

        if cur.take(4)? != IDX_SIGNATURE {
            return Err(PackError::InvalidIndex("bad signature".into()));
        }
        let version = cur.read_be_u32()?;
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let fanout = FanoutTable::from_bytes(cur.take(1024)?)?;
        let count = fanout.total();
        let n = count as usize;

        // Names, in ascending hash order.
        let mut names = Vec::with_capacity(n);
        for _ in 0..n {
            names.push(ObjectId::from_bytes(cur.take(20)?)?);
        }
        for pair in names.windows(2) {
            if pair[0] >= pair[1] {
                return Err(PackError::InvalidIndex(format!(
                    "names out of order around {}",
                    pair[1]
                )));
            }
        }
        for (i, oid) in names.iter().enumerate() {
            if !fanout.range(oid.first_byte()).contains(&i) {
                return Err(PackError::InvalidIndex(format!(
                    "fan-out table disagrees with name {oid} at position {i}"
                )));
            }
        }

        // CRCs are retained for verification against the pack.
        let mut crcs = HashMap::with_capacity(n);
        for oid in &names {
            crcs.insert(*oid, cur.read_be_u32()?);
        }

        // 32-bit offsets; the high bit redirects into the 64-bit table.
        let mut raw_offsets = Vec::with_capacity(n);
        for _ in 0..n {
            raw_offsets.push(cur.read_be_u32()?);
        }
        let large_count = raw_offsets
            .iter()
            .filter(|&&raw| raw & 0x8000_0000 != 0)
            .count();
        let mut large = Vec::with_capacity(large_count);
        for _ in 0..large_count {
            large.push(cur.read_be_u64()?);
        }

        let mut offsets = HashMap::with_capacity(n);
        for (oid, &raw) in names.iter().zip(&raw_offsets) {
            let offset = if raw & 0x8000_0000 != 0 {
                let idx = (raw & 0x7fff_ffff) as usize;
                *large.get(idx).ok_or_else(|| {
                    PackError::InvalidIndex(format!("64-bit offset index {idx} out of range"))
                })?
            } else {
                u64::from(raw)
            };
            offsets.insert(*oid, offset);
        }

        let pack_checksum = ObjectId::from_bytes(cur.take(20)?)?;
        let _index_checksum = ObjectId::from_bytes(cur.take(20)?)?;
        if !cur.is_empty() {
            return Err(PackError::InvalidIndex(format!(
                "{} trailing bytes after index checksum",
                cur.remaining()
            )));
        }

        // Derive entry lengths from consecutive offsets.
        let mut by_offset: Vec<(u64, ObjectId)> =
            offsets.iter().map(|(oid, &off)| (off, *oid)).collect();
        by_offset.sort_unstable();

        let mut lengths = HashMap::with_capacity(n);
        for pair in by_offset.windows(2) {
            lengths.insert(pair[0].1, Some(pair[1].0 - pair[0].0));
        }
        if let Some(&(_, last)) = by_offset.last() {
            lengths.insert(last, None);
        }

        Ok(Self {
            offsets,
            lengths,
            crcs,
            pack_checksum,
            count,
        })
    }

    /// Number of objects in the index.
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.offsets.contains_key(oid)
    }

    /// Byte offset of the object's entry in the pack.
    pub fn offset_of(&self, oid: &ObjectId) -> Option<u64> {
        self.offsets.get(oid).copied()
    }

    /// Byte length of the object's entry in the pack. The inner `None`
    /// marks the entry with the largest offset, which runs to the pack
    /// trailer.
    pub fn length_of(&self, oid: &ObjectId) -> Option<Option<u64>> {
        self.lengths.get(oid).copied()
    }

    pub(crate) fn crc32_of(&self, oid: &ObjectId) -> Option<u32> {
        self.crcs.get(oid).copied()
    }

    /// The pack checksum recorded in the index trailer.
    pub fn pack_checksum(&self) -> ObjectId {
        self.pack_checksum
    }

    /// Iterate over all indexed hashes (arbitrary order).
    pub fn oids(&self) -> impl Iterator<Item = &ObjectId> {
        self.offsets.keys()
    }
}
