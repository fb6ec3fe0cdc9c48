//! Random access into a pack through its index.
//!
//! A [`Pack`] borrows the pack's byte view (typically a memory map) and
//! owns its parsed [`PackIndex`]. Entries are located by the index's
//! offset/length maps, parsed on demand, and memoized. Delta chains are
//! resolved iteratively so a pathological pack cannot blow the stack.

use std::num::NonZeroUsize;
use std::path::Path;

use gito_hash::{Hasher, ObjectId};
use gito_object::Object;
use gito_utils::Cursor;
use lru::LruCache;
use memmap2::Mmap;

use crate::delta::{self, Delta};
use crate::entry::{parse_entry, PackEntry};
use crate::index::PackIndex;
use crate::{PackError, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE, PACK_SIGNATURE, TRAILER_LEN};

/// Parsed entries kept hot per pack.
const ENTRY_CACHE_SIZE: usize = 512;

/// Parse and validate a pack header, returning `(version, count)`.
pub(crate) fn parse_pack_header(cur: &mut Cursor<'_>) -> Result<(u32, u32), PackError> {
    if cur.take(4)? != PACK_SIGNATURE {
        return Err(PackError::InvalidHeader("bad PACK signature".into()));
    }
    let version = cur.read_be_u32()?;
    if version != 2 && version != 3 {
        return Err(PackError::UnsupportedVersion(version));
    }
    let count = cur.read_be_u32()?;
    Ok((version, count))
}

/// A pack opened for random access.
#[derive(Debug)]
pub struct Pack<'a> {
    data: &'a [u8],
    version: u32,
    count: u32,
    index: PackIndex,
    /// (offset, oid) pairs sorted by offset, for ofs-delta base lookup.
    revindex: Vec<(u64, ObjectId)>,
    cache: LruCache<ObjectId, PackEntry>,
}

impl<'a> Pack<'a> {
    /// Open a pack over its byte view, keyed by an already-parsed index.
    pub fn parse(index: PackIndex, data: &'a [u8]) -> Result<Self, PackError> {
        if data.len() < PACK_HEADER_SIZE + TRAILER_LEN {
            return Err(PackError::InvalidHeader("pack too small".into()));
        }
        let mut cur = Cursor::new("pack header", data);
        let (version, count) = parse_pack_header(&mut cur)?;
        if count != index.len() {
            return Err(PackError::InvalidHeader(format!(
                "pack has {count} objects but index has {}",
                index.len()
            )));
        }

        let mut revindex: Vec<(u64, ObjectId)> = index
            .oids()
            .map(|oid| (index.offset_of(oid).unwrap_or_default(), *oid))
            .collect();
        revindex.sort_unstable();

        Ok(Self {
            data,
            version,
            count,
            index,
            revindex,
            cache: LruCache::new(
                NonZeroUsize::new(ENTRY_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            ),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of objects in the pack.
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.index.contains(oid)
    }

    /// The hash of the object whose entry starts at `offset`, if any.
    pub fn oid_at_offset(&self, offset: u64) -> Option<ObjectId> {
        self.revindex
            .binary_search_by_key(&offset, |&(off, _)| off)
            .ok()
            .map(|pos| self.revindex[pos].1)
    }

    /// Read the packed entry for `oid`, without resolving deltas.
    ///
    /// Successful parses are memoized; a repeated read is a cache hit.
    pub fn read(&mut self, oid: &ObjectId) -> Result<PackEntry, PackError> {
        if let Some(entry) = self.cache.get(oid) {
            return Ok(entry.clone());
        }
        let entry = self.parse_at(oid)?;
        self.cache.push(*oid, entry.clone());
        Ok(entry)
    }

    fn parse_at(&self, oid: &ObjectId) -> Result<PackEntry, PackError> {
        let offset = self.index.offset_of(oid).ok_or(PackError::NotFound(*oid))?;
        let len = match self.index.length_of(oid) {
            Some(Some(len)) => len,
            // The maximal-offset entry runs up to the pack trailer.
            _ => ((self.data.len() - TRAILER_LEN) as u64)
                .checked_sub(offset)
                .ok_or_else(|| {
                    PackError::InvalidIndex(format!(
                        "entry offset {offset} beyond pack of {} bytes",
                        self.data.len()
                    ))
                })?,
        };
        let whole = Cursor::new("pack entry", self.data);
        let mut cur = whole.sub(offset as usize, len as usize)?;
        parse_entry(&mut cur, self.version)
    }

    /// Read and fully resolve the object stored under `oid`.
    ///
    /// Delta chains are walked iteratively: ofs-delta bases are located
    /// through the reverse index, in-pack ref-delta bases through the
    /// index, and foreign ref-delta bases through `read_base`, which maps
    /// a hash to the inflated typed envelope of that object (or `None` if
    /// it cannot provide it).
    pub fn resolve<F>(&mut self, oid: &ObjectId, mut read_base: F) -> Result<Object, PackError>
    where
        F: FnMut(&ObjectId) -> Result<Option<Vec<u8>>, PackError>,
    {
        let mut chain: Vec<Delta> = Vec::new();
        let mut current = *oid;

        for _ in 0..MAX_DELTA_CHAIN_DEPTH {
            let offset = self
                .index
                .offset_of(&current)
                .ok_or(PackError::NotFound(current))?;

            match self.read(&current)? {
                PackEntry::Raw(obj) => {
                    return apply_chain(obj.serialize_inflated(), &chain);
                }
                PackEntry::OfsDelta { base_offset, delta } => {
                    chain.push(delta);
                    let target = offset.checked_sub(base_offset).ok_or_else(|| {
                        PackError::InvalidDelta {
                            offset: offset as usize,
                            reason: "base offset before pack start".into(),
                        }
                    })?;
                    current = self
                        .oid_at_offset(target)
                        .ok_or(PackError::NoBaseAtOffset(target))?;
                }
                PackEntry::RefDelta { base, delta } => {
                    chain.push(delta);
                    if self.index.contains(&base) {
                        current = base;
                    } else {
                        let env = read_base(&base)?.ok_or(PackError::MissingBase(base))?;
                        return apply_chain(env, &chain);
                    }
                }
            }
        }

        Err(PackError::DeltaChainTooDeep(MAX_DELTA_CHAIN_DEPTH))
    }

    /// Verify the trailing pack checksum: SHA-1 over everything before it.
    pub fn verify_trailer(&self) -> Result<(), PackError> {
        let split = self.data.len() - TRAILER_LEN;
        let stored = ObjectId::from_bytes(&self.data[split..])?;
        let computed = Hasher::digest(&self.data[..split])?;
        if computed != stored {
            return Err(PackError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }
        Ok(())
    }

    /// Verify every entry's bytes against the CRC32 column of the index.
    pub fn verify_crc32(&self) -> Result<(), PackError> {
        for &(offset, oid) in &self.revindex {
            let expected = self.index.crc32_of(&oid).ok_or(PackError::NotFound(oid))?;
            let end = match self.index.length_of(&oid) {
                Some(Some(len)) => offset.saturating_add(len),
                _ => (self.data.len() - TRAILER_LEN) as u64,
            };
            let slice = self
                .data
                .get(offset as usize..end as usize)
                .ok_or_else(|| {
                    PackError::InvalidIndex(format!("entry span [{offset}, {end}) out of bounds"))
                })?;

            let mut hasher = crc32fast::Hasher::new();
            hasher.update(slice);
            let actual = hasher.finalize();
            if actual != expected {
                return Err(PackError::CrcMismatch {
                    oid,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Apply a resolved delta chain, innermost delta last, to the base's
/// inflated envelope.
fn apply_chain(mut env: Vec<u8>, chain: &[Delta]) -> Result<Object, PackError> {
    for delta in chain.iter().rev() {
        env = delta::apply_raw(&env, delta)?;
    }
    Ok(Object::parse_inflated(&env)?)
}

/// Memory-map a pack or index file for use with the byte-view parsers.
pub fn map_file(path: impl AsRef<Path>) -> std::io::Result<Mmap> {
    let file = std::fs::File::open(path)?;
    // The mapping is read-only and the codec never mutates or truncates
    // the underlying file.
    unsafe { Mmap::map(&file) }
}
