//! Sequential unpacking of a whole pack.
//!
//! The driver walks the `count` entries of a pack in order, resolving each
//! to a full object and handing it to a content-addressed sink. Deltas may
//! only reference earlier entries (ofs-delta) or objects the caller can
//! already provide (ref-delta), so a single forward pass suffices; the
//! offset → hash map grows as entries resolve.

use std::collections::HashMap;

use gito_hash::ObjectId;
use gito_object::Object;
use gito_utils::Cursor;

use crate::entry::{parse_entry, PackEntry};
use crate::pack::parse_pack_header;
use crate::{delta, PackError};

/// Unpack every entry of `data`, in pack order.
///
/// `read_inflated` maps a hash to the inflated typed envelope of an object
/// written earlier (or known out-of-band, for ref-delta bases), returning
/// `Ok(None)` when it cannot provide it. `write` stores a resolved object
/// and returns its hash. Entries are resolved strictly sequentially:
/// entry *i* is written before entry *i+1* is parsed.
///
/// Returns the written hashes in pack order. The first failure aborts the
/// walk; objects already handed to `write` stay written (the sink is
/// assumed idempotent by content address).
pub fn unpack_all<R, W>(
    data: &[u8],
    mut read_inflated: R,
    mut write: W,
) -> Result<Vec<ObjectId>, PackError>
where
    R: FnMut(&ObjectId) -> Result<Option<Vec<u8>>, PackError>,
    W: FnMut(&Object) -> Result<ObjectId, PackError>,
{
    let mut cur = Cursor::new("pack", data);
    let (version, count) = parse_pack_header(&mut cur)?;

    let mut by_offset: HashMap<u64, ObjectId> = HashMap::with_capacity(count as usize);
    let mut written = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let entry_offset = cur.offset() as u64;
        let obj = match parse_entry(&mut cur, version)? {
            PackEntry::Raw(obj) => obj,
            PackEntry::OfsDelta { base_offset, delta } => {
                let target = entry_offset.checked_sub(base_offset).ok_or_else(|| {
                    PackError::InvalidDelta {
                        offset: entry_offset as usize,
                        reason: "base offset before pack start".into(),
                    }
                })?;
                let base = *by_offset
                    .get(&target)
                    .ok_or(PackError::NoBaseAtOffset(target))?;
                let env = read_inflated(&base)?.ok_or(PackError::MissingBase(base))?;
                delta::apply(&env, &delta)?
            }
            PackEntry::RefDelta { base, delta } => {
                let env = read_inflated(&base)?.ok_or(PackError::MissingBase(base))?;
                delta::apply(&env, &delta)?
            }
        };

        let oid = write(&obj)?;
        by_offset.insert(entry_offset, oid);
        written.push(oid);
    }

    Ok(written)
}
