//! Packfile decoding.
//!
//! A pack stores many objects back-to-back, each zlib-deflated and possibly
//! delta-compressed against another object. This crate reads the pack
//! container and its companion index: parsing single entries, resolving
//! delta chains back to full objects, random access by hash, and a
//! sequential driver that unpacks every entry in pack order.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;
pub mod unpack;
pub mod varint;

pub use delta::{Delta, Hunk};
pub use entry::PackEntry;
pub use index::PackIndex;
pub use pack::{map_file, Pack};
pub use unpack::unpack_all;

use gito_hash::{HashError, ObjectId};
use gito_object::ObjectError;
use gito_utils::ParseError;

/// Errors that can occur during pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported pack entry kind: {0}")]
    UnsupportedEntryKind(u8),

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: usize, reason: String },

    #[error("size mismatch: declared {declared}, got {actual} bytes")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("object not found in pack: {0}")]
    NotFound(ObjectId),

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("no pack entry at base offset {0}")]
    NoBaseAtOffset(u64),

    #[error("delta chain too deep (>{0} levels)")]
    DeltaChainTooDeep(usize),

    #[error("pack checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("crc32 mismatch for {oid}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        oid: ObjectId,
        expected: u32,
        actual: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\xfftOc"
pub const IDX_VERSION: u32 = 2;

/// Length of the trailing pack checksum.
pub const TRAILER_LEN: usize = 20;

/// Maximum delta chain depth before we bail out.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 512;
