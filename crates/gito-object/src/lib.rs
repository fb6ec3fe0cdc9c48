//! Git object model: blob, tree, commit, and tag codecs.
//!
//! Objects have a canonical payload form per kind, wrapped for storage in a
//! typed envelope `"<kind> <size>\0<payload>"` and zlib-deflated. The hash
//! of the inflated envelope is the object's identity. This crate provides
//! the four codecs, the envelope, and the zlib-wrapped loose form.

mod blob;
mod commit;
pub mod header;
pub mod loose;
mod signature;
mod tag;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use signature::Signature;
pub use tag::Tag;
pub use tree::{FileMode, Tree, TreeEntry};

use bstr::BString;
use gito_hash::{HashError, Hasher, ObjectId};
use gito_utils::ParseError;

/// Errors produced by object operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("envelope size mismatch: declared {declared}, got {actual} bytes")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("invalid tree entry mode: {0}")]
    InvalidMode(BString),

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid tag: missing '{field}' header")]
    MissingTagField { field: &'static str },

    #[error("zlib: {0}")]
    Compress(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four kinds of git objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// Parse from the kind string in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Blob => b"blob",
            Self::Tree => b"tree",
            Self::Commit => b"commit",
            Self::Tag => b"tag",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        })
    }
}

impl std::str::FromStr for ObjectType {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A parsed git object of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Parse from the inflated envelope form (`"<kind> <size>\0<payload>"`).
    ///
    /// The declared size must match the remaining byte count exactly.
    pub fn parse_inflated(data: &[u8]) -> Result<Self, ObjectError> {
        let mut cur = gito_utils::Cursor::new("object envelope", data);
        let (obj_type, declared) = header::parse_header(&mut cur)?;
        if cur.remaining() != declared {
            return Err(ObjectError::SizeMismatch {
                declared,
                actual: cur.remaining(),
            });
        }
        Self::parse_payload(obj_type, cur.rest())
    }

    /// Parse a bare payload with a known kind (no envelope header).
    pub fn parse_payload(obj_type: ObjectType, payload: &[u8]) -> Result<Self, ObjectError> {
        match obj_type {
            ObjectType::Blob => Ok(Self::Blob(Blob::parse(payload))),
            ObjectType::Tree => Ok(Self::Tree(Tree::parse(payload)?)),
            ObjectType::Commit => Ok(Self::Commit(Commit::parse(payload)?)),
            ObjectType::Tag => Ok(Self::Tag(Tag::parse(payload)?)),
        }
    }

    /// Serialize to the inflated envelope form (header + payload).
    pub fn serialize_inflated(&self) -> Vec<u8> {
        let payload = self.serialize_payload();
        let hdr = header::write_header(self.object_type(), payload.len());
        let mut out = Vec::with_capacity(hdr.len() + payload.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(&payload);
        out
    }

    /// Serialize just the payload (no envelope header).
    pub fn serialize_payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.serialize().to_vec(),
            Self::Tree(t) => t.serialize(),
            Self::Commit(c) => c.serialize(),
            Self::Tag(t) => t.serialize(),
        }
    }

    /// The object's kind.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
            Self::Tag(_) => ObjectType::Tag,
        }
    }

    /// Compute the content address: the hash of the inflated envelope.
    pub fn oid(&self) -> Result<ObjectId, HashError> {
        let payload = self.serialize_payload();
        Hasher::hash_object(self.object_type().as_bytes(), &payload)
    }
}
