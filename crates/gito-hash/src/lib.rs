//! Hash computation and object identity for the gito object codec.
//!
//! Everything in the git object format is keyed by a 20-byte SHA-1 digest.
//! This crate provides the [`ObjectId`] type, its typed [`TreeId`] and
//! [`CommitId`] flavors, hex encoding/decoding, streaming hash computation,
//! and the fan-out table used by pack indices.

mod error;
pub mod fanout;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use fanout::FanoutTable;
pub use hasher::Hasher;
pub use oid::{CommitId, ObjectId, TreeId};

/// Length of a raw digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// Length of the hex representation.
pub const HEX_LEN: usize = DIGEST_LEN * 2;
