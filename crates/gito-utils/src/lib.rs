//! Foundation utilities for the gito object codec.
//!
//! The only real inhabitant is the [`Cursor`]: a consumable view over an
//! immutable byte region with the positional parsing primitives the object
//! and pack codecs are built from.

pub mod cursor;

// Re-export core types at crate root for convenience
pub use bstr::{BStr, BString, ByteSlice, ByteVec};
pub use cursor::{Cursor, ParseError};

pub type Result<T> = std::result::Result<T, ParseError>;
