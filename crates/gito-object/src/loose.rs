//! The zlib-wrapped loose form of an object.
//!
//! A loose object is `deflate("<kind> <size>\0<payload>")`; the hash of the
//! *inflated* bytes is the object's identity.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::{Object, ObjectError};

/// Parse an object from its deflated loose form.
pub fn parse_loose(data: &[u8]) -> Result<Object, ObjectError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    Object::parse_inflated(&inflated)
}

/// Emit an object in its deflated loose form.
pub fn serialize_loose(obj: &Object) -> Result<Vec<u8>, ObjectError> {
    let inflated = obj.serialize_inflated();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&inflated)?;
    Ok(encoder.finish()?)
}
