use gito_utils::Cursor;

use crate::{ObjectError, ObjectType};

/// Parse an envelope header `"<kind> <size>\0"` off the front of `cur`.
///
/// Returns the kind and the declared payload size; the cursor is left at
/// the first payload byte.
pub fn parse_header(cur: &mut Cursor<'_>) -> Result<(ObjectType, usize), ObjectError> {
    let kind = cur.take_until(b' ')?;
    let obj_type = ObjectType::from_bytes(kind)?;

    let size_bytes = cur.take_until(0)?;
    let size_str = std::str::from_utf8(size_bytes)
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII size".into()))?;
    let size: usize = size_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("invalid size: {size_str:?}")))?;

    Ok((obj_type, size))
}

/// Write an envelope header: `"<kind> <size>\0"`.
pub fn write_header(obj_type: ObjectType, size: usize) -> Vec<u8> {
    format!("{} {}\0", obj_type, size).into_bytes()
}
