use std::fmt;

/// A parse failure, carrying where in the format it happened.
///
/// `context` is the label of the region being parsed (e.g. `"tree entry"`,
/// `"pack header"`), `offset` the cursor position relative to the origin of
/// that region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error in {context} at offset {offset}: {detail}")]
pub struct ParseError {
    pub context: &'static str,
    pub offset: usize,
    pub detail: String,
}

/// A consumable, sliceable view over an immutable byte region.
///
/// Reading advances the cursor; `Clone` captures the current position so a
/// caller can peek ahead and back off without consuming. All read methods
/// fail with a [`ParseError`] on a short region, never panic.
#[derive(Clone)]
pub struct Cursor<'a> {
    context: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor over `data`, labelled with the format region it
    /// parses. The label only shows up in error messages.
    pub fn new(context: &'static str, data: &'a [u8]) -> Self {
        Self {
            context,
            data,
            pos: 0,
        }
    }

    /// Current offset relative to the origin of the region.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to consume.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Build a parse error at the current position.
    pub fn error(&self, detail: impl Into<String>) -> ParseError {
        ParseError {
            context: self.context,
            offset: self.pos,
            detail: detail.into(),
        }
    }

    /// Next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Take the next byte.
    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        let b = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Take the next `n` bytes as a sub-slice of the underlying region.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(self.error(format!(
                "expected {n} bytes, only {} remain",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read a big-endian u32.
    pub fn read_be_u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian u64.
    pub fn read_be_u64(&mut self) -> Result<u64, ParseError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Take bytes up to (not including) the next `delim`, consuming the
    /// delimiter itself.
    pub fn take_until(&mut self, delim: u8) -> Result<&'a [u8], ParseError> {
        let rest = &self.data[self.pos..];
        let at = rest.iter().position(|&b| b == delim).ok_or_else(|| {
            self.error(format!("delimiter {:#04x} not found", delim))
        })?;
        let out = &rest[..at];
        self.pos += at + 1;
        Ok(out)
    }

    /// Consume and return everything that remains.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// The unconsumed remainder, without advancing.
    pub fn rest_slice(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Skip `n` bytes.
    pub fn advance(&mut self, n: usize) -> Result<(), ParseError> {
        if self.remaining() < n {
            return Err(self.error(format!(
                "cannot advance {n} bytes, only {} remain",
                self.remaining()
            )));
        }
        self.pos += n;
        Ok(())
    }

    /// A fresh cursor over `len` bytes starting at absolute `offset` in the
    /// underlying region, independent of the current position.
    pub fn sub(&self, offset: usize, len: usize) -> Result<Cursor<'a>, ParseError> {
        let end = offset.checked_add(len).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => Ok(Cursor::new(self.context, &self.data[offset..end])),
            None => Err(self.error(format!(
                "sub-view [{offset}, {offset}+{len}) out of bounds (region is {} bytes)",
                self.data.len()
            ))),
        }
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cursor({} @ {}/{})",
            self.context,
            self.pos,
            self.data.len()
        )
    }
}
