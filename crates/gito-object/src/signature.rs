use bstr::{BString, ByteVec};
use gito_utils::Cursor;

use crate::ObjectError;

/// An identity line as it appears in commit and tag headers:
/// `Name <email> date`.
///
/// The date is the raw token after the closing `>` (seconds + timezone,
/// e.g. `"1112912053 -0700"`); this codec stores it verbatim and never
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: BString,
    pub email: BString,
    pub date: BString,
}

impl Signature {
    /// Parse from the wire form `Name <email> date`.
    pub fn parse(raw: &[u8]) -> Result<Self, ObjectError> {
        let mut cur = Cursor::new("signature", raw);

        let name = cur.take_until(b'<')?;
        // The space separating name and `<` belongs to the syntax, not the name.
        let name = name.strip_suffix(b" ").unwrap_or(name);

        let email = cur.take_until(b'>')?;
        if cur.read_u8()? != b' ' {
            return Err(cur.error("expected space after '>'").into());
        }
        let date = cur.rest();

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            date: BString::from(date),
        })
    }

    /// Emit the wire form: `name + " <" + email + "> " + date`.
    ///
    /// Neither name nor email is escaped; callers must keep `<` and `>` out
    /// of them or the result will not parse back.
    pub fn serialize(&self) -> BString {
        let mut out = BString::from(Vec::with_capacity(
            self.name.len() + self.email.len() + self.date.len() + 4,
        ));
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(&self.date);
        out
    }
}
