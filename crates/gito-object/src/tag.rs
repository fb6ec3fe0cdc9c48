use bstr::BString;
use gito_hash::ObjectId;
use gito_utils::Cursor;

use crate::{ObjectError, ObjectType, Signature};

/// An annotated tag object.
///
/// The payload mirrors the commit schema: `object`, `type`, `tag`, an
/// optional `tagger`, a blank line, then the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// The tagged object.
    pub target: ObjectId,
    /// Kind of the tagged object.
    pub target_type: ObjectType,
    /// Tag name.
    pub tag_name: BString,
    /// Tagger identity (absent in some very old tags).
    pub tagger: Option<Signature>,
    /// Tag message.
    pub message: BString,
}

impl Tag {
    /// Parse tag payload (no envelope header).
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut cur = Cursor::new("tag", payload);

        expect_key(&mut cur, "object")?;
        let line = cur.take_until(b'\n')?;
        let hex = std::str::from_utf8(line)
            .map_err(|_| ObjectError::InvalidHeader("non-ASCII target hash".into()))?;
        let target = ObjectId::from_hex(hex)?;

        expect_key(&mut cur, "type")?;
        let target_type = ObjectType::from_bytes(cur.take_until(b'\n')?)?;

        expect_key(&mut cur, "tag")?;
        let tag_name = BString::from(cur.take_until(b'\n')?);

        let mut tagger = None;
        let probe = cur.clone();
        if let Ok(key) = cur.take_until(b' ') {
            if key == b"tagger" {
                tagger = Some(Signature::parse(cur.take_until(b'\n')?)?);
            } else {
                cur = probe;
            }
        } else {
            cur = probe;
        }

        if cur.read_u8()? != b'\n' {
            return Err(cur.error("expected blank line before message").into());
        }
        let message = BString::from(cur.rest());

        Ok(Self {
            target,
            target_type,
            tag_name,
            tagger,
            message,
        })
    }

    /// Serialize tag payload (no envelope header).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"object ");
        out.extend_from_slice(self.target.to_hex().as_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_type.as_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"tag ");
        out.extend_from_slice(&self.tag_name);
        out.push(b'\n');

        if let Some(ref tagger) = self.tagger {
            out.extend_from_slice(b"tagger ");
            out.extend_from_slice(&tagger.serialize());
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }
}

fn expect_key(cur: &mut Cursor<'_>, key: &'static str) -> Result<(), ObjectError> {
    match cur.take_until(b' ') {
        Ok(tok) if tok == key.as_bytes() => Ok(()),
        _ => Err(ObjectError::MissingTagField { field: key }),
    }
}
