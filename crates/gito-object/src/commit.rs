use bstr::{BStr, BString, ByteSlice};
use gito_hash::{CommitId, TreeId};
use gito_utils::Cursor;

use crate::{ObjectError, Signature};

/// A git commit object.
///
/// The payload schema is strict: a `tree` line, zero or more `parent`
/// lines, `author`, `committer`, a blank line, then the message verbatim
/// (including any trailing newline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The root tree.
    pub tree: TreeId,
    /// Parent commits (empty for a root commit, several for a merge).
    pub parents: Vec<CommitId>,
    pub author: Signature,
    pub committer: Signature,
    /// Everything after the blank separator line.
    pub message: BString,
}

impl Commit {
    /// Parse commit payload (no envelope header).
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut cur = Cursor::new("commit", payload);

        expect_key(&mut cur, "tree")?;
        let line = cur_line(&mut cur)?;
        let tree = TreeId::from_hex(hex_value(&cur, line)?)?;

        // Parent lines are recognized by peeking the next header keyword.
        let mut parents = Vec::new();
        loop {
            let probe = cur.clone();
            let Ok(key) = cur.take_until(b' ') else {
                cur = probe;
                break;
            };
            if key != b"parent" {
                cur = probe;
                break;
            }
            let line = cur_line(&mut cur)?;
            parents.push(CommitId::from_hex(hex_value(&cur, line)?)?);
        }

        expect_key(&mut cur, "author")?;
        let author = Signature::parse(cur_line(&mut cur)?)?;

        expect_key(&mut cur, "committer")?;
        let committer = Signature::parse(cur_line(&mut cur)?)?;

        // The blank line separating headers from the message.
        if cur.read_u8()? != b'\n' {
            return Err(cur.error("expected blank line before message").into());
        }
        let message = BString::from(cur.rest());

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message,
        })
    }

    /// Serialize commit payload (no envelope header).
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.serialize());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.serialize());
        out.push(b'\n');

        out.push(b'\n');
        out.extend_from_slice(&self.message);

        out
    }

    /// The first parent (None for root commits).
    pub fn first_parent(&self) -> Option<&CommitId> {
        self.parents.first()
    }

    /// More than one parent?
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// No parents?
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// The first line of the message.
    pub fn summary(&self) -> &BStr {
        let msg: &[u8] = self.message.as_ref();
        match msg.find_byte(b'\n') {
            Some(pos) => BStr::new(&msg[..pos]),
            None => BStr::new(msg),
        }
    }
}

/// Consume a header keyword and its trailing space, failing with the
/// missing-field error if the next keyword is not `key`.
fn expect_key(cur: &mut Cursor<'_>, key: &'static str) -> Result<(), ObjectError> {
    match cur.take_until(b' ') {
        Ok(tok) if tok == key.as_bytes() => Ok(()),
        _ => Err(ObjectError::MissingCommitField { field: key }),
    }
}

/// Consume the rest of the current header line (up to the LF).
fn cur_line<'a>(cur: &mut Cursor<'a>) -> Result<&'a [u8], ObjectError> {
    Ok(cur.take_until(b'\n')?)
}

/// Header hash values must be ASCII hex.
fn hex_value<'a>(cur: &Cursor<'_>, raw: &'a [u8]) -> Result<&'a str, ObjectError> {
    std::str::from_utf8(raw).map_err(|_| cur.error("non-ASCII hash value").into())
}
