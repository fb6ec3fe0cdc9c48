use std::cmp::Ordering;

use bstr::{BStr, BString, ByteSlice};
use gito_hash::ObjectId;
use gito_utils::Cursor;

use crate::ObjectError;

/// File mode for tree entries.
///
/// The object format admits exactly these four modes; anything else in a
/// tree payload is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Normal,
    /// Executable file (100755)
    Exec,
    /// Symbolic link (120000)
    Symlink,
    /// Subdirectory (40000)
    Dir,
}

impl FileMode {
    /// Parse from the ASCII form used in tree payloads.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"100644" => Ok(Self::Normal),
            b"100755" => Ok(Self::Exec),
            b"120000" => Ok(Self::Symlink),
            b"40000" => Ok(Self::Dir),
            _ => Err(ObjectError::InvalidMode(BString::from(s))),
        }
    }

    /// The canonical ASCII form (no leading zero for directories).
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Normal => b"100644",
            Self::Exec => b"100755",
            Self::Symlink => b"120000",
            Self::Dir => b"40000",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::Normal | Self::Exec)
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }
}

/// A single entry in a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Compare entries using git's tree sorting rules.
    ///
    /// Directories sort as if they had a trailing '/', so "foo" (dir)
    /// sorts after "foo.c" but also after "foo-bar".
    pub fn cmp_entries(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        base_name_compare(
            a.name.as_ref(),
            a.mode.is_dir(),
            b.name.as_ref(),
            b.mode.is_dir(),
        )
    }
}

/// Git's tree entry name comparison: after the common prefix, directory
/// names get an implicit trailing '/'.
fn base_name_compare(name1: &[u8], is_dir1: bool, name2: &[u8], is_dir2: bool) -> Ordering {
    let min_len = name1.len().min(name2.len());
    let cmp = name1[..min_len].cmp(&name2[..min_len]);
    if cmp != Ordering::Equal {
        return cmp;
    }
    let c1 = if name1.len() > min_len {
        name1[min_len]
    } else if is_dir1 {
        b'/'
    } else {
        0
    };
    let c2 = if name2.len() > min_len {
        name2[min_len]
    } else if is_dir2 {
        b'/'
    } else {
        0
    };
    c1.cmp(&c2)
}

/// A tree object — an ordered directory listing.
///
/// The codec trusts the order it is given: parsing preserves payload order
/// and serializing never re-sorts. The format requires entries sorted by
/// name (see [`Tree::sort`]); feeding an unsorted tree through emit will
/// produce a payload real git considers malformed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tree payload: a run of `<mode> <name>\0<raw-oid>` records.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut cur = Cursor::new("tree entry", payload);
        let mut entries = Vec::new();

        while !cur.is_empty() {
            let mode = FileMode::from_bytes(cur.take_until(b' ')?)?;
            let name = BString::from(cur.take_until(0)?);
            let oid = ObjectId::from_bytes(cur.take(20)?)?;
            entries.push(TreeEntry { mode, name, oid });
        }

        Ok(Self { entries })
    }

    /// Serialize the tree payload, preserving entry order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    /// Sort entries into git's canonical order.
    pub fn sort(&mut self) {
        self.entries.sort_by(TreeEntry::cmp_entries);
    }

    /// Look up an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
