//! End-to-end pack reading: synthetic packs and indices, random access,
//! delta resolution, checksum verification, and the unpack driver.

use std::collections::HashMap;
use std::io::Write as _;

use bstr::BString;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use gito_hash::{FanoutTable, Hasher, ObjectId, TreeId};
use gito_object::{Blob, Commit, Object, Signature};
use gito_pack::entry::encode_entry_header;
use gito_pack::{delta, map_file, unpack_all, varint, Pack, PackError, PackIndex};

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Builds a pack and its v2 index in memory.
struct PackBuilder {
    data: Vec<u8>,
    /// (oid, offset, crc) per entry, in pack order.
    entries: Vec<(ObjectId, u64, u32)>,
}

impl PackBuilder {
    fn new(count: u32) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(b"PACK");
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&count.to_be_bytes());
        Self {
            data,
            entries: Vec::new(),
        }
    }

    fn push_entry(&mut self, oid: ObjectId, raw: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        let mut crc = crc32fast::Hasher::new();
        crc.update(raw);
        self.entries.push((oid, offset, crc.finalize()));
        self.data.extend_from_slice(raw);
        offset
    }

    /// Append a self-contained object. Returns its entry offset.
    fn add_raw(&mut self, obj: &Object) -> u64 {
        let payload = obj.serialize_payload();
        let kind = match obj.object_type() {
            gito_object::ObjectType::Commit => 1,
            gito_object::ObjectType::Tree => 2,
            gito_object::ObjectType::Blob => 3,
            gito_object::ObjectType::Tag => 4,
        };
        let mut raw = encode_entry_header(kind, payload.len() as u64);
        raw.extend_from_slice(&deflate(&payload));
        self.push_entry(obj.oid().unwrap(), &raw)
    }

    /// Append an ofs-delta entry against the entry at `base_offset`.
    /// `result_oid` is the hash of the object the delta reconstructs.
    fn add_ofs_delta(&mut self, result_oid: ObjectId, base_offset: u64, hunks: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        let mut raw = encode_entry_header(6, hunks.len() as u64);
        raw.extend_from_slice(&varint::write_base_offset(offset - base_offset));
        raw.extend_from_slice(&deflate(hunks));
        self.push_entry(result_oid, &raw)
    }

    /// Append a ref-delta entry against `base`.
    fn add_ref_delta(&mut self, result_oid: ObjectId, base: ObjectId, hunks: &[u8]) -> u64 {
        let mut raw = encode_entry_header(7, hunks.len() as u64);
        raw.extend_from_slice(base.as_bytes());
        raw.extend_from_slice(&deflate(hunks));
        self.push_entry(result_oid, &raw)
    }

    /// Close the pack with its checksum and build the matching index.
    fn finish(mut self) -> (Vec<u8>, Vec<u8>) {
        let checksum = Hasher::digest(&self.data).unwrap();
        self.data.extend_from_slice(checksum.as_bytes());

        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut idx = Vec::new();
        idx.extend_from_slice(&[0xff, 0x74, 0x4f, 0x63]);
        idx.extend_from_slice(&2u32.to_be_bytes());

        let oids: Vec<ObjectId> = sorted.iter().map(|(oid, _, _)| *oid).collect();
        idx.extend_from_slice(&FanoutTable::build(&oids).to_bytes());
        for (oid, _, _) in &sorted {
            idx.extend_from_slice(oid.as_bytes());
        }
        for (_, _, crc) in &sorted {
            idx.extend_from_slice(&crc.to_be_bytes());
        }
        for (_, offset, _) in &sorted {
            idx.extend_from_slice(&(*offset as u32).to_be_bytes());
        }
        idx.extend_from_slice(checksum.as_bytes());
        let idx_checksum = Hasher::digest(&idx).unwrap();
        idx.extend_from_slice(idx_checksum.as_bytes());

        (self.data, idx)
    }
}

fn delta_stream(source_len: usize, result_len: usize, hunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&varint::write_size(source_len as u64));
    out.extend_from_slice(&varint::write_size(result_len as u64));
    for hunk in hunks {
        out.extend_from_slice(hunk);
    }
    out
}

fn blob(content: &[u8]) -> Object {
    Object::Blob(Blob::new(content.to_vec()))
}

fn no_base(_: &ObjectId) -> Result<Option<Vec<u8>>, PackError> {
    Ok(None)
}

#[test]
fn read_raw_objects_by_hash() {
    let commit = Object::Commit(Commit {
        tree: TreeId::from_hex("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap(),
        parents: vec![],
        author: Signature {
            name: BString::from("A U Thor"),
            email: BString::from("author@example.com"),
            date: BString::from("1112912053 -0700"),
        },
        committer: Signature {
            name: BString::from("A U Thor"),
            email: BString::from("author@example.com"),
            date: BString::from("1112912053 -0700"),
        },
        message: BString::from("Initial\n"),
    });
    let objects = [blob(b"alpha"), blob(b"beta"), commit];

    let mut builder = PackBuilder::new(objects.len() as u32);
    for obj in &objects {
        builder.add_raw(obj);
    }
    let (pack_bytes, idx_bytes) = builder.finish();

    let index = PackIndex::parse(&idx_bytes).unwrap();
    let mut pack = Pack::parse(index, &pack_bytes).unwrap();
    assert_eq!(pack.len(), 3);
    assert_eq!(pack.version(), 2);

    for obj in &objects {
        let oid = obj.oid().unwrap();
        assert!(pack.contains(&oid));
        let resolved = pack.resolve(&oid, no_base).unwrap();
        assert_eq!(&resolved, obj);
        // Second read hits the memo cache and must agree.
        let resolved_again = pack.resolve(&oid, no_base).unwrap();
        assert_eq!(resolved_again, resolved);
    }
}

#[test]
fn missing_hash_is_not_found() {
    let mut builder = PackBuilder::new(1);
    builder.add_raw(&blob(b"only"));
    let (pack_bytes, idx_bytes) = builder.finish();

    let mut pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    let missing = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
    assert!(matches!(
        pack.resolve(&missing, no_base).unwrap_err(),
        PackError::NotFound(oid) if oid == missing
    ));
}

#[test]
fn resolve_ofs_delta() {
    // Base blob "abcdef", delta [Copy(0,6), Insert("g")] → blob "abcdefg".
    let base = blob(b"abcdef");
    let result = blob(b"abcdefg");

    let mut builder = PackBuilder::new(2);
    let base_offset = builder.add_raw(&base);
    let hunks = delta_stream(
        6,
        7,
        &[delta::encode_copy(0, 6), delta::encode_insert(b"g")],
    );
    builder.add_ofs_delta(result.oid().unwrap(), base_offset, &hunks);
    let (pack_bytes, idx_bytes) = builder.finish();

    let mut pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    let resolved = pack.resolve(&result.oid().unwrap(), no_base).unwrap();
    assert_eq!(resolved, result);
}

#[test]
fn resolve_chained_deltas() {
    // blob "aaaa" ← delta → "aaaabbbb" ← delta → "aaaabbbbcccc".
    let first = blob(b"aaaa");
    let second = blob(b"aaaabbbb");
    let third = blob(b"aaaabbbbcccc");

    let mut builder = PackBuilder::new(3);
    let off0 = builder.add_raw(&first);
    let hunks1 = delta_stream(
        4,
        8,
        &[delta::encode_copy(0, 4), delta::encode_insert(b"bbbb")],
    );
    let off1 = builder.add_ofs_delta(second.oid().unwrap(), off0, &hunks1);
    let hunks2 = delta_stream(
        8,
        12,
        &[delta::encode_copy(0, 8), delta::encode_insert(b"cccc")],
    );
    builder.add_ofs_delta(third.oid().unwrap(), off1, &hunks2);
    let (pack_bytes, idx_bytes) = builder.finish();

    let mut pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    assert_eq!(pack.resolve(&third.oid().unwrap(), no_base).unwrap(), third);
    assert_eq!(
        pack.resolve(&second.oid().unwrap(), no_base).unwrap(),
        second
    );
}

#[test]
fn resolve_ref_delta_within_pack() {
    let base = blob(b"hello world");
    let result = blob(b"hello");

    let mut builder = PackBuilder::new(2);
    builder.add_raw(&base);
    let hunks = delta_stream(11, 5, &[delta::encode_copy(0, 5)]);
    builder.add_ref_delta(result.oid().unwrap(), base.oid().unwrap(), &hunks);
    let (pack_bytes, idx_bytes) = builder.finish();

    let mut pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    assert_eq!(pack.resolve(&result.oid().unwrap(), no_base).unwrap(), result);
}

#[test]
fn resolve_ref_delta_with_foreign_base() {
    // The base object lives outside the pack; the resolver callback
    // provides its inflated envelope.
    let base = blob(b"external base content");
    let result = blob(b"external");

    let mut builder = PackBuilder::new(1);
    let hunks = delta_stream(21, 8, &[delta::encode_copy(0, 8)]);
    builder.add_ref_delta(result.oid().unwrap(), base.oid().unwrap(), &hunks);
    let (pack_bytes, idx_bytes) = builder.finish();

    let store: HashMap<ObjectId, Vec<u8>> =
        [(base.oid().unwrap(), base.serialize_inflated())].into();

    let mut pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    let resolved = pack
        .resolve(&result.oid().unwrap(), |oid| Ok(store.get(oid).cloned()))
        .unwrap();
    assert_eq!(resolved, result);

    // Without the provider the same read fails with the missing hash.
    let err = pack
        .resolve(&result.oid().unwrap(), no_base)
        .unwrap_err();
    assert!(matches!(err, PackError::MissingBase(oid) if oid == base.oid().unwrap()));
}

#[test]
fn count_mismatch_between_pack_and_index() {
    let mut builder = PackBuilder::new(2); // header claims 2
    builder.add_raw(&blob(b"solo"));
    let (pack_bytes, idx_bytes) = builder.finish(); // index holds 1

    let err = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap_err();
    assert!(matches!(err, PackError::InvalidHeader(_)));
}

#[test]
fn verify_trailer_and_crc32() {
    let mut builder = PackBuilder::new(2);
    builder.add_raw(&blob(b"checksummed"));
    builder.add_raw(&blob(b"content"));
    let (pack_bytes, idx_bytes) = builder.finish();

    let pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    pack.verify_trailer().unwrap();
    pack.verify_crc32().unwrap();
}

#[test]
fn corrupted_entry_fails_crc32() {
    let mut builder = PackBuilder::new(2);
    builder.add_raw(&blob(b"checksummed"));
    builder.add_raw(&blob(b"content"));
    let (mut pack_bytes, idx_bytes) = builder.finish();

    // Flip one bit inside the first entry's compressed payload.
    pack_bytes[16] ^= 0x01;

    let pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    assert!(matches!(
        pack.verify_crc32().unwrap_err(),
        PackError::CrcMismatch { .. }
    ));
    assert!(matches!(
        pack.verify_trailer().unwrap_err(),
        PackError::ChecksumMismatch { .. }
    ));
}

#[test]
fn unpack_all_returns_hashes_in_pack_order() {
    let a = blob(b"aaaa");
    let b = blob(b"aaaabbbb");

    let mut builder = PackBuilder::new(2);
    let off0 = builder.add_raw(&a);
    let hunks = delta_stream(
        4,
        8,
        &[delta::encode_copy(0, 4), delta::encode_insert(b"bbbb")],
    );
    builder.add_ofs_delta(b.oid().unwrap(), off0, &hunks);
    let (pack_bytes, _) = builder.finish();

    let store = std::cell::RefCell::new(HashMap::<ObjectId, Vec<u8>>::new());
    let written = unpack_all(
        &pack_bytes,
        |oid| Ok(store.borrow().get(oid).cloned()),
        |obj| {
            let oid = obj.oid()?;
            store.borrow_mut().insert(oid, obj.serialize_inflated());
            Ok(oid)
        },
    )
    .unwrap();

    assert_eq!(written, vec![a.oid().unwrap(), b.oid().unwrap()]);
    // Content address holds: stored bytes re-hash to their key.
    for (oid, env) in store.borrow().iter() {
        assert_eq!(&Hasher::digest(env).unwrap(), oid);
    }
}

#[test]
fn file_backed_pack_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let pack_path = dir.path().join("test.pack");
    let idx_path = dir.path().join("test.idx");

    let objects = [blob(b"on disk"), blob(b"via mmap")];
    let mut builder = PackBuilder::new(2);
    for obj in &objects {
        builder.add_raw(obj);
    }
    let (pack_bytes, idx_bytes) = builder.finish();
    std::fs::write(&pack_path, &pack_bytes).unwrap();
    std::fs::write(&idx_path, &idx_bytes).unwrap();

    let idx_map = map_file(&idx_path).unwrap();
    let pack_map = map_file(&pack_path).unwrap();
    let index = PackIndex::parse(&idx_map).unwrap();
    // The index trailer records the pack's own checksum.
    assert_eq!(
        index.pack_checksum().as_bytes(),
        &pack_bytes[pack_bytes.len() - 20..]
    );
    let mut pack = Pack::parse(index, &pack_map).unwrap();

    pack.verify_trailer().unwrap();
    for obj in &objects {
        assert_eq!(&pack.resolve(&obj.oid().unwrap(), no_base).unwrap(), obj);
    }
}

#[test]
fn oid_at_offset_matches_emitted_entries() {
    let a = blob(b"first entry");
    let b = blob(b"second entry");

    let mut builder = PackBuilder::new(2);
    let off_a = builder.add_raw(&a);
    let off_b = builder.add_raw(&b);
    let (pack_bytes, idx_bytes) = builder.finish();

    let pack = Pack::parse(PackIndex::parse(&idx_bytes).unwrap(), &pack_bytes).unwrap();
    assert_eq!(pack.oid_at_offset(off_a), Some(a.oid().unwrap()));
    assert_eq!(pack.oid_at_offset(off_b), Some(b.oid().unwrap()));
    assert_eq!(pack.oid_at_offset(off_a + 1), None);
}
