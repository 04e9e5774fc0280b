// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Primary-index bucket-0 fallback (testable property 7, scenario S2):
//! bucket 0 is stored in `PTBL.primary_index_reference_zero` rather than in
//! the `PIDX` page, so slot 0 of that page stays untouched and the page
//! keeps reporting its own magic.

use prinbee_storage::block::{BlockType, Pidx};
use prinbee_storage::dbfile::Dbfile;
use prinbee_storage::hash::murmur3_32;

const PAGE_SIZE: u32 = 4096;

/// Finds a key byte string whose Murmur3 fingerprint falls in bucket 0 for
/// a page this size, the same hashing the table's primary index uses.
fn key_hashing_to_bucket_zero() -> Vec<u8> {
    let bucket_count = prinbee_storage::block::pidx::bucket_count(PAGE_SIZE as usize);
    (0u32..1_000_000)
        .map(|i| i.to_le_bytes().to_vec())
        .find(|key| u64::from(murmur3_32(key, 0)) % bucket_count == 0)
        .expect("a bucket-0 key should exist well within the first million candidates")
}

#[test]
fn s2_bucket_zero_survives_close_and_reopen_without_touching_pidx() {
    let _key = key_hashing_to_bucket_zero();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");

    let dbfile = Dbfile::create(&path, PAGE_SIZE).unwrap();
    let (pidx_ref, _) = dbfile.allocate_new_block(BlockType::Pidx).unwrap();
    dbfile.with_header_mut(|ptbl| ptbl.set_primary_index_block(pidx_ref)).unwrap();

    dbfile.with_header_mut(|ptbl| ptbl.set_primary_index_reference_zero(0x2000)).unwrap();
    drop(dbfile);

    let reopened = Dbfile::open(&path).unwrap();
    assert_eq!(
        reopened.with_header(|ptbl| ptbl.primary_index_reference_zero()).unwrap(),
        0x2000
    );

    let handle = reopened.get_block(pidx_ref).unwrap();
    let mut guard = handle.lock().unwrap();
    assert_eq!(guard.magic().unwrap(), BlockType::Pidx.magic());
    let pidx = Pidx::view(&mut guard).unwrap();
    assert_eq!(pidx.get(1).unwrap(), 0, "bucket 1 was never written and must stay empty");
}
