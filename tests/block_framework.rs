// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The typed block framework (§4.2): every page's magic/version header
//! round-trips, type-mismatched views are rejected, and a `DATA` block's
//! row bytes and deletion flag survive a raw byte reload.

use prinbee_storage::block::{BlockType, DataBlock, Page, Pidx, HEADER_LEN};

#[test]
fn every_block_type_magic_round_trips_through_its_typed_view() {
    for block_type in [
        BlockType::Ptbl,
        BlockType::Schm,
        BlockType::Free,
        BlockType::Data,
        BlockType::Pidx,
        BlockType::Idxp,
    ] {
        let mut page = Page::zeroed(4096);
        page.init(block_type, 1, 0);
        assert_eq!(page.magic().unwrap(), block_type.magic());
        assert_eq!(page.version().unwrap(), (1, 0));
        assert_eq!(BlockType::from_magic(page.magic().unwrap()).unwrap(), block_type);
    }
}

#[test]
fn viewing_a_page_as_the_wrong_block_type_is_rejected() {
    let mut page = Page::zeroed(4096);
    page.init(BlockType::Data, 1, 0);
    assert!(Pidx::view(&mut page).is_err());
}

#[test]
fn data_block_row_bytes_and_deletion_flag_survive_a_raw_reload() {
    let mut page = Page::zeroed(4096);
    {
        let mut data = DataBlock::initialize(&mut page, 7).unwrap();
        data.set_row_bytes(b"hello, row").unwrap();
        assert!(!data.is_deleted().unwrap());
        data.mark_deleted().unwrap();
    }

    let reloaded = Page::from_bytes(page.as_bytes().to_vec());
    assert_eq!(reloaded.magic().unwrap(), BlockType::Data.magic());
    let mut reloaded = reloaded;
    let data = DataBlock::view(&mut reloaded).unwrap();
    assert_eq!(data.oid().unwrap(), 7);
    assert_eq!(data.row_bytes().unwrap(), b"hello, row");
    assert!(data.is_deleted().unwrap());
}

#[test]
fn page_header_length_leaves_room_for_at_least_one_pidx_slot() {
    assert!(HEADER_LEN < 4096);
}
