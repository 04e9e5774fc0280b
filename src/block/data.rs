// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `DATA` — user row payload (§3, §4.6).

use super::page::{HEADER_LEN, Oid, Page, Ref};
use super::types::BlockType;
use crate::error::{Error, Result};

const OFF_OID: usize = HEADER_LEN;
const OFF_FLAGS: usize = HEADER_LEN + 8;
const OFF_NEXT_IN_BUCKET: usize = HEADER_LEN + 12;
const OFF_LENGTH: usize = HEADER_LEN + 20;
const OFF_PAYLOAD: usize = HEADER_LEN + 24;

/// Row is marked deleted but its block has not been reclaimed yet (lazily
/// freed, per §7's propagation policy for `row_*` errors).
pub const FLAG_DELETED: u32 = 0x0000_0001;

/// Typed accessor for a `DATA` page.
pub struct DataBlock<'a> {
    page: &'a mut Page,
}

impl<'a> DataBlock<'a> {
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Data {
            return Err(Error::CorruptedData("expected DATA magic".into()));
        }
        Ok(Self { page })
    }

    pub fn initialize(page: &'a mut Page, oid: Oid) -> Result<Self> {
        page.init(BlockType::Data, 1, 0);
        let mut view = Self { page };
        view.set_oid(oid)?;
        Ok(view)
    }

    pub fn oid(&self) -> Result<Oid> {
        self.page.read_u64(OFF_OID)
    }

    pub fn set_oid(&mut self, value: Oid) -> Result<()> {
        self.page.write_u64(OFF_OID, value)
    }

    pub fn flags(&self) -> Result<u32> {
        self.page.read_u32(OFF_FLAGS)
    }

    pub fn set_flags(&mut self, value: u32) -> Result<()> {
        self.page.write_u32(OFF_FLAGS, value)
    }

    pub fn is_deleted(&self) -> Result<bool> {
        Ok(self.flags()? & FLAG_DELETED != 0)
    }

    pub fn mark_deleted(&mut self) -> Result<()> {
        let flags = self.flags()?;
        self.set_flags(flags | FLAG_DELETED)
    }

    /// The next row stored in the same primary-index bucket, or `0` at the
    /// end of the chain. The bucket's per-key lookup structure (§4.4) is
    /// realised here as a singly-linked, most-recently-inserted-first list.
    pub fn next_in_bucket(&self) -> Result<Ref> {
        self.page.read_u64(OFF_NEXT_IN_BUCKET)
    }

    pub fn set_next_in_bucket(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_NEXT_IN_BUCKET, value)
    }

    pub fn row_bytes(&self) -> Result<&[u8]> {
        let len = self.page.read_u32(OFF_LENGTH)? as usize;
        self.page.read_bytes(OFF_PAYLOAD, len)
    }

    pub fn set_row_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.page.write_bytes(OFF_PAYLOAD, bytes)?;
        self.page.write_u32(OFF_LENGTH, bytes.len() as u32)
    }

    /// Maximum row payload bytes a single `DATA` page can hold.
    #[must_use]
    pub fn capacity(page_size: usize) -> usize {
        page_size - OFF_PAYLOAD
    }
}
