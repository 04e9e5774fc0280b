// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `SCHM` — one segment of a schema chain (§3, §4.5).

use super::page::{HEADER_LEN, Page, Ref};
use super::types::BlockType;
use crate::error::{Error, Result};

const OFF_SIZE_IN_BYTES: usize = HEADER_LEN;
const OFF_NEXT_SCHEMA_BLOCK: usize = HEADER_LEN + 8;
const OFF_PAYLOAD: usize = HEADER_LEN + 16;

/// Typed accessor for a `SCHM` page.
pub struct Schm<'a> {
    page: &'a mut Page,
}

impl<'a> Schm<'a> {
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Schm {
            return Err(Error::CorruptedData("expected SCHM magic".into()));
        }
        Ok(Self { page })
    }

    pub fn initialize(page: &'a mut Page) -> Result<Self> {
        page.init(BlockType::Schm, 1, 0);
        Ok(Self { page })
    }

    /// Maximum payload bytes a single `SCHM` block can hold.
    #[must_use]
    pub fn capacity(page_size: usize) -> usize {
        page_size - OFF_PAYLOAD
    }

    pub fn size_in_bytes(&self) -> Result<u32> {
        self.page.read_u32(OFF_SIZE_IN_BYTES)
    }

    pub fn set_size_in_bytes(&mut self, value: u32) -> Result<()> {
        self.page.write_u32(OFF_SIZE_IN_BYTES, value)
    }

    pub fn next_schema_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_NEXT_SCHEMA_BLOCK)
    }

    pub fn set_next_schema_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_NEXT_SCHEMA_BLOCK, value)
    }

    pub fn payload(&self) -> Result<&[u8]> {
        let len = self.size_in_bytes()? as usize;
        self.page.read_bytes(OFF_PAYLOAD, len)
    }

    pub fn set_payload(&mut self, bytes: &[u8]) -> Result<()> {
        self.page.write_bytes(OFF_PAYLOAD, bytes)?;
        self.set_size_in_bytes(bytes.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_payload() {
        let mut page = Page::zeroed(4096);
        let mut schm = Schm::initialize(&mut page).unwrap();
        schm.set_payload(b"hello schema").unwrap();
        schm.set_next_schema_block(4096).unwrap();

        assert_eq!(schm.payload().unwrap(), b"hello schema");
        assert_eq!(schm.next_schema_block().unwrap(), 4096);
    }

    #[test]
    fn terminal_block_has_zero_next() {
        let mut page = Page::zeroed(4096);
        let schm = Schm::initialize(&mut page).unwrap();
        assert_eq!(schm.next_schema_block().unwrap(), 0);
    }
}
