// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `FREE` — a block on the free list (§3, §4.3).

use super::page::{HEADER_LEN, Page, Ref};
use super::types::BlockType;
use crate::error::{Error, Result};

const OFF_NEXT_FREE_BLOCK: usize = HEADER_LEN;

/// Typed accessor for a `FREE` page.
pub struct Free<'a> {
    page: &'a mut Page,
}

impl<'a> Free<'a> {
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Free {
            return Err(Error::CorruptedData("expected FREE magic".into()));
        }
        Ok(Self { page })
    }

    /// Overwrites a page's magic with `FREE` and wires it into the free
    /// list's head (§4.3's "Free-block" contract).
    pub fn initialize(page: &'a mut Page, next_free_block: Ref) -> Result<Self> {
        page.init(BlockType::Free, 1, 0);
        let mut view = Self { page };
        view.set_next_free_block(next_free_block)?;
        Ok(view)
    }

    pub fn next_free_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_NEXT_FREE_BLOCK)
    }

    pub fn set_next_free_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_NEXT_FREE_BLOCK, value)
    }
}
