// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `IDXP` — index-pointer list for non-unique secondary matches (§3).

use super::page::{HEADER_LEN, Oid, Page};
use super::types::BlockType;
use crate::error::{Error, Result};

const OFF_COUNT: usize = HEADER_LEN;
const OFF_OIDS: usize = HEADER_LEN + 4;

/// Typed accessor for an `IDXP` page.
pub struct Idxp<'a> {
    page: &'a mut Page,
}

impl<'a> Idxp<'a> {
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Idxp {
            return Err(Error::CorruptedData("expected IDXP magic".into()));
        }
        Ok(Self { page })
    }

    pub fn initialize(page: &'a mut Page) -> Result<Self> {
        page.init(BlockType::Idxp, 1, 0);
        Ok(Self { page })
    }

    /// Maximum number of OIDs a single `IDXP` page can hold.
    #[must_use]
    pub fn capacity(page_size: usize) -> usize {
        (page_size - OFF_OIDS) / 8
    }

    pub fn count(&self) -> Result<u32> {
        self.page.read_u32(OFF_COUNT)
    }

    pub fn oids(&self) -> Result<Vec<Oid>> {
        let count = self.count()? as usize;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(self.page.read_u64(OFF_OIDS + i * 8)?);
        }
        Ok(out)
    }

    pub fn push(&mut self, oid: Oid) -> Result<()> {
        let count = self.count()? as usize;
        if count >= Self::capacity(self.page.len()) {
            return Err(Error::Full);
        }
        self.page.write_u64(OFF_OIDS + count * 8, oid)?;
        self.page.write_u32(OFF_COUNT, count as u32 + 1)
    }

    /// Removes the first occurrence of `oid`, compacting the remainder down.
    /// Returns `true` if an entry was removed.
    pub fn remove(&mut self, oid: Oid) -> Result<bool> {
        let mut oids = self.oids()?;
        let Some(pos) = oids.iter().position(|&o| o == oid) else {
            return Ok(false);
        };
        oids.remove(pos);
        for (i, o) in oids.iter().enumerate() {
            self.page.write_u64(OFF_OIDS + i * 8, *o)?;
        }
        self.page.write_u32(OFF_COUNT, oids.len() as u32)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_list() {
        let mut page = Page::zeroed(4096);
        let mut idxp = Idxp::initialize(&mut page).unwrap();
        idxp.push(1).unwrap();
        idxp.push(2).unwrap();
        idxp.push(3).unwrap();
        assert_eq!(idxp.oids().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn remove_compacts() {
        let mut page = Page::zeroed(4096);
        let mut idxp = Idxp::initialize(&mut page).unwrap();
        idxp.push(1).unwrap();
        idxp.push(2).unwrap();
        idxp.push(3).unwrap();
        assert!(idxp.remove(2).unwrap());
        assert_eq!(idxp.oids().unwrap(), vec![1, 3]);
        assert!(!idxp.remove(42).unwrap());
    }

    #[test]
    fn full_list_errors() {
        let mut page = Page::zeroed(4096);
        let mut idxp = Idxp::initialize(&mut page).unwrap();
        let capacity = Idxp::capacity(4096);
        for oid in 0..capacity as u64 {
            idxp.push(oid).unwrap();
        }
        assert!(matches!(idxp.push(9999), Err(Error::Full)));
    }
}
