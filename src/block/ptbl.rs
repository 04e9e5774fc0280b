// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `PTBL` — the file/table header, always at offset 0 (§3).

use super::page::{HEADER_LEN, Oid, Page, Ref};
use super::types::BlockType;
use super::value::Value;
use crate::error::{Error, Result};

/// Number of OIDs the header can cache for reuse before falling back to
/// `last_oid`. This is an inline bounded stack, not a linked list on disk,
/// and a small inline cache avoids an extra block type for what is, in
/// practice, a short-lived list (deletes and inserts of the same table tend
/// to cluster). If the cache overflows, the dropped OID is simply never
/// reused, which costs density but not correctness.
pub const FREE_OID_CACHE_CAPACITY: usize = 32;

const OFF_BLOCK_SIZE: usize = HEADER_LEN;
const OFF_BLOOM_FILTER_FLAGS: usize = HEADER_LEN + 4;
const OFF_FIRST_FREE_BLOCK: usize = HEADER_LEN + 8;
const OFF_SCHEMA_REF: usize = HEADER_LEN + 16;
const OFF_LAST_OID: usize = HEADER_LEN + 24;
const OFF_PRIMARY_INDEX_BLOCK: usize = HEADER_LEN + 32;
const OFF_PRIMARY_INDEX_REFERENCE_ZERO: usize = HEADER_LEN + 40;
const OFF_EXPIRATION_INDEX_BLOCK: usize = HEADER_LEN + 48;
const OFF_SECONDARY_INDEX_BLOCK: usize = HEADER_LEN + 56;
const OFF_TREE_INDEX_BLOCK: usize = HEADER_LEN + 64;
const OFF_INDIRECT_INDEX: usize = HEADER_LEN + 72;
const OFF_DELETED_ROWS: usize = HEADER_LEN + 80;
const OFF_FREE_OID_COUNT: usize = HEADER_LEN + 88;
const OFF_FREE_OID_SLOTS: usize = HEADER_LEN + 92;

/// Total payload size in bytes, for callers sizing the smallest legal page.
pub const PAYLOAD_LEN: usize = (OFF_FREE_OID_SLOTS - HEADER_LEN) + FREE_OID_CACHE_CAPACITY * 8;

/// Typed accessor for the `PTBL` page.
pub struct Ptbl<'a> {
    page: &'a mut Page,
}

impl<'a> Ptbl<'a> {
    /// Borrows `page` as a `PTBL` view, checking its magic.
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Ptbl {
            return Err(Error::CorruptedData("expected PTBL magic".into()));
        }
        Ok(Self { page })
    }

    /// Initializes a freshly zeroed page as a brand new `PTBL` header.
    pub fn initialize(page: &'a mut Page, block_size: u32) -> Result<Self> {
        page.init(BlockType::Ptbl, 1, 0);
        let mut view = Self { page };
        view.set_block_size(block_size)?;
        Ok(view)
    }

    pub fn block_size(&self) -> Result<u32> {
        self.page.read_u32(OFF_BLOCK_SIZE)
    }

    pub fn set_block_size(&mut self, value: u32) -> Result<()> {
        self.page.write_u32(OFF_BLOCK_SIZE, value)
    }

    pub fn bloom_filter_flags(&self) -> Result<u32> {
        self.page.read_u32(OFF_BLOOM_FILTER_FLAGS)
    }

    pub fn set_bloom_filter_flags(&mut self, value: u32) -> Result<()> {
        self.page.write_u32(OFF_BLOOM_FILTER_FLAGS, value)
    }

    pub fn first_free_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_FIRST_FREE_BLOCK)
    }

    pub fn set_first_free_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_FIRST_FREE_BLOCK, value)
    }

    pub fn schema_ref(&self) -> Result<Ref> {
        self.page.read_u64(OFF_SCHEMA_REF)
    }

    pub fn set_schema_ref(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_SCHEMA_REF, value)
    }

    pub fn last_oid(&self) -> Result<Oid> {
        self.page.read_u64(OFF_LAST_OID)
    }

    pub fn set_last_oid(&mut self, value: Oid) -> Result<()> {
        self.page.write_u64(OFF_LAST_OID, value)
    }

    pub fn primary_index_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_PRIMARY_INDEX_BLOCK)
    }

    pub fn set_primary_index_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_PRIMARY_INDEX_BLOCK, value)
    }

    pub fn primary_index_reference_zero(&self) -> Result<Ref> {
        self.page.read_u64(OFF_PRIMARY_INDEX_REFERENCE_ZERO)
    }

    pub fn set_primary_index_reference_zero(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_PRIMARY_INDEX_REFERENCE_ZERO, value)
    }

    pub fn expiration_index_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_EXPIRATION_INDEX_BLOCK)
    }

    pub fn set_expiration_index_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_EXPIRATION_INDEX_BLOCK, value)
    }

    pub fn secondary_index_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_SECONDARY_INDEX_BLOCK)
    }

    pub fn set_secondary_index_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_SECONDARY_INDEX_BLOCK, value)
    }

    pub fn tree_index_block(&self) -> Result<Ref> {
        self.page.read_u64(OFF_TREE_INDEX_BLOCK)
    }

    pub fn set_tree_index_block(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_TREE_INDEX_BLOCK, value)
    }

    /// Reserved indirection pointer named in the data model's `PTBL` field
    /// list (§3); no current operation interprets it, so it round-trips
    /// as an opaque reference the same way `bloom_filter_flags` does.
    pub fn indirect_index(&self) -> Result<Ref> {
        self.page.read_u64(OFF_INDIRECT_INDEX)
    }

    pub fn set_indirect_index(&mut self, value: Ref) -> Result<()> {
        self.page.write_u64(OFF_INDIRECT_INDEX, value)
    }

    pub fn deleted_rows(&self) -> Result<u64> {
        self.page.read_u64(OFF_DELETED_ROWS)
    }

    pub fn increment_deleted_rows(&mut self) -> Result<()> {
        let current = self.deleted_rows()?;
        self.page.write_u64(OFF_DELETED_ROWS, current + 1)
    }

    fn free_oid_count(&self) -> Result<u16> {
        self.page.read_u16(OFF_FREE_OID_COUNT)
    }

    /// Pops a reusable OID off the inline free-OID cache, if any.
    pub fn pop_free_oid(&mut self) -> Result<Option<Oid>> {
        let count = self.free_oid_count()?;
        if count == 0 {
            return Ok(None);
        }
        let index = count as usize - 1;
        let oid = self.page.read_u64(OFF_FREE_OID_SLOTS + index * 8)?;
        self.page.write_u16(OFF_FREE_OID_COUNT, count - 1)?;
        Ok(Some(oid))
    }

    /// Pushes a newly-freed OID onto the inline free-OID cache. Silently
    /// drops it if the cache is already full (see [`FREE_OID_CACHE_CAPACITY`]).
    pub fn push_free_oid(&mut self, oid: Oid) -> Result<()> {
        let count = self.free_oid_count()?;
        if count as usize >= FREE_OID_CACHE_CAPACITY {
            return Ok(());
        }
        self.page
            .write_u64(OFF_FREE_OID_SLOTS + count as usize * 8, oid)?;
        self.page.write_u16(OFF_FREE_OID_COUNT, count + 1)
    }

    /// Assigns the next OID: from the free-OID cache if non-empty,
    /// otherwise `last_oid` post-incremented (§4.6).
    pub fn assign_oid(&mut self) -> Result<Oid> {
        if let Some(oid) = self.pop_free_oid()? {
            return Ok(oid);
        }
        let next = self.last_oid()?;
        self.set_last_oid(next + 1)?;
        Ok(next)
    }

    /// Diagnostic-only field accessor (§9: string lookup never happens on
    /// the hot path; this is for inspection tools like `prinbee-journal`'s
    /// table-side counterpart).
    pub fn field(&self, name: &str) -> Result<Value> {
        match name {
            "block_size" => Ok(Value::U32(self.block_size()?)),
            "bloom_filter_flags" => Ok(Value::U32(self.bloom_filter_flags()?)),
            "first_free_block" => Ok(Value::U64(self.first_free_block()?)),
            "schema_ref" => Ok(Value::U64(self.schema_ref()?)),
            "last_oid" => Ok(Value::U64(self.last_oid()?)),
            "primary_index_block" => Ok(Value::U64(self.primary_index_block()?)),
            "primary_index_reference_zero" => Ok(Value::U64(self.primary_index_reference_zero()?)),
            "expiration_index_block" => Ok(Value::U64(self.expiration_index_block()?)),
            "secondary_index_block" => Ok(Value::U64(self.secondary_index_block()?)),
            "tree_index_block" => Ok(Value::U64(self.tree_index_block()?)),
            "indirect_index" => Ok(Value::U64(self.indirect_index()?)),
            "deleted_rows" => Ok(Value::U64(self.deleted_rows()?)),
            other => Err(Error::FieldNotFound(other.to_string())),
        }
    }
}

/// Offset of the payload area, exposed for tests that want to confirm the
/// header never writes past its declared `PAYLOAD_LEN`.
pub const PAYLOAD_START: usize = HEADER_LEN;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_and_roundtrip_fields() {
        let mut page = Page::zeroed(4096);
        let mut ptbl = Ptbl::initialize(&mut page, 4096).unwrap();
        assert_eq!(ptbl.block_size().unwrap(), 4096);

        ptbl.set_schema_ref(4096).unwrap();
        ptbl.set_last_oid(7).unwrap();
        ptbl.set_primary_index_reference_zero(0x2000).unwrap();
        ptbl.set_indirect_index(0x3000).unwrap();

        assert_eq!(ptbl.schema_ref().unwrap(), 4096);
        assert_eq!(ptbl.last_oid().unwrap(), 7);
        assert_eq!(ptbl.primary_index_reference_zero().unwrap(), 0x2000);
        assert_eq!(ptbl.indirect_index().unwrap(), 0x3000);
        assert_eq!(ptbl.field("indirect_index").unwrap(), Value::U64(0x3000));
    }

    #[test]
    fn oid_assignment_prefers_free_list() {
        let mut page = Page::zeroed(4096);
        let mut ptbl = Ptbl::initialize(&mut page, 4096).unwrap();
        ptbl.set_last_oid(10).unwrap();

        assert_eq!(ptbl.assign_oid().unwrap(), 10);
        assert_eq!(ptbl.last_oid().unwrap(), 11);

        ptbl.push_free_oid(3).unwrap();
        assert_eq!(ptbl.assign_oid().unwrap(), 3);
        assert_eq!(ptbl.last_oid().unwrap(), 11);
    }

    #[test]
    fn payload_fits_smallest_legal_page() {
        assert!(PAYLOAD_START + PAYLOAD_LEN <= 4096);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut page = Page::zeroed(4096);
        page.init(BlockType::Free, 1, 0);
        assert!(Ptbl::view(&mut page).is_err());
    }
}
