// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `PIDX` — the primary index page (one per table), §3, §4.4.
//!
//! The table cuts a search by `N = page_size / sizeof(ref)` buckets. Bucket
//! `0` is stored in `PTBL.primary_index_reference_zero` instead of in this
//! page, because the page's own 8-byte header occupies the space bucket 0's
//! slot would otherwise use; storing it in `PTBL` keeps all `N` buckets
//! usable instead of wasting one. This page holds buckets `1..N` in array
//! positions `0..N-1`.

use super::page::{HEADER_LEN, Page, Ref};
use super::types::BlockType;
use crate::error::{Error, Result};

/// Total bucket count `N` for a page of `page_size` bytes.
#[must_use]
pub fn bucket_count(page_size: usize) -> u64 {
    (page_size / 8) as u64
}

/// Typed accessor for a `PIDX` page.
pub struct Pidx<'a> {
    page: &'a mut Page,
}

impl<'a> Pidx<'a> {
    pub fn view(page: &'a mut Page) -> Result<Self> {
        let magic = page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Pidx {
            return Err(Error::CorruptedData("expected PIDX magic".into()));
        }
        Ok(Self { page })
    }

    pub fn initialize(page: &'a mut Page) -> Result<Self> {
        page.init(BlockType::Pidx, 1, 0);
        Ok(Self { page })
    }

    fn slot_offset(&self, bucket: u64) -> Result<usize> {
        if bucket == 0 {
            return Err(Error::LogicError(
                "bucket 0 lives in PTBL.primary_index_reference_zero, not PIDX".into(),
            ));
        }
        let n = bucket_count(self.page.len());
        if bucket >= n {
            return Err(Error::OutOfRange(format!("bucket {bucket} >= N ({n})")));
        }
        Ok(HEADER_LEN + (bucket as usize - 1) * 8)
    }

    /// Returns the root reference stored for `bucket` (1..N). A null (`0`)
    /// reference means the bucket is empty.
    pub fn get(&self, bucket: u64) -> Result<Ref> {
        let offset = self.slot_offset(bucket)?;
        self.page.read_u64(offset)
    }

    /// Writes the root reference for `bucket` (1..N).
    pub fn set(&mut self, bucket: u64, value: Ref) -> Result<()> {
        let offset = self.slot_offset(bucket)?;
        self.page.write_u64(offset, value)
    }
}
