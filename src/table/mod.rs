// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The table: ties a [`Dbfile`] to a [`Schema`] and exposes row-level
//! operations and a lazy [`Cursor`] (§4.6, §4.7).

mod cursor;
mod primary_index;
mod row;

pub use cursor::{Conditions, Cursor};
pub use row::Row;

use crate::block::{BlockType, DataBlock};
use crate::dbfile::Dbfile;
use crate::error::{Error, Result};
use crate::schema::Schema;
use std::path::Path;

/// A single table file: one primary index, one schema chain, any number of
/// rows reachable from the primary index's buckets.
pub struct Table {
    pub(super) dbfile: Dbfile,
    schema: Schema,
}

impl Table {
    /// Creates a brand new table file: allocates the `PIDX` page, writes the
    /// schema chain, and records both references in the `PTBL` header.
    pub fn create(path: impl AsRef<Path>, page_size: u32, schema: Schema) -> Result<Self> {
        let dbfile = Dbfile::create(path, page_size)?;
        let (pidx_ref, _) = dbfile.allocate_new_block(BlockType::Pidx)?;
        dbfile.with_header_mut(|ptbl| ptbl.set_primary_index_block(pidx_ref))?;

        let schema_ref = schema.write_chain(&dbfile, None)?;
        dbfile.with_header_mut(|ptbl| ptbl.set_schema_ref(schema_ref))?;

        Ok(Self { dbfile, schema })
    }

    /// Opens an existing table file, reading its schema chain back in.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dbfile = Dbfile::open(path)?;
        let schema_ref = dbfile.with_header(|ptbl| ptbl.schema_ref())?;
        let schema = Schema::read_chain(&dbfile, schema_ref)?;
        Ok(Self { dbfile, schema })
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns an empty row bound to the table's current schema (§4.6).
    #[must_use]
    pub fn row_new(&self) -> Row {
        Row::new()
    }

    fn find_in_bucket(&self, bucket: u64, key: &[u8]) -> Result<Option<u64>> {
        let mut current = primary_index::get_root(&self.dbfile, bucket)?;
        while current != 0 {
            let handle = self.dbfile.get_block(current)?;
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            let data = DataBlock::view(&mut guard)?;
            if !data.is_deleted()? {
                let row = Row::decode(data.row_bytes()?)?;
                if row.primary_key_bytes(&self.schema)? == key {
                    return Ok(Some(current));
                }
            }
            current = data.next_in_bucket()?;
        }
        Ok(None)
    }

    fn insert_new(&self, row: &Row, key: &[u8]) -> Result<()> {
        let bucket = primary_index::bucket_for(key, self.dbfile.page_size() as usize);
        let head = primary_index::get_root(&self.dbfile, bucket)?;

        let oid = self.dbfile.with_header_mut(|ptbl| ptbl.assign_oid())?;
        let (block_ref, handle) = self.dbfile.allocate_new_block(BlockType::Data)?;
        {
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            let mut data = DataBlock::initialize(&mut guard, oid)?;
            data.set_row_bytes(&row.encode())?;
            data.set_next_in_bucket(head)?;
        }
        self.dbfile.flush_block(block_ref, &handle)?;

        primary_index::set_root(&self.dbfile, bucket, block_ref)
    }

    fn replace_existing(&self, existing_ref: u64, row: &Row) -> Result<()> {
        let handle = self.dbfile.get_block(existing_ref)?;
        {
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            let mut data = DataBlock::view(&mut guard)?;
            data.set_row_bytes(&row.encode())?;
        }
        self.dbfile.flush_block(existing_ref, &handle)
    }

    /// Inserts `row`, assigning a fresh OID. Fails with `RowAlreadyExists`
    /// if a live row with the same primary key is already stored (§4.6).
    ///
    /// Secondary, expiration, and tree indexes are not populated by this
    /// implementation; only the primary index and row storage are wired up.
    pub fn row_insert(&self, row: &Row) -> Result<bool> {
        let key = row.primary_key_bytes(&self.schema)?;
        let bucket = primary_index::bucket_for(&key, self.dbfile.page_size() as usize);
        if self.find_in_bucket(bucket, &key)?.is_some() {
            return Err(Error::RowAlreadyExists);
        }
        self.insert_new(row, &key)?;
        Ok(true)
    }

    /// Updates `row` in place. Fails with `RowNotFound` if no live row with
    /// the same primary key exists.
    pub fn row_update(&self, row: &Row) -> Result<bool> {
        let key = row.primary_key_bytes(&self.schema)?;
        let bucket = primary_index::bucket_for(&key, self.dbfile.page_size() as usize);
        match self.find_in_bucket(bucket, &key)? {
            Some(existing_ref) => {
                self.replace_existing(existing_ref, row)?;
                Ok(true)
            }
            None => Err(Error::RowNotFound),
        }
    }

    /// Insert-or-update by primary-key presence (§4.6).
    pub fn row_commit(&self, row: &Row) -> Result<bool> {
        let key = row.primary_key_bytes(&self.schema)?;
        let bucket = primary_index::bucket_for(&key, self.dbfile.page_size() as usize);
        match self.find_in_bucket(bucket, &key)? {
            Some(existing_ref) => self.replace_existing(existing_ref, row).map(|()| true),
            None => self.insert_new(row, &key).map(|()| true),
        }
    }

    /// Marks the row with the given primary key deleted (lazily: its `DATA`
    /// block is not reclaimed here, matching §7's note that on-disk state
    /// may briefly contain an unreferenced block).
    pub fn row_delete(&self, row: &Row) -> Result<bool> {
        let key = row.primary_key_bytes(&self.schema)?;
        let bucket = primary_index::bucket_for(&key, self.dbfile.page_size() as usize);
        match self.find_in_bucket(bucket, &key)? {
            Some(existing_ref) => {
                let handle = self.dbfile.get_block(existing_ref)?;
                {
                    #[allow(clippy::unwrap_used)]
                    let mut guard = handle.lock().unwrap();
                    DataBlock::view(&mut guard)?.mark_deleted()?;
                }
                self.dbfile.flush_block(existing_ref, &handle)?;
                self.dbfile.with_header_mut(|ptbl| ptbl.increment_deleted_rows())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns a cursor lazily yielding rows matching `conditions` (§4.7).
    pub fn row_select(&self, conditions: Conditions) -> Result<Cursor<'_>> {
        Cursor::new(self, conditions)
    }
}
