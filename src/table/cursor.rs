// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `Cursor`: a finite, forward-only, restartable lazy sequence of rows
//! matching a [`Conditions`] object, walking the primary index bucket by
//! bucket (§4.7).

use super::row::Row;
use super::Table;
use crate::block::{DataBlock, Ref};
use crate::error::Result;
use crate::schema::ColumnId;

/// An equality filter over column values, `AND`ed together. Rows not
/// matching every condition are skipped without being yielded.
#[derive(Clone, Debug, Default)]
pub struct Conditions {
    equals: Vec<(ColumnId, Vec<u8>)>,
}

impl Conditions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_equals(mut self, column: ColumnId, value: impl Into<Vec<u8>>) -> Self {
        self.equals.push((column, value.into()));
        self
    }

    fn matches(&self, row: &Row) -> bool {
        self.equals.iter().all(|(column, value)| row.get(*column) == Some(value.as_slice()))
    }
}

/// Walks every bucket of the primary index in order, then every row within
/// a bucket's singly-linked chain, yielding rows that satisfy `conditions`.
/// Cursors never materialise the full result set: each call to [`Self::next`]
/// reads at most one `DATA` page ahead.
pub struct Cursor<'a> {
    table: &'a Table,
    conditions: Conditions,
    bucket_count: u64,
    next_bucket: u64,
    next_in_chain: Ref,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(table: &'a Table, conditions: Conditions) -> Result<Self> {
        let bucket_count = super::primary_index::bucket_count(table.dbfile.page_size() as usize);
        let mut cursor = Self {
            table,
            conditions,
            bucket_count,
            next_bucket: 0,
            next_in_chain: 0,
        };
        cursor.enter_next_nonempty_bucket()?;
        Ok(cursor)
    }

    /// Resets iteration back to the first bucket (§4.7: "restartable").
    pub fn rewind(&mut self) -> Result<()> {
        self.next_bucket = 0;
        self.next_in_chain = 0;
        self.enter_next_nonempty_bucket()
    }

    fn enter_next_nonempty_bucket(&mut self) -> Result<()> {
        while self.next_in_chain == 0 && self.next_bucket < self.bucket_count {
            self.next_in_chain = super::primary_index::get_root(&self.table.dbfile, self.next_bucket)?;
            self.next_bucket += 1;
        }
        Ok(())
    }

    /// Returns the next matching row, or `None` once every bucket has been
    /// exhausted.
    pub fn next(&mut self) -> Result<Option<Row>> {
        loop {
            if self.next_in_chain == 0 {
                return Ok(None);
            }

            let block_ref = self.next_in_chain;
            let handle = self.table.dbfile.get_block(block_ref)?;
            let (row, next_in_bucket) = {
                #[allow(clippy::unwrap_used)]
                let mut guard = handle.lock().unwrap();
                let data = DataBlock::view(&mut guard)?;
                let row = if data.is_deleted()? { None } else { Some(Row::decode(data.row_bytes()?)?) };
                (row, data.next_in_bucket()?)
            };

            self.next_in_chain = next_in_bucket;
            if self.next_in_chain == 0 {
                self.enter_next_nonempty_bucket()?;
            }

            if let Some(row) = row {
                if self.conditions.matches(&row) {
                    return Ok(Some(row));
                }
            }
        }
    }
}
