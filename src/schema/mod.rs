// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The schema: a logical description of a table, compiled into the SCHM
//! block chain (§3, §4.5).
//!
//! `schema_column → schema_table` and `schema_sort_column → schema_table` are
//! modeled as plain `Vec` indices owned by [`Schema`] rather than pointers,
//! so there is no cyclic graph to unwind on drop (§9's "Schema
//! back-references" note).

mod codec;

use crate::block::{Ref, Schm};
use crate::dbfile::Dbfile;
use crate::error::{Error, Result};

/// Identifies a column for the lifetime of the schema chain it was defined
/// in. Assigned once at creation and never reused or reassigned, so rows
/// persisted under an older schema version keep their meaning (§3).
pub type ColumnId = u16;

/// The storage model a table was declared with.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Model {
    Content,
    Data,
    Log,
    Queue,
    Sequential,
    Session,
    Tree,
}

/// The wire/on-disk type of a column's value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Boolean,
    String,
    Binary,
    Bigint,
    Ubigint,
    Timestamp,
}

/// A single column of a [`Schema`].
#[derive(Clone, Debug)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    pub column_type: ColumnType,
    pub flags: u32,
    pub default: Option<Vec<u8>>,
    pub min: Option<Vec<u8>>,
    pub max: Option<Vec<u8>>,
    pub length: Option<u32>,
    pub validation_script: Option<String>,
    pub description: Option<String>,
}

/// One column in a [`SecondaryIndex`]'s sort order.
#[derive(Clone, Debug)]
pub struct SortColumn {
    pub column_id: ColumnId,
    pub ascending: bool,
    pub nulls_first: bool,
    pub key_expression_script: Option<String>,
}

/// A secondary index: a named, ordered key over a subset of columns, backed
/// by `IDXP` pointer lists (§3).
#[derive(Clone, Debug)]
pub struct SecondaryIndex {
    pub name: String,
    pub flags: u32,
    pub sort_columns: Vec<SortColumn>,
    pub filter_script: Option<String>,
}

/// A table's schema: name, model, columns, primary key, and secondary
/// indexes. Schemas are versioned; a schema update produces a new version
/// rather than mutating one in place.
#[derive(Clone, Debug)]
pub struct Schema {
    pub table_name: String,
    pub model: Model,
    pub replication: String,
    pub version: u32,
    pub columns: Vec<Column>,
    pub primary_key: Vec<ColumnId>,
    pub secondary_indexes: Vec<SecondaryIndex>,
}

impl Schema {
    #[must_use]
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reads an entire schema chain starting at `first_block`, concatenating
    /// each `SCHM` block's payload until `next_schema_block == 0` (§4.5).
    pub fn read_chain(dbfile: &Dbfile, first_block: Ref) -> Result<Self> {
        if first_block == 0 {
            return Err(Error::SchemaNotFound);
        }
        let mut buffer = Vec::new();
        let mut current = first_block;
        loop {
            let handle = dbfile.get_block(current)?;
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            let schm = Schm::view(&mut guard)?;
            buffer.extend_from_slice(schm.payload()?);
            let next = schm.next_schema_block()?;
            drop(guard);
            if next == 0 {
                break;
            }
            current = next;
        }
        let mut cursor = std::io::Cursor::new(buffer);
        codec::decode_schema(&mut cursor)
    }

    /// Writes this schema into a chain of `SCHM` blocks starting at
    /// `first_block` if given (reusing/extending/truncating it), or
    /// allocating a fresh chain otherwise. Returns the chain's first block
    /// reference.
    pub fn write_chain(&self, dbfile: &Dbfile, first_block: Option<Ref>) -> Result<Ref> {
        let encoded = codec::encode_schema(self);
        let capacity = Schm::capacity(dbfile.page_size() as usize);

        let mut existing: Vec<Ref> = Vec::new();
        if let Some(mut r) = first_block {
            while r != 0 {
                existing.push(r);
                let handle = dbfile.get_block(r)?;
                #[allow(clippy::unwrap_used)]
                let mut guard = handle.lock().unwrap();
                let schm = Schm::view(&mut guard)?;
                r = schm.next_schema_block()?;
            }
        }

        let chunks: Vec<&[u8]> = encoded.chunks(capacity).collect();
        let chunks: Vec<&[u8]> = if chunks.is_empty() { vec![&[][..]] } else { chunks };

        let mut refs = Vec::with_capacity(chunks.len());
        for (i, _) in chunks.iter().enumerate() {
            if let Some(&r) = existing.get(i) {
                refs.push(r);
            } else {
                let (r, _) = dbfile.allocate_new_block(crate::block::BlockType::Schm)?;
                refs.push(r);
            }
        }

        // Anything left over from a shrinking schema goes back to the free list.
        for &stale in &existing[refs.len()..] {
            dbfile.free_block(stale)?;
        }

        for (i, chunk) in chunks.iter().enumerate() {
            let handle = dbfile.get_block(refs[i])?;
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            let next = refs.get(i + 1).copied().unwrap_or(0);
            let mut schm = Schm::initialize(&mut guard)?;
            schm.set_payload(chunk)?;
            schm.set_next_schema_block(next)?;
            drop(guard);
            dbfile.flush_block(refs[i], &handle)?;
        }

        Ok(refs[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema {
            table_name: "users".into(),
            model: Model::Content,
            replication: "none".into(),
            version: 1,
            columns: vec![
                Column {
                    id: 1,
                    name: "id".into(),
                    column_type: ColumnType::Uint64,
                    flags: 0,
                    default: None,
                    min: None,
                    max: None,
                    length: None,
                    validation_script: None,
                    description: None,
                },
                Column {
                    id: 2,
                    name: "email".into(),
                    column_type: ColumnType::String,
                    flags: 0,
                    default: None,
                    min: None,
                    max: None,
                    length: Some(255),
                    validation_script: None,
                    description: Some("login address".into()),
                },
            ],
            primary_key: vec![1],
            secondary_indexes: vec![SecondaryIndex {
                name: "by_email".into(),
                flags: 0,
                sort_columns: vec![SortColumn {
                    column_id: 2,
                    ascending: true,
                    nulls_first: false,
                    key_expression_script: None,
                }],
                filter_script: None,
            }],
        }
    }

    #[test]
    fn write_then_read_chain_small_schema() {
        let dir = tempfile::tempdir().unwrap();
        let dbfile = Dbfile::create(dir.path().join("t.db"), 4096).unwrap();
        let schema = sample_schema();

        let first = schema.write_chain(&dbfile, None).unwrap();
        let read_back = Schema::read_chain(&dbfile, first).unwrap();

        assert_eq!(read_back.table_name, "users");
        assert_eq!(read_back.columns.len(), 2);
        assert_eq!(read_back.primary_key, vec![1]);
        assert_eq!(read_back.secondary_indexes.len(), 1);
    }

    #[test]
    fn write_chain_spans_multiple_blocks_for_large_schema() {
        let dir = tempfile::tempdir().unwrap();
        let dbfile = Dbfile::create(dir.path().join("t.db"), 4096).unwrap();
        let mut schema = sample_schema();
        for i in 3..300u16 {
            schema.columns.push(Column {
                id: i,
                name: format!("col_{i}"),
                column_type: ColumnType::Int32,
                flags: 0,
                default: None,
                min: None,
                max: None,
                length: None,
                validation_script: None,
                description: None,
            });
        }

        let first = schema.write_chain(&dbfile, None).unwrap();
        let read_back = Schema::read_chain(&dbfile, first).unwrap();
        assert_eq!(read_back.columns.len(), schema.columns.len());
    }

    #[test]
    fn read_chain_rejects_null_reference() {
        let dir = tempfile::tempdir().unwrap();
        let dbfile = Dbfile::create(dir.path().join("t.db"), 4096).unwrap();
        assert!(matches!(Schema::read_chain(&dbfile, 0), Err(Error::SchemaNotFound)));
    }
}
