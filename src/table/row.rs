// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A row: a sparse map of column id to raw column bytes, encoded the same
//! length-prefixed way as [`crate::schema::Schema`] (§4.6).

use crate::error::{Error, Result};
use crate::schema::{ColumnId, Schema};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// An in-memory row, independent of any particular schema version until
/// it's validated against one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row {
    values: BTreeMap<ColumnId, Vec<u8>>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: ColumnId, bytes: impl Into<Vec<u8>>) {
        self.values.insert(column, bytes.into());
    }

    #[must_use]
    pub fn get(&self, column: ColumnId) -> Option<&[u8]> {
        self.values.get(&column).map(Vec::as_slice)
    }

    /// Concatenates the primary-key columns' bytes, each length-prefixed so
    /// the boundaries stay unambiguous; this is what gets fingerprinted for
    /// bucketing (§4.4) and compared for uniqueness.
    pub fn primary_key_bytes(&self, schema: &Schema) -> Result<Vec<u8>> {
        if schema.primary_key.is_empty() {
            return Err(Error::InvalidEntity("schema declares no primary key".into()));
        }
        let mut out = Vec::new();
        for &column in &schema.primary_key {
            let bytes = self
                .get(column)
                .ok_or_else(|| Error::InvalidParameter(format!("row missing primary key column {column}")))?;
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }

    pub fn encode_into<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u16::<LittleEndian>(self.values.len() as u16)?;
        for (id, bytes) in &self.values {
            w.write_u16::<LittleEndian>(*id)?;
            w.write_u32::<LittleEndian>(bytes.len() as u32)?;
            w.write_all(bytes)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        #[allow(clippy::expect_used)]
        self.encode_into(&mut buffer).expect("writing to a Vec cannot fail");
        buffer
    }

    pub fn decode_from<R: Read>(r: &mut R) -> Result<Self> {
        let count = r.read_u16::<LittleEndian>()? as usize;
        let mut values = BTreeMap::new();
        for _ in 0..count {
            let id = r.read_u16::<LittleEndian>()?;
            let len = r.read_u32::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            values.insert(id, bytes);
        }
        Ok(Self { values })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::decode_from(&mut cursor)
    }
}
