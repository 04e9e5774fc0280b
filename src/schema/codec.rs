// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary encoding for [`super::Schema`], following the block framework's
//! length-prefixed field convention (§4.2) rather than a general-purpose
//! serialization format: every variable-length field is a `u32` byte count
//! followed by its bytes, so the decoder never has to guess.

use super::{Column, ColumnType, Model, Schema, SecondaryIndex, SortColumn};
use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<()> {
    w.write_u32::<LittleEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_str<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::CorruptedData(format!("schema string not utf-8: {e}")))
}

fn write_opt_str<W: Write>(w: &mut W, s: &Option<String>) -> Result<()> {
    match s {
        Some(s) => {
            w.write_u8(1)?;
            write_str(w, s)
        }
        None => w.write_u8(0).map_err(Error::from),
    }
}

fn read_opt_str<R: Read>(r: &mut R) -> Result<Option<String>> {
    if r.read_u8()? == 0 {
        Ok(None)
    } else {
        Ok(Some(read_str(r)?))
    }
}

fn write_opt_bytes<W: Write>(w: &mut W, b: &Option<Vec<u8>>) -> Result<()> {
    match b {
        Some(b) => {
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(b.len() as u32)?;
            w.write_all(b)?;
            Ok(())
        }
        None => w.write_u8(0).map_err(Error::from),
    }
}

fn read_opt_bytes<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>> {
    if r.read_u8()? == 0 {
        return Ok(None);
    }
    let len = r.read_u32::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(Some(buf))
}

fn model_tag(model: Model) -> u8 {
    match model {
        Model::Content => 0,
        Model::Data => 1,
        Model::Log => 2,
        Model::Queue => 3,
        Model::Sequential => 4,
        Model::Session => 5,
        Model::Tree => 6,
    }
}

fn model_from_tag(tag: u8) -> Result<Model> {
    match tag {
        0 => Ok(Model::Content),
        1 => Ok(Model::Data),
        2 => Ok(Model::Log),
        3 => Ok(Model::Queue),
        4 => Ok(Model::Sequential),
        5 => Ok(Model::Session),
        6 => Ok(Model::Tree),
        other => Err(Error::CorruptedData(format!("unknown schema model tag {other}"))),
    }
}

fn column_type_tag(t: ColumnType) -> u8 {
    match t {
        ColumnType::Int8 => 0,
        ColumnType::Int16 => 1,
        ColumnType::Int32 => 2,
        ColumnType::Int64 => 3,
        ColumnType::Uint8 => 4,
        ColumnType::Uint16 => 5,
        ColumnType::Uint32 => 6,
        ColumnType::Uint64 => 7,
        ColumnType::Float32 => 8,
        ColumnType::Float64 => 9,
        ColumnType::Boolean => 10,
        ColumnType::String => 11,
        ColumnType::Binary => 12,
        ColumnType::Bigint => 13,
        ColumnType::Ubigint => 14,
        ColumnType::Timestamp => 15,
    }
}

fn column_type_from_tag(tag: u8) -> Result<ColumnType> {
    Ok(match tag {
        0 => ColumnType::Int8,
        1 => ColumnType::Int16,
        2 => ColumnType::Int32,
        3 => ColumnType::Int64,
        4 => ColumnType::Uint8,
        5 => ColumnType::Uint16,
        6 => ColumnType::Uint32,
        7 => ColumnType::Uint64,
        8 => ColumnType::Float32,
        9 => ColumnType::Float64,
        10 => ColumnType::Boolean,
        11 => ColumnType::String,
        12 => ColumnType::Binary,
        13 => ColumnType::Bigint,
        14 => ColumnType::Ubigint,
        15 => ColumnType::Timestamp,
        other => return Err(Error::CorruptedData(format!("unknown column type tag {other}"))),
    })
}

fn write_column<W: Write>(w: &mut W, c: &Column) -> Result<()> {
    w.write_u16::<LittleEndian>(c.id)?;
    write_str(w, &c.name)?;
    w.write_u8(column_type_tag(c.column_type))?;
    w.write_u32::<LittleEndian>(c.flags)?;
    write_opt_bytes(w, &c.default)?;
    write_opt_bytes(w, &c.min)?;
    write_opt_bytes(w, &c.max)?;
    match c.length {
        Some(l) => {
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(l)?;
        }
        None => w.write_u8(0)?,
    }
    write_opt_str(w, &c.validation_script)?;
    write_opt_str(w, &c.description)?;
    Ok(())
}

fn read_column<R: Read>(r: &mut R) -> Result<Column> {
    let id = r.read_u16::<LittleEndian>()?;
    let name = read_str(r)?;
    let column_type = column_type_from_tag(r.read_u8()?)?;
    let flags = r.read_u32::<LittleEndian>()?;
    let default = read_opt_bytes(r)?;
    let min = read_opt_bytes(r)?;
    let max = read_opt_bytes(r)?;
    let length = if r.read_u8()? == 0 { None } else { Some(r.read_u32::<LittleEndian>()?) };
    let validation_script = read_opt_str(r)?;
    let description = read_opt_str(r)?;
    Ok(Column {
        id,
        name,
        column_type,
        flags,
        default,
        min,
        max,
        length,
        validation_script,
        description,
    })
}

fn write_sort_column<W: Write>(w: &mut W, s: &SortColumn) -> Result<()> {
    w.write_u16::<LittleEndian>(s.column_id)?;
    w.write_u8(u8::from(s.ascending))?;
    w.write_u8(u8::from(s.nulls_first))?;
    write_opt_str(w, &s.key_expression_script)
}

fn read_sort_column<R: Read>(r: &mut R) -> Result<SortColumn> {
    Ok(SortColumn {
        column_id: r.read_u16::<LittleEndian>()?,
        ascending: r.read_u8()? != 0,
        nulls_first: r.read_u8()? != 0,
        key_expression_script: read_opt_str(r)?,
    })
}

fn write_secondary_index<W: Write>(w: &mut W, idx: &SecondaryIndex) -> Result<()> {
    write_str(w, &idx.name)?;
    w.write_u32::<LittleEndian>(idx.flags)?;
    w.write_u16::<LittleEndian>(idx.sort_columns.len() as u16)?;
    for sc in &idx.sort_columns {
        write_sort_column(w, sc)?;
    }
    write_opt_str(w, &idx.filter_script)
}

fn read_secondary_index<R: Read>(r: &mut R) -> Result<SecondaryIndex> {
    let name = read_str(r)?;
    let flags = r.read_u32::<LittleEndian>()?;
    let count = r.read_u16::<LittleEndian>()? as usize;
    let mut sort_columns = Vec::with_capacity(count);
    for _ in 0..count {
        sort_columns.push(read_sort_column(r)?);
    }
    let filter_script = read_opt_str(r)?;
    Ok(SecondaryIndex {
        name,
        flags,
        sort_columns,
        filter_script,
    })
}

pub fn encode_schema(schema: &Schema) -> Vec<u8> {
    let mut buffer = Vec::new();
    let w = &mut buffer;
    #[allow(clippy::unwrap_used)]
    {
        write_str(w, &schema.table_name).unwrap();
        w.write_u8(model_tag(schema.model)).unwrap();
        write_str(w, &schema.replication).unwrap();
        w.write_u32::<LittleEndian>(schema.version).unwrap();

        w.write_u16::<LittleEndian>(schema.columns.len() as u16).unwrap();
        for column in &schema.columns {
            write_column(w, column).unwrap();
        }

        w.write_u16::<LittleEndian>(schema.primary_key.len() as u16).unwrap();
        for id in &schema.primary_key {
            w.write_u16::<LittleEndian>(*id).unwrap();
        }

        w.write_u16::<LittleEndian>(schema.secondary_indexes.len() as u16).unwrap();
        for index in &schema.secondary_indexes {
            write_secondary_index(w, index).unwrap();
        }
    }
    buffer
}

pub fn decode_schema<R: Read>(r: &mut R) -> Result<Schema> {
    let table_name = read_str(r)?;
    let model = model_from_tag(r.read_u8()?)?;
    let replication = read_str(r)?;
    let version = r.read_u32::<LittleEndian>()?;

    let column_count = r.read_u16::<LittleEndian>()? as usize;
    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        columns.push(read_column(r)?);
    }

    let primary_key_count = r.read_u16::<LittleEndian>()? as usize;
    let mut primary_key = Vec::with_capacity(primary_key_count);
    for _ in 0..primary_key_count {
        primary_key.push(r.read_u16::<LittleEndian>()?);
    }

    let index_count = r.read_u16::<LittleEndian>()? as usize;
    let mut secondary_indexes = Vec::with_capacity(index_count);
    for _ in 0..index_count {
        secondary_indexes.push(read_secondary_index(r)?);
    }

    Ok(Schema {
        table_name,
        model,
        replication,
        version,
        columns,
        primary_key,
        secondary_indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_minimal_schema() {
        let schema = Schema {
            table_name: "t".into(),
            model: Model::Queue,
            replication: "async".into(),
            version: 3,
            columns: vec![Column {
                id: 1,
                name: "a".into(),
                column_type: ColumnType::Int64,
                flags: 0,
                default: Some(vec![1, 2, 3]),
                min: None,
                max: None,
                length: None,
                validation_script: None,
                description: None,
            }],
            primary_key: vec![1],
            secondary_indexes: vec![],
        };

        let encoded = encode_schema(&schema);
        let mut cursor = std::io::Cursor::new(encoded);
        let decoded = decode_schema(&mut cursor).unwrap();

        assert_eq!(decoded.table_name, "t");
        assert_eq!(decoded.model, Model::Queue);
        assert_eq!(decoded.columns[0].default, Some(vec![1, 2, 3]));
    }
}
