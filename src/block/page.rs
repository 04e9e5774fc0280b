// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::types::BlockType;
use crate::error::{Error, Result};

/// Length of every page's fixed header: a 4-byte magic plus a packed
/// `(major, minor)` structure version.
pub const HEADER_LEN: usize = 8;

/// A 64-bit file offset. `0` is the null reference; non-null references are
/// always a multiple of the file's page size.
pub type Ref = u64;

/// A 64-bit monotonic row identifier.
pub type Oid = u64;

/// Raw fixed-size page buffer backing every block type.
///
/// Bounds-checked field accessors live on this type; the typed per-block
/// wrappers (`Ptbl`, `Schm`, ...) borrow a `&Page`/`&mut Page` and know the
/// byte offset of each of their fields at compile time, so there is no
/// string-keyed lookup on the hot path. A generic `field(name) -> Value`
/// accessor lives on each typed wrapper for diagnostics only.
#[derive(Clone)]
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    /// Allocates a zero-filled page of `page_size` bytes.
    #[must_use]
    pub fn zeroed(page_size: u32) -> Self {
        Self {
            data: vec![0; page_size as usize],
        }
    }

    /// Wraps an existing buffer (e.g. just read from disk).
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Byte length of the page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn check_bounds(&self, offset: usize, width: usize) -> Result<()> {
        if offset + width > self.data.len() {
            return Err(Error::CorruptedData(format!(
                "field at offset {offset} (width {width}) exceeds page of {} bytes",
                self.data.len()
            )));
        }
        Ok(())
    }

    /// Reads the 4-byte magic at the start of the page.
    pub fn magic(&self) -> Result<[u8; 4]> {
        self.check_bounds(0, 4)?;
        Ok([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    /// Reads the `(major, minor)` structure version following the magic.
    pub fn version(&self) -> Result<(u16, u16)> {
        let major = self.read_u16(4)?;
        let minor = self.read_u16(6)?;
        Ok((major, minor))
    }

    /// Writes the magic and version, zero-filling the rest of the page
    /// (matching the Dbfile contract: every new block is zeroed, then the
    /// block constructor writes its magic/version).
    pub fn init(&mut self, block_type: BlockType, major: u16, minor: u16) {
        for byte in self.data.iter_mut() {
            *byte = 0;
        }
        self.data[0..4].copy_from_slice(&block_type.magic());
        self.write_u16(4, major).ok();
        self.write_u16(6, minor).ok();
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.check_bounds(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.check_bounds(offset, 1)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        self.check_bounds(offset, 2)?;
        Ok(u16::from_le_bytes([self.data[offset], self.data[offset + 1]]))
    }

    pub fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        self.check_bounds(offset, 2)?;
        self.data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        self.check_bounds(offset, 4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(u32::from_le_bytes(buf))
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check_bounds(offset, 4)?;
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_u64(&self, offset: usize) -> Result<u64> {
        self.check_bounds(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        Ok(u64::from_le_bytes(buf))
    }

    pub fn write_u64(&mut self, offset: usize, value: u64) -> Result<()> {
        self.check_bounds(offset, 8)?;
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check_bounds(offset, len)?;
        Ok(&self.data[offset..offset + len])
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        self.check_bounds(offset, bytes.len())?;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
