// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The Dbfile: owns a table's underlying file, maps `ref -> Block`, and
//! maintains the free-block list (§4.3).
//!
//! Blocks are cached behind `Arc<Mutex<Page>>` handles: the cache
//! exclusively owns the slot, callers hold a cheaply-cloned borrow tied to
//! that cache entry rather than a back-pointer cycle between block and
//! file.

use crate::block::{BlockType, Page};
use crate::error::{Error, Result};
use quick_cache::{sync::Cache, UnitWeighter};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Smallest legal page size (§3: "power of two, >= 4096, multiple of system page").
pub const MIN_PAGE_SIZE: u32 = 4096;

/// Default number of pages kept hot in the cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 4096;

fn validate_page_size(page_size: u32) -> Result<()> {
    if page_size < MIN_PAGE_SIZE || !page_size.is_power_of_two() {
        return Err(Error::InvalidSize(format!(
            "page size {page_size} must be a power of two >= {MIN_PAGE_SIZE}"
        )));
    }
    Ok(())
}

/// Owns a table's file, its block cache, and the free-block list head.
pub struct Dbfile {
    path: PathBuf,
    file: Mutex<File>,
    page_size: u32,
    cache: Cache<u64, Arc<Mutex<Page>>, UnitWeighter, rustc_hash::FxBuildHasher>,
}

impl Dbfile {
    /// Creates a brand new table file with a fresh zeroed `PTBL` header at
    /// offset 0.
    pub fn create(path: impl AsRef<Path>, page_size: u32) -> Result<Self> {
        validate_page_size(page_size)?;
        let path = path.as_ref().to_path_buf();
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        let mut header = Page::zeroed(page_size);
        crate::block::Ptbl::initialize(&mut header, page_size)?;
        file.write_all(header.as_bytes())?;
        file.sync_all()?;

        Ok(Self::from_parts(path, file, page_size))
    }

    /// Opens an existing table file, learning its page size from the header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = std::fs::OpenOptions::new().read(true).write(true).open(&path)?;

        let mut probe = vec![0u8; MIN_PAGE_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut probe)
            .map_err(|_| Error::CorruptedData("table file shorter than minimum page size".into()))?;

        let probe_page = Page::from_bytes(probe);
        let magic = probe_page.magic()?;
        if BlockType::from_magic(magic)? != BlockType::Ptbl {
            return Err(Error::CorruptedData("table file header is not PTBL".into()));
        }
        let page_size = probe_page.read_u32(8)?;
        validate_page_size(page_size)?;

        Ok(Self::from_parts(path, file, page_size))
    }

    fn from_parts(path: PathBuf, file: File, page_size: u32) -> Self {
        let cache = Cache::with(
            1_000,
            DEFAULT_CACHE_CAPACITY,
            UnitWeighter,
            rustc_hash::FxBuildHasher::default(),
            quick_cache::DefaultLifecycle::default(),
        );
        Self {
            path,
            file: Mutex::new(file),
            page_size,
            cache,
        }
    }

    /// The page size every block in this file uses.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_len(&self) -> Result<u64> {
        #[allow(clippy::unwrap_used)]
        let file = self.file.lock().unwrap();
        Ok(file.metadata()?.len())
    }

    fn read_page_from_disk(&self, r: u64) -> Result<Page> {
        let page_size = self.page_size as usize;
        let mut buf = vec![0u8; page_size];
        #[allow(clippy::unwrap_used)]
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(r))?;
        file.read_exact(&mut buf)
            .map_err(|_| Error::BlockNotFound(r))?;
        Ok(Page::from_bytes(buf))
    }

    fn write_page_to_disk(&self, r: u64, page: &Page) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(r))?;
        file.write_all(page.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Fetches a block by reference. Cached entries are returned as-is;
    /// otherwise the page is read from disk, its magic validated, and the
    /// result cached. Reading past the file end fails with
    /// [`Error::BlockNotFound`]; an unrecognised magic fails with
    /// [`Error::CorruptedData`].
    pub fn get_block(&self, r: u64) -> Result<Arc<Mutex<Page>>> {
        if let Some(cached) = self.cache.get(&r) {
            return Ok(cached);
        }

        let page = self.read_page_from_disk(r)?;
        let magic = page.magic()?;
        BlockType::from_magic(magic).map_err(|_| {
            Error::CorruptedData(format!("unknown block magic at offset {r}"))
        })?;

        let handle = Arc::new(Mutex::new(page));
        self.cache.insert(r, handle.clone());
        Ok(handle)
    }

    /// Persists a cached block's current in-memory contents back to disk.
    /// Callers mutate the `Page` behind the `Arc<Mutex<_>>` returned by
    /// [`Self::get_block`] and then call this to make the change durable.
    pub fn flush_block(&self, r: u64, handle: &Arc<Mutex<Page>>) -> Result<()> {
        #[allow(clippy::unwrap_used)]
        let page = handle.lock().unwrap();
        self.write_page_to_disk(r, &page)
    }

    fn header(&self) -> Result<Arc<Mutex<Page>>> {
        self.get_block(0)
    }

    /// Allocates a new block of `block_type`. Pops the free list's head if
    /// non-empty; otherwise extends the file by one page (§4.3).
    pub fn allocate_new_block(&self, block_type: BlockType) -> Result<(u64, Arc<Mutex<Page>>)> {
        let header = self.header()?;

        let first_free = {
            #[allow(clippy::unwrap_used)]
            let mut guard = header.lock().unwrap();
            crate::block::Ptbl::view(&mut guard)?.first_free_block()?
        };

        if first_free != 0 {
            let free_handle = self.get_block(first_free)?;
            let next_free = {
                #[allow(clippy::unwrap_used)]
                let mut guard = free_handle.lock().unwrap();
                let free_view = crate::block::Free::view(&mut guard)?;
                free_view.next_free_block()?
            };

            {
                #[allow(clippy::unwrap_used)]
                let mut guard = header.lock().unwrap();
                let mut ptbl = crate::block::Ptbl::view(&mut guard)?;
                ptbl.set_first_free_block(next_free)?;
            }
            self.flush_block(0, &header)?;

            {
                #[allow(clippy::unwrap_used)]
                let mut guard = free_handle.lock().unwrap();
                guard.init(block_type, 1, 0);
            }
            self.flush_block(first_free, &free_handle)?;

            return Ok((first_free, free_handle));
        }

        let offset = self.file_len()?;
        let mut page = Page::zeroed(self.page_size);
        page.init(block_type, 1, 0);
        self.write_page_to_disk(offset, &page)?;
        let handle = Arc::new(Mutex::new(page));
        self.cache.insert(offset, handle.clone());
        Ok((offset, handle))
    }

    /// Returns a block to the free list's head (LIFO), per §4.3.
    pub fn free_block(&self, r: u64) -> Result<()> {
        if r == 0 {
            return Err(Error::LogicError("cannot free the table header".into()));
        }
        let header = self.header()?;
        let current_head = {
            #[allow(clippy::unwrap_used)]
            let mut guard = header.lock().unwrap();
            crate::block::Ptbl::view(&mut guard)?.first_free_block()?
        };

        let handle = self.get_block(r)?;
        {
            #[allow(clippy::unwrap_used)]
            let mut guard = handle.lock().unwrap();
            crate::block::Free::initialize(&mut guard, current_head)?;
        }
        self.flush_block(r, &handle)?;

        {
            #[allow(clippy::unwrap_used)]
            let mut guard = header.lock().unwrap();
            let mut ptbl = crate::block::Ptbl::view(&mut guard)?;
            ptbl.set_first_free_block(r)?;
        }
        self.flush_block(0, &header)?;
        Ok(())
    }

    /// Runs `f` against the mutable `PTBL` header and flushes the result.
    pub fn with_header_mut<T>(
        &self,
        f: impl FnOnce(&mut crate::block::Ptbl<'_>) -> Result<T>,
    ) -> Result<T> {
        let header = self.header()?;
        #[allow(clippy::unwrap_used)]
        let mut guard = header.lock().unwrap();
        let mut ptbl = crate::block::Ptbl::view(&mut guard)?;
        let result = f(&mut ptbl)?;
        drop(guard);
        self.flush_block(0, &header)?;
        Ok(result)
    }

    /// Runs `f` against the read-only `PTBL` header.
    pub fn with_header<T>(&self, f: impl FnOnce(&crate::block::Ptbl<'_>) -> Result<T>) -> Result<T> {
        let header = self.header()?;
        #[allow(clippy::unwrap_used)]
        let mut guard = header.lock().unwrap();
        let ptbl = crate::block::Ptbl::view(&mut guard)?;
        f(&ptbl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.db");
        {
            let dbfile = Dbfile::create(&path, 4096).unwrap();
            assert_eq!(dbfile.page_size(), 4096);
        }
        let reopened = Dbfile::open(&path).unwrap();
        assert_eq!(reopened.page_size(), 4096);
    }

    #[test]
    fn allocate_and_get_block_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.db");
        let dbfile = Dbfile::create(&path, 4096).unwrap();

        let (r, handle) = dbfile.allocate_new_block(BlockType::Data).unwrap();
        assert_eq!(r, 4096);
        {
            #[allow(clippy::unwrap_used)]
            let guard = handle.lock().unwrap();
            assert_eq!(guard.magic().unwrap(), *b"DATA");
        }

        let fetched = dbfile.get_block(r).unwrap();
        #[allow(clippy::unwrap_used)]
        let guard = fetched.lock().unwrap();
        assert_eq!(guard.magic().unwrap(), *b"DATA");
    }

    #[test]
    fn free_then_allocate_reuses_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.db");
        let dbfile = Dbfile::create(&path, 4096).unwrap();

        let (r, _) = dbfile.allocate_new_block(BlockType::Data).unwrap();
        dbfile.free_block(r).unwrap();

        let (r2, handle) = dbfile.allocate_new_block(BlockType::Schm).unwrap();
        assert_eq!(r, r2);
        #[allow(clippy::unwrap_used)]
        let guard = handle.lock().unwrap();
        assert_eq!(guard.magic().unwrap(), *b"SCHM");
    }

    #[test]
    fn get_block_past_eof_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.db");
        let dbfile = Dbfile::create(&path, 4096).unwrap();
        assert!(matches!(
            dbfile.get_block(1 << 20),
            Err(Error::BlockNotFound(_))
        ));
    }
}
