// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! One `journal-<i>.events` file: header, append, in-place status update,
//! crash-recovery scan, and single-pass compaction (§4.9).

use super::config::{FileManagement, Sync as SyncMode};
use super::record::{EventRecord, Status};
use crate::error::{Error, Result};
use byteorder::WriteBytesExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const FILE_HEADER_LEN: u64 = 4 + 1 + 1 + 2;
const MAGIC: &[u8; 4] = b"EVTJ";
const MAJOR_VERSION: u8 = 1;
const MINOR_VERSION: u8 = 0;

/// One record as found during a scan: its absolute file offset, its framed
/// byte length, and the decoded record itself.
#[derive(Clone, Debug)]
pub struct ScannedRecord {
    pub offset: u64,
    pub len: u64,
    pub record: EventRecord,
}

/// A single on-disk journal file and the append cursor scanning it left off
/// at.
#[derive(Debug)]
pub struct JournalFile {
    path: PathBuf,
    file: File,
    next_append: u64,
}

impl JournalFile {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(&path)?;
        file.write_all(MAGIC)?;
        file.write_u8(MAJOR_VERSION)?;
        file.write_u8(MINOR_VERSION)?;
        file.write_all(&[0u8; 2])?;
        file.sync_all()?;
        Ok(Self {
            path,
            file,
            next_append: FILE_HEADER_LEN,
        })
    }

    /// Opens an existing file and scans it, validating the header and
    /// returning every live (non-completed/failed-and-skipped... actually
    /// every successfully parsed) record up to the first structural problem.
    /// On a bad record, scanning stops and the file is truncated at the
    /// offset where that record began (§4.9 point 4).
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<ScannedRecord>)> {
        let path = path.into();
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let mut header = [0u8; FILE_HEADER_LEN as usize];
        file.read_exact(&mut header).map_err(|_| Error::CorruptedData("journal file too short for header".into()))?;
        if &header[0..4] != MAGIC {
            return Err(Error::CorruptedData(format!("bad journal file magic in {}", path.display())));
        }
        if header[4] != MAJOR_VERSION {
            return Err(Error::CorruptedData(format!("unsupported journal file version in {}", path.display())));
        }

        let file_len = file.metadata()?.len();
        let mut offset = FILE_HEADER_LEN;
        let mut records = Vec::new();

        const PREFIX_LEN: u64 = 2 + 1 + 1 + 4;
        while offset + PREFIX_LEN <= file_len {
            let mut prefix = [0u8; PREFIX_LEN as usize];
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut prefix)?;
            if &prefix[0..2] != b"ev" {
                break;
            }
            let size = u64::from(u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]));
            if size < super::record::RECORD_HEADER_LEN as u64 || offset + size > file_len {
                break;
            }

            let mut buf = vec![0u8; size as usize];
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
            match EventRecord::decode(&buf) {
                Ok(record) => {
                    let len = size;
                    records.push(ScannedRecord { offset, len, record });
                    offset += len;
                }
                Err(_) => break,
            }
        }

        let journal_file = Self {
            path,
            file,
            next_append: offset,
        };
        Ok((journal_file, records))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn next_append(&self) -> u64 {
        self.next_append
    }

    /// Appends `record`, returning its file offset. On any I/O failure the
    /// partial write is left past `next_append` (§4.9: "the record's magic
    /// is not committed, so the next scan stops at that point") and
    /// `next_append` itself is not advanced.
    pub fn append(&mut self, record: &EventRecord, sync: SyncMode) -> Result<u64> {
        let encoded = record.encode()?;
        let offset = self.next_append;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&encoded)?;
        match sync {
            SyncMode::None => {}
            SyncMode::Flush => self.file.flush()?,
            SyncMode::Full => self.file.sync_data()?,
        }
        self.next_append = offset + encoded.len() as u64;
        Ok(offset)
    }

    /// Re-reads and decodes the record known to span `[offset, offset+len)`.
    pub fn read_at(&mut self, offset: u64, len: u64) -> Result<EventRecord> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        self.file.read_exact(&mut buf)?;
        EventRecord::decode(&buf)
    }

    /// Overwrites the status byte of the record at `offset` in place.
    pub fn update_status(&mut self, offset: u64, status: Status, sync: SyncMode) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset + 2))?;
        self.file.write_all(&[status as u8])?;
        match sync {
            SyncMode::None => {}
            SyncMode::Flush => self.file.flush()?,
            SyncMode::Full => self.file.sync_data()?,
        }
        Ok(())
    }

    /// Rewrites the file in a single pass, keeping only `live`, packed
    /// contiguously from `FILE_HEADER_LEN`. Returns the new offset of each
    /// surviving record, in the same order as `live`. Never touches any
    /// other file.
    pub fn compact(&mut self, live: &[EventRecord]) -> Result<Vec<u64>> {
        let mut new_offsets = Vec::with_capacity(live.len());
        let mut offset = FILE_HEADER_LEN;
        let mut buf = Vec::new();
        for record in live {
            new_offsets.push(offset);
            let encoded = record.encode()?;
            offset += encoded.len() as u64;
            buf.extend_from_slice(&encoded);
        }

        self.file.seek(SeekFrom::Start(FILE_HEADER_LEN))?;
        self.file.write_all(&buf)?;
        self.file.set_len(offset)?;
        self.file.sync_all()?;
        self.next_append = offset;
        Ok(new_offsets)
    }

    /// Applies `file_management` when the file is being closed for good.
    pub fn finalize(&mut self, management: FileManagement, is_empty: bool) -> Result<()> {
        match management {
            FileManagement::Keep => {
                self.file.seek(SeekFrom::Start(self.next_append))?;
                self.file.write_all(&[0u8; 2])?;
                self.file.flush()?;
            }
            FileManagement::Truncate => {
                self.file.set_len(self.next_append)?;
            }
            FileManagement::Delete => {
                if is_empty {
                    std::fs::remove_file(&self.path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::record::Attachment;

    fn sample(request_id: &[u8], status: Status) -> EventRecord {
        EventRecord {
            status,
            request_id: request_id.to_vec(),
            time_sec: 1,
            time_nsec: 0,
            attachments: vec![Attachment::Inline(b"payload".to_vec())],
        }
    }

    #[test]
    fn append_then_reopen_scans_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal-0.events");
        {
            let mut file = JournalFile::create(&path).unwrap();
            file.append(&sample(b"a", Status::Ready), SyncMode::Flush).unwrap();
            file.append(&sample(b"b", Status::Ready), SyncMode::Flush).unwrap();
        }

        let (file, records) = JournalFile::open(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(file.next_append(), records.last().unwrap().offset + records.last().unwrap().len);
    }

    #[test]
    fn update_status_is_visible_on_rescan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal-0.events");
        let offset = {
            let mut file = JournalFile::create(&path).unwrap();
            file.append(&sample(b"a", Status::Ready), SyncMode::Flush).unwrap()
        };
        {
            let mut file = JournalFile::open(&path).unwrap().0;
            file.update_status(offset, Status::Forwarded, SyncMode::Flush).unwrap();
        }

        let (_file, records) = JournalFile::open(&path).unwrap();
        assert_eq!(records[0].record.status, Status::Forwarded);
    }

    #[test]
    fn truncated_trailing_record_stops_scan_before_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal-0.events");
        let second_offset = {
            let mut file = JournalFile::create(&path).unwrap();
            file.append(&sample(b"a", Status::Ready), SyncMode::Flush).unwrap();
            file.append(&sample(b"b", Status::Ready), SyncMode::Flush).unwrap()
        };
        let file_len = std::fs::metadata(&path).unwrap().len();
        let truncated = File::options().write(true).open(&path).unwrap();
        truncated.set_len(file_len - 10).unwrap();
        drop(truncated);

        let (file, records) = JournalFile::open(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.request_id, b"a");
        assert_eq!(file.next_append(), second_offset);
    }

    #[test]
    fn compact_drops_everything_not_in_live_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal-0.events");
        let mut file = JournalFile::create(&path).unwrap();
        file.append(&sample(b"a", Status::Completed), SyncMode::Flush).unwrap();
        file.append(&sample(b"b", Status::Ready), SyncMode::Flush).unwrap();

        let live = vec![sample(b"b", Status::Ready)];
        let offsets = file.compact(&live).unwrap();
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets[0], FILE_HEADER_LEN);

        let (_reopened, records) = JournalFile::open(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.request_id, b"b");
    }
}
