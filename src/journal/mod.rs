// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The journal: a multi-file ring providing at-least-once durable queueing
//! in front of the table engine (§4.9).
//!
//! A [`Journal`] owns a directory holding `journal.conf`, `N`
//! `journal-<i>.events` files, `counters.seq`, and any `<id>.bin` external
//! attachments. It is not thread-safe by itself — §5 specifies the storage
//! core as single-threaded cooperative per instance.

mod attachment;
pub mod config;
mod counters;
mod file;
pub mod record;

pub use config::{AttachmentCopyHandling, FileManagement, JournalConfig, Sync as SyncMode};
pub use record::{Attachment, Status};

use counters::Counters;
use file::JournalFile;

use crate::error::{Error, Result};
use crate::fs::{Clock, FileSystem, StdFileSystem, SystemClock};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "journal.conf";
const COUNTERS_FILE_NAME: &str = "counters.seq";

/// An attachment as supplied by the caller of [`Journal::add_event`].
#[derive(Clone, Debug)]
pub enum InAttachment {
    Inline(Vec<u8>),
    /// A file on disk to be materialised per `attachment_copy_handling`.
    File(PathBuf),
}

/// An event as supplied to [`Journal::add_event`]. `time_sec`/`time_nsec`
/// are updated in place to the final, possibly-bumped, stamped time.
#[derive(Clone, Debug)]
pub struct InEvent {
    pub request_id: Vec<u8>,
    pub time_sec: u64,
    pub time_nsec: u64,
    pub attachments: Vec<InAttachment>,
}

impl InEvent {
    #[must_use]
    pub fn new(request_id: impl Into<Vec<u8>>, time_sec: u64, time_nsec: u64) -> Self {
        Self {
            request_id: request_id.into(),
            time_sec,
            time_nsec,
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: InAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// An attachment handed back by [`Journal::next_event`]: still lazy, reads
/// happen on demand.
#[derive(Clone, Debug)]
pub struct OutAttachment {
    dir: PathBuf,
    data: Attachment,
}

impl OutAttachment {
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.data, Attachment::External(_))
    }

    pub fn size(&self) -> Result<u64> {
        match &self.data {
            Attachment::Inline(bytes) => Ok(bytes.len() as u64),
            Attachment::External(id) => Ok(std::fs::metadata(self.external_path(*id))?.len()),
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        match &self.data {
            Attachment::Inline(bytes) => Ok(bytes.clone()),
            Attachment::External(id) => Ok(std::fs::read(self.external_path(*id))?),
        }
    }

    fn external_path(&self, id: u32) -> PathBuf {
        self.dir.join(format!("{id}.bin"))
    }
}

/// Extra information `next_event(..., debug = true)` reports (§4.9 point 3).
#[derive(Clone, Debug)]
pub struct DebugInfo {
    pub file_name: String,
    pub offset: u64,
}

/// An event handed back by [`Journal::next_event`].
#[derive(Clone, Debug)]
pub struct OutEvent {
    pub status: Status,
    pub request_id: Vec<u8>,
    pub time_sec: u64,
    pub time_nsec: u64,
    pub attachments: Vec<OutAttachment>,
    pub debug: Option<DebugInfo>,
}

#[derive(Clone, Debug)]
struct LiveEvent {
    file_index: usize,
    offset: u64,
    len: u64,
    status: Status,
    request_id: Vec<u8>,
    time_sec: u64,
    time_nsec: u64,
}

/// A directory of journal files, their in-memory live-event index, and the
/// attachment/id-counter state that goes with them.
pub struct Journal<C: Clock = SystemClock, FS: FileSystem = StdFileSystem> {
    dir: PathBuf,
    config: JournalConfig,
    files: Vec<JournalFile>,
    live: Vec<LiveEvent>,
    used_times: std::collections::HashSet<(u64, u64)>,
    counters: Counters,
    position: usize,
    clock: C,
    finalized: bool,
    _fs: PhantomData<FS>,
}

impl<C: Clock, FS: FileSystem> std::fmt::Debug for Journal<C, FS> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .field("live_events", &self.live.len())
            .finish()
    }
}

impl Journal<SystemClock, StdFileSystem> {
    /// Creates a brand new journal directory with the default clock and
    /// filesystem backends.
    pub fn create(dir: impl Into<PathBuf>, config: JournalConfig) -> Result<Self> {
        Self::create_with(dir, config, SystemClock)
    }

    /// Opens an existing journal directory, scanning every file (§4.9
    /// point 4).
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir, SystemClock)
    }
}

impl<C: Clock, FS: FileSystem> Journal<C, FS> {
    pub fn create_with(dir: impl Into<PathBuf>, config: JournalConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let dir = dir.into();
        FS::create_dir_all(&dir)?;
        config.save(dir.join(CONFIG_FILE_NAME))?;

        let mut files = Vec::with_capacity(config.maximum_number_of_files as usize);
        for i in 0..config.maximum_number_of_files {
            files.push(JournalFile::create(dir.join(format!("journal-{i}.events")))?);
        }
        let counters = Counters::open(dir.join(COUNTERS_FILE_NAME))?;

        Ok(Self {
            dir,
            config,
            files,
            live: Vec::new(),
            used_times: std::collections::HashSet::new(),
            counters,
            position: 0,
            clock,
            finalized: false,
            _fs: PhantomData,
        })
    }

    pub fn open_with(dir: impl Into<PathBuf>, clock: C) -> Result<Self> {
        let dir = dir.into();
        let config = JournalConfig::load(dir.join(CONFIG_FILE_NAME))?;

        let mut files = Vec::with_capacity(config.maximum_number_of_files as usize);
        let mut live = Vec::new();
        let mut used_times = std::collections::HashSet::new();
        for i in 0..config.maximum_number_of_files {
            let (file, scanned) = JournalFile::open(dir.join(format!("journal-{i}.events")))?;
            for scanned_record in scanned {
                used_times.insert((scanned_record.record.time_sec, scanned_record.record.time_nsec));
                if scanned_record.record.status.is_live() {
                    live.push(LiveEvent {
                        file_index: i as usize,
                        offset: scanned_record.offset,
                        len: scanned_record.len,
                        status: scanned_record.record.status,
                        request_id: scanned_record.record.request_id,
                        time_sec: scanned_record.record.time_sec,
                        time_nsec: scanned_record.record.time_nsec,
                    });
                }
            }
            files.push(file);
        }
        let counters = Counters::open(dir.join(COUNTERS_FILE_NAME))?;

        Ok(Self {
            dir,
            config,
            files,
            live,
            used_times,
            counters,
            position: 0,
            clock,
            finalized: false,
            _fs: PhantomData,
        })
    }

    #[must_use]
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Whether any event is still in `Ready`/`Forwarded`/`Acknowledged`.
    #[must_use]
    pub fn empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Count of events still in `Ready`/`Forwarded`/`Acknowledged`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.live.len()
    }

    /// `next_append` of the `i`-th file, mainly useful for tests asserting
    /// crash-recovery/compaction behaviour (S4, S5).
    pub fn file_next_append(&self, index: usize) -> Option<u64> {
        self.files.get(index).map(JournalFile::next_append)
    }

    /// Resets replay back to the first event (§4.7-style "restartable").
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    fn bump_until_unique(&self, mut time: (u64, u64)) -> (u64, u64) {
        while self.used_times.contains(&time) {
            time = if time.1 == 999_999_999 { (time.0 + 1, 0) } else { (time.0, time.1 + 1) };
        }
        time
    }

    fn is_too_far_future(&self, time: (u64, u64)) -> bool {
        let (now_sec, now_nsec) = self.clock.now();
        let limit = (now_sec + 5, now_nsec);
        time.0 > limit.0 || (time.0 == limit.0 && time.1 > limit.1)
    }

    fn first_file_with_room(&self, encoded_len: u64) -> Option<usize> {
        (0..self.files.len()).find(|&i| {
            self.files[i].next_append() + encoded_len <= self.config.maximum_file_size
                && self.live.iter().filter(|e| e.file_index == i).count() < self.config.maximum_events as usize
        })
    }

    fn read_record_at(&mut self, file_index: usize, offset: u64, len: u64) -> Result<record::EventRecord> {
        self.files[file_index].read_at(offset, len)
    }

    fn compact_file(&mut self, file_index: usize) -> Result<()> {
        let mut indices: Vec<usize> =
            self.live.iter().enumerate().filter(|(_, e)| e.file_index == file_index).map(|(idx, _)| idx).collect();
        indices.sort_by_key(|&idx| self.live[idx].offset);
        if indices.is_empty() && self.files[file_index].next_append() == file::FILE_HEADER_LEN {
            return Ok(());
        }

        let mut records = Vec::with_capacity(indices.len());
        for &idx in &indices {
            let event = self.live[idx].clone();
            records.push(self.read_record_at(file_index, event.offset, event.len)?);
        }

        let new_offsets = self.files[file_index].compact(&records)?;
        for (&idx, new_offset) in indices.iter().zip(new_offsets) {
            self.live[idx].offset = new_offset;
        }
        Ok(())
    }

    /// Resolves each attachment to its on-disk representation, returning
    /// the ids of any newly-created `<id>.bin` files alongside so a caller
    /// that ends up not appending the record can remove them again.
    fn resolve_attachments(&mut self, attachments: &[InAttachment]) -> Result<(Vec<Attachment>, Vec<u32>)> {
        let threshold = u64::from(self.config.inline_attachment_size_threshold);
        let mut resolved = Vec::with_capacity(attachments.len());
        let mut created = Vec::new();
        for attachment in attachments {
            match attachment {
                InAttachment::Inline(bytes) => {
                    if bytes.len() as u64 >= threshold {
                        let id = self.counters.next_id()?;
                        std::fs::write(self.dir.join(format!("{id}.bin")), bytes)?;
                        created.push(id);
                        resolved.push(Attachment::External(id));
                    } else {
                        resolved.push(Attachment::Inline(bytes.clone()));
                    }
                }
                InAttachment::File(path) => {
                    let size = std::fs::metadata(path)?.len();
                    if size >= threshold {
                        let id = self.counters.next_id()?;
                        let destination = self.dir.join(format!("{id}.bin"));
                        attachment::materialize::<FS>(path, &destination, self.config.attachment_copy_handling)?;
                        created.push(id);
                        resolved.push(Attachment::External(id));
                    } else {
                        resolved.push(Attachment::Inline(std::fs::read(path)?));
                    }
                }
            }
        }
        Ok((resolved, created))
    }

    /// Adds `event`, stamping its final (possibly-bumped) time back into it.
    /// Returns `Ok(false)` (no partial write) when no file has room even
    /// after compaction; returns `Err` for a caller-contract violation
    /// (bad request id, duplicate, clock too far ahead) (§4.9 point 1).
    pub fn add_event(&mut self, event: &mut InEvent) -> Result<bool> {
        if event.request_id.is_empty() || event.request_id.len() > 255 {
            return Err(Error::InvalidParameter("request_id must be 1..=255 bytes".into()));
        }
        if self.live.iter().any(|e| e.request_id == event.request_id) {
            return Err(Error::DefinedTwice(format!(
                "request id {:?} is already live",
                String::from_utf8_lossy(&event.request_id)
            )));
        }
        if self.is_too_far_future((event.time_sec, event.time_nsec)) {
            return Err(Error::InvalidParameter("event_time is more than 5s in the future".into()));
        }

        let stamped_time = self.bump_until_unique((event.time_sec, event.time_nsec));
        event.time_sec = stamped_time.0;
        event.time_nsec = stamped_time.1;

        let (attachments, created_external_ids) = self.resolve_attachments(&event.attachments)?;
        let record = record::EventRecord {
            status: Status::Ready,
            request_id: event.request_id.clone(),
            time_sec: stamped_time.0,
            time_nsec: stamped_time.1,
            attachments,
        };
        let encoded_len = record.encode()?.len() as u64;

        let file_index = match self.first_file_with_room(encoded_len) {
            Some(i) => Some(i),
            None if self.config.compress_when_full => {
                for i in 0..self.files.len() {
                    if let Err(error) = self.compact_file(i) {
                        log::warn!("journal compaction of file {i} failed: {error}");
                    }
                }
                self.first_file_with_room(encoded_len)
            }
            None => None,
        };

        let Some(file_index) = file_index else {
            for id in created_external_ids {
                let _ = std::fs::remove_file(self.dir.join(format!("{id}.bin")));
            }
            return Ok(false);
        };

        let offset = self.files[file_index].append(&record, self.config.sync)?;
        self.used_times.insert(stamped_time);
        self.live.push(LiveEvent {
            file_index,
            offset,
            len: encoded_len,
            status: Status::Ready,
            request_id: record.request_id,
            time_sec: stamped_time.0,
            time_nsec: stamped_time.1,
        });
        Ok(true)
    }

    /// Attempts `request_id`'s status transition to `new_status`. Returns
    /// `Ok(false)` for a transition the state machine refuses (§4.9
    /// point 2); once the new status is `Completed`/`Failed` the event
    /// leaves the in-memory index.
    pub fn set_status(&mut self, request_id: &[u8], new_status: Status) -> Result<bool> {
        let Some(idx) = self.live.iter().position(|e| e.request_id == request_id) else {
            return Err(Error::LogicError(format!(
                "no live event with request id {:?}",
                String::from_utf8_lossy(request_id)
            )));
        };

        if !self.live[idx].status.can_transition_to(new_status) {
            return Ok(false);
        }

        let (file_index, offset) = (self.live[idx].file_index, self.live[idx].offset);
        self.files[file_index].update_status(offset, new_status, self.config.sync)?;

        if new_status.is_live() {
            self.live[idx].status = new_status;
        } else {
            self.live.remove(idx);
        }
        Ok(true)
    }

    /// Returns the next event still in `Ready`/`Forwarded`/`Acknowledged`,
    /// ordered by time (`by_time = true`) or by request-id bytes
    /// (`by_time = false`); `None` once the current pass is exhausted
    /// (§4.9 point 3).
    pub fn next_event(&mut self, by_time: bool, debug: bool) -> Result<Option<OutEvent>> {
        let mut order: Vec<usize> = (0..self.live.len()).collect();
        if by_time {
            order.sort_by_key(|&i| (self.live[i].time_sec, self.live[i].time_nsec));
        } else {
            order.sort_by(|&a, &b| self.live[a].request_id.cmp(&self.live[b].request_id));
        }

        if self.position >= order.len() {
            return Ok(None);
        }
        let idx = order[self.position];
        self.position += 1;

        let event = self.live[idx].clone();
        let record = self.read_record_at(event.file_index, event.offset, event.len)?;
        let attachments = record
            .attachments
            .into_iter()
            .map(|data| OutAttachment { dir: self.dir.clone(), data })
            .collect();

        Ok(Some(OutEvent {
            status: event.status,
            request_id: event.request_id,
            time_sec: event.time_sec,
            time_nsec: event.time_nsec,
            attachments,
            debug: debug.then(|| DebugInfo {
                file_name: self.files[event.file_index].path().display().to_string(),
                offset: event.offset,
            }),
        }))
    }

    /// Consumes the journal, applying `file_management` to every file
    /// (§4.9: "`truncate()` on drop removes any garbage past `next_append`
    /// according to `file_management`").
    pub fn close(mut self) -> Result<()> {
        self.finalize_files()
    }

    fn finalize_files(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        for i in 0..self.files.len() {
            let is_empty = !self.live.iter().any(|e| e.file_index == i);
            self.files[i].finalize(self.config.file_management, is_empty)?;
        }
        self.finalized = true;
        Ok(())
    }
}

impl<C: Clock, FS: FileSystem> Drop for Journal<C, FS> {
    fn drop(&mut self) {
        if let Err(error) = self.finalize_files() {
            log::warn!("journal finalize on drop failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::FakeClock;

    fn config() -> JournalConfig {
        let mut config = JournalConfig::default();
        config.maximum_number_of_files = 2;
        config
    }

    #[test]
    fn s3_time_order_replay_bumps_colliding_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new(1_700_000_000, 0);
        let mut journal = Journal::<FakeClock, StdFileSystem>::create_with(dir.path(), config(), clock).unwrap();

        let mut a = InEvent::new(b"a".to_vec(), 1_700_000_000, 0);
        let mut b = InEvent::new(b"b".to_vec(), 1_700_000_000, 5);
        let mut c = InEvent::new(b"c".to_vec(), 1_700_000_000, 5);
        assert!(journal.add_event(&mut a).unwrap());
        assert!(journal.add_event(&mut b).unwrap());
        assert!(journal.add_event(&mut c).unwrap());

        assert_eq!((b.time_sec, b.time_nsec), (1_700_000_000, 5));
        assert_eq!((c.time_sec, c.time_nsec), (1_700_000_000, 6));

        journal.rewind();
        let first = journal.next_event(true, false).unwrap().unwrap();
        let second = journal.next_event(true, false).unwrap().unwrap();
        let third = journal.next_event(true, false).unwrap().unwrap();
        assert_eq!(first.request_id, b"a");
        assert_eq!(second.request_id, b"b");
        assert_eq!(third.request_id, b"c");
        assert!(journal.next_event(true, false).unwrap().is_none());
    }

    #[test]
    fn s4_status_transitions_and_reopen_resets_file() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new(1_700_000_000, 0);
        {
            let mut journal = Journal::<FakeClock, StdFileSystem>::create_with(dir.path(), config(), clock.clone()).unwrap();
            let mut x = InEvent::new(b"x".to_vec(), 1_700_000_000, 0);
            journal.add_event(&mut x).unwrap();

            assert!(journal.set_status(b"x", Status::Forwarded).unwrap());
            assert!(!journal.set_status(b"x", Status::Ready).unwrap());
            assert!(journal.set_status(b"x", Status::Acknowledged).unwrap());
            assert!(journal.set_status(b"x", Status::Completed).unwrap());
            journal.close().unwrap();
        }

        let reopened = Journal::<FakeClock, StdFileSystem>::open_with(dir.path(), clock).unwrap();
        assert!(reopened.empty());
        assert_eq!(reopened.file_next_append(0).unwrap(), file::FILE_HEADER_LEN);
    }

    #[test]
    fn s5_crash_recovery_keeps_events_before_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let clock = FakeClock::new(1_700_000_000, 0);
        let second_offset;
        {
            let mut journal = Journal::<FakeClock, StdFileSystem>::create_with(dir.path(), config(), clock.clone()).unwrap();
            let mut a = InEvent::new(b"a".to_vec(), 1_700_000_000, 0);
            let mut b = InEvent::new(b"b".to_vec(), 1_700_000_000, 1);
            journal.add_event(&mut a).unwrap();
            journal.add_event(&mut b).unwrap();
            second_offset = journal.live[1].offset;
            std::mem::forget(journal);
        }

        let file_path = dir.path().join("journal-0.events");
        let file_len = std::fs::metadata(&file_path).unwrap().len();
        let file = std::fs::File::options().write(true).open(&file_path).unwrap();
        file.set_len(file_len - 10).unwrap();
        drop(file);

        let mut reopened = Journal::<FakeClock, StdFileSystem>::open_with(dir.path(), clock).unwrap();
        assert_eq!(reopened.size(), 1);
        assert_eq!(reopened.file_next_append(0).unwrap(), second_offset);

        let mut c = InEvent::new(b"c".to_vec(), 1_700_000_000, 2);
        assert!(reopened.add_event(&mut c).unwrap());
        assert_eq!(reopened.live.last().unwrap().offset, second_offset);
    }

    #[test]
    fn s6_external_attachment_softlink_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let attachment_source = dir.path().join("attachment-source.bin");
        std::fs::write(&attachment_source, vec![7u8; 32 * 1024]).unwrap();

        let mut cfg = config();
        cfg.inline_attachment_size_threshold = 4096;
        cfg.attachment_copy_handling = AttachmentCopyHandling::Softlink;

        let journal_dir = dir.path().join("journal");
        let clock = FakeClock::new(1_700_000_000, 0);
        let mut journal = Journal::<FakeClock, StdFileSystem>::create_with(&journal_dir, cfg, clock).unwrap();

        let mut event =
            InEvent::new(b"withfile".to_vec(), 1_700_000_000, 0).with_attachment(InAttachment::File(attachment_source.clone()));
        assert!(journal.add_event(&mut event).unwrap());

        let found_symlink = std::fs::read_dir(&journal_dir)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "bin") && entry.path().is_symlink());
        assert!(found_symlink);

        journal.rewind();
        let out = journal.next_event(true, false).unwrap().unwrap();
        assert_eq!(out.attachments.len(), 1);
        assert!(out.attachments[0].is_file());
        assert_eq!(out.attachments[0].size().unwrap(), 32 * 1024);
        assert_eq!(out.attachments[0].read().unwrap(), vec![7u8; 32 * 1024]);
    }

    #[test]
    fn property_8_oversized_record_is_rejected_without_writing() {
        // Every attachment below `inline_attachment_size_threshold` stays
        // inline rather than getting externalised; enough of them still
        // push the framed record past even the minimum `maximum_file_size`.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config();
        cfg.maximum_file_size = 64 * 1024;
        let clock = FakeClock::new(1_700_000_000, 0);
        let mut journal = Journal::<FakeClock, StdFileSystem>::create_with(dir.path(), cfg, clock).unwrap();

        let mut event = InEvent::new(b"huge".to_vec(), 1_700_000_000, 0);
        for _ in 0..50 {
            event.attachments.push(InAttachment::Inline(vec![0u8; 2000]));
        }
        assert!(!journal.add_event(&mut event).unwrap());
        assert!(journal.empty());
        assert_eq!(journal.file_next_append(0).unwrap(), file::FILE_HEADER_LEN);
    }
}
