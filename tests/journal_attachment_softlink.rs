// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Testable property 8 and scenario S6: a large file attachment gets
//! externalised as a symlink when `attachment_copy_handling = softlink`,
//! and an oversized inline-only record is rejected without writing
//! anything.

use prinbee_storage::journal::{AttachmentCopyHandling, InAttachment, InEvent, Journal, JournalConfig};

#[test]
fn s6_large_file_attachment_becomes_an_absolute_symlink() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("attachment-source.bin");
    std::fs::write(&source, vec![7u8; 32 * 1024]).unwrap();

    let mut config = JournalConfig::default();
    config.inline_attachment_size_threshold = 4096;
    config.attachment_copy_handling = AttachmentCopyHandling::Softlink;

    let journal_dir = dir.path().join("journal");
    let mut journal = Journal::create(&journal_dir, config).unwrap();

    let mut event = InEvent::new(b"withfile".to_vec(), 1_700_000_000, 0)
        .with_attachment(InAttachment::File(source.clone()));
    assert!(journal.add_event(&mut event).unwrap());

    let symlink_found = std::fs::read_dir(&journal_dir)
        .unwrap()
        .filter_map(std::result::Result::ok)
        .any(|entry| entry.path().extension().is_some_and(|ext| ext == "bin") && entry.path().is_symlink());
    assert!(symlink_found);

    journal.rewind();
    let out = journal.next_event(true, false).unwrap().unwrap();
    assert_eq!(out.attachments.len(), 1);
    assert!(out.attachments[0].is_file());
    assert_eq!(out.attachments[0].size().unwrap(), 32 * 1024);
    assert_eq!(out.attachments[0].read().unwrap(), vec![7u8; 32 * 1024]);
}

#[test]
fn property_8_record_too_big_for_every_file_is_rejected_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = JournalConfig::default();
    config.maximum_file_size = 64 * 1024;

    let mut journal = Journal::create(dir.path(), config).unwrap();

    let mut event = InEvent::new(b"huge".to_vec(), 1_700_000_000, 0);
    for _ in 0..50 {
        event = event.with_attachment(InAttachment::Inline(vec![0u8; 2000]));
    }

    assert!(!journal.add_event(&mut event).unwrap());
    assert!(journal.empty());
    assert!(std::fs::read_dir(dir.path()).unwrap().filter_map(std::result::Result::ok).all(|entry| !entry
        .path()
        .extension()
        .is_some_and(|ext| ext == "bin")));
}
