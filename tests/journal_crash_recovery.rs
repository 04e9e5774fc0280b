// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Testable property 5 / scenario S5: truncating a journal file mid-record
//! leaves every earlier event replayable, and the next append lands right
//! back where the truncated record started.

use prinbee_storage::journal::{InEvent, Journal, JournalConfig};
use std::time::{SystemTime, UNIX_EPOCH};

fn now() -> (u64, u64) {
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    (since_epoch.as_secs(), u64::from(since_epoch.subsec_nanos()))
}

#[test]
fn s5_truncated_trailing_record_is_dropped_but_earlier_ones_survive() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = JournalConfig::default();
    config.maximum_number_of_files = 2;

    let (sec, nsec) = now();
    let second_offset;
    {
        let mut journal = Journal::create(dir.path(), config).unwrap();
        let mut a = InEvent::new(b"a".to_vec(), sec, nsec);
        let mut b = InEvent::new(b"b".to_vec(), sec, nsec + 1);
        assert!(journal.add_event(&mut a).unwrap());
        second_offset = journal.file_next_append(0).unwrap();
        assert!(journal.add_event(&mut b).unwrap());
        std::mem::forget(journal);
    }

    let file_path = dir.path().join("journal-0.events");
    let file_len = std::fs::metadata(&file_path).unwrap().len();
    let file = std::fs::File::options().write(true).open(&file_path).unwrap();
    file.set_len(file_len - 10).unwrap();
    drop(file);

    let mut reopened = Journal::open(dir.path()).unwrap();
    assert_eq!(reopened.size(), 1);
    assert_eq!(reopened.file_next_append(0).unwrap(), second_offset);

    let mut c = InEvent::new(b"c".to_vec(), sec, nsec + 2);
    assert!(reopened.add_event(&mut c).unwrap());
    reopened.rewind();
    let first = reopened.next_event(true, false).unwrap().unwrap();
    assert_eq!(first.request_id, b"a");
}
