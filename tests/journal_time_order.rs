// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Testable property 4 / scenario S3, exercised through the public journal
//! API only: colliding timestamps get bumped by a nanosecond until unique,
//! and time-ordered replay returns every live event exactly once in
//! strictly increasing time order.

use prinbee_storage::journal::{InEvent, Journal, JournalConfig};

#[test]
fn s3_colliding_timestamps_bump_and_replay_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = Journal::create(dir.path(), JournalConfig::default()).unwrap();

    let t = 1_700_000_000u64;
    let mut a = InEvent::new(b"a".to_vec(), t, 0);
    let mut b = InEvent::new(b"b".to_vec(), t, 5);
    let mut c = InEvent::new(b"c".to_vec(), t, 5);

    assert!(journal.add_event(&mut a).unwrap());
    assert!(journal.add_event(&mut b).unwrap());
    assert!(journal.add_event(&mut c).unwrap());

    assert_eq!((b.time_sec, b.time_nsec), (t, 5));
    assert_eq!((c.time_sec, c.time_nsec), (t, 6));

    journal.rewind();
    let mut seen = Vec::new();
    let mut last_time = None;
    while let Some(event) = journal.next_event(true, false).unwrap() {
        if let Some(previous) = last_time {
            assert!((event.time_sec, event.time_nsec) > previous);
        }
        last_time = Some((event.time_sec, event.time_nsec));
        seen.push(event.request_id);
    }

    assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(journal.size(), 3);
}
