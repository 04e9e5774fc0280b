// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Testable property 5 / scenario S4: the event status state machine
//! refuses illegal transitions, and once the last live event completes, a
//! reopened journal reports itself empty.

use prinbee_storage::journal::{InEvent, Journal, JournalConfig, Status};

#[test]
fn s4_illegal_transition_is_refused_and_completion_clears_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut journal = Journal::create(dir.path(), JournalConfig::default()).unwrap();
        let mut x = InEvent::new(b"x".to_vec(), 1_700_000_000, 0);
        journal.add_event(&mut x).unwrap();

        assert!(journal.set_status(b"x", Status::Forwarded).unwrap());
        assert!(!journal.set_status(b"x", Status::Ready).unwrap());
        assert!(journal.set_status(b"x", Status::Acknowledged).unwrap());
        assert!(journal.set_status(b"x", Status::Completed).unwrap());
        journal.close().unwrap();
    }

    let reopened = Journal::open(dir.path()).unwrap();
    assert!(reopened.empty());
    assert_eq!(reopened.size(), 0);
}

#[test]
fn s4_unknown_request_id_is_a_logic_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut journal = Journal::create(dir.path(), JournalConfig::default()).unwrap();
    assert!(journal.set_status(b"missing", Status::Forwarded).is_err());
}
