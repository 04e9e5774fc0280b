// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `counters.seq`: a tiny persisted counter handing out the unique ids used
//! to name external attachment files `<id>.bin` (§4.9).

use crate::error::Result;
use std::path::PathBuf;

#[derive(Debug)]
pub struct Counters {
    path: PathBuf,
    next: u32,
}

impl Counters {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let next = match std::fs::read_to_string(&path) {
            Ok(text) => text.trim().parse().unwrap_or(1),
            Err(_) => 1,
        };
        Ok(Self { path, next })
    }

    /// Hands out the next unused id and persists the new watermark.
    pub fn next_id(&mut self) -> Result<u32> {
        let id = self.next;
        self.next += 1;
        std::fs::write(&self.path, self.next.to_string())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.seq");

        let mut counters = Counters::open(&path).unwrap();
        assert_eq!(counters.next_id().unwrap(), 1);
        assert_eq!(counters.next_id().unwrap(), 2);

        let mut reopened = Counters::open(&path).unwrap();
        assert_eq!(reopened.next_id().unwrap(), 3);
    }
}
