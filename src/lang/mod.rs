// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The language registry: maps a 16-bit language id to its names, loaded
//! from and saved to an INI-style file (§4.8, §6).
//!
//! Recast from the source's module-level singleton into an explicit
//! [`Registry`] value a process constructs once and threads through (§9's
//! "Global state" note); `prinbee-journal`/`language-manager`-style binaries
//! are the only callers expected to reach for a convenience top-level
//! accessor, and this crate does not provide one.

use crate::error::{Error, Result};
use crate::ini;
use std::collections::BTreeMap;
use std::path::Path;

/// A single `[l::<id>]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LanguageEntry {
    pub id: u16,
    pub country: String,
    pub language: String,
    pub country_2_letters: String,
    pub language_2_letters: String,
    pub language_3_letters: String,
}

impl LanguageEntry {
    /// The lookup key this entry is indexed under: `<lang-2-or-3>_<country-2>`,
    /// or just `<lang-2-or-3>` when no country applies (§4.8).
    #[must_use]
    pub fn key(&self) -> String {
        let lang = if self.language_2_letters.is_empty() {
            &self.language_3_letters
        } else {
            &self.language_2_letters
        };
        if self.country_2_letters.is_empty() {
            lang.clone()
        } else {
            format!("{lang}_{}", self.country_2_letters)
        }
    }
}

/// How [`Registry::insert`] reacts to a key collision.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum DuplicateMode {
    /// Reject the insert with `Error::DefinedTwice`.
    #[default]
    Forbidden,
    /// Keep the first entry, silently drop the new one.
    Silent,
    /// Like `Silent`, but the caller can inspect [`Registry::last_warning`].
    Verbose,
}

/// An in-memory language table, loaded from (and saved back to) an INI file.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<u16, LanguageEntry>,
    duplicate_mode: DuplicateMode,
    last_warning: Option<String>,
}

impl Registry {
    #[must_use]
    pub fn new(duplicate_mode: DuplicateMode) -> Self {
        Self {
            entries: BTreeMap::new(),
            duplicate_mode,
            last_warning: None,
        }
    }

    #[must_use]
    pub fn last_warning(&self) -> Option<&str> {
        self.last_warning.as_deref()
    }

    pub fn get(&self, id: u16) -> Option<&LanguageEntry> {
        self.entries.get(&id)
    }

    pub fn find_by_key(&self, key: &str) -> Option<&LanguageEntry> {
        self.entries.values().find(|e| e.key() == key)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<u16> {
        self.entries.keys().copied().collect()
    }

    /// Inserts or replaces an entry at `entry.id`. A key collision with a
    /// *different* id is handled per [`DuplicateMode`]; `1..=65535` is the
    /// legal id range (§6).
    pub fn insert(&mut self, entry: LanguageEntry) -> Result<()> {
        if entry.id == 0 {
            return Err(Error::OutOfRange("language id must be 1..=65535".into()));
        }

        if let Some(existing) = self.entries.values().find(|e| e.key() == entry.key() && e.id != entry.id) {
            let message = format!("duplicate language key '{}' (ids {} and {})", entry.key(), existing.id, entry.id);
            match self.duplicate_mode {
                DuplicateMode::Forbidden => return Err(Error::DefinedTwice(message)),
                DuplicateMode::Silent => return Ok(()),
                DuplicateMode::Verbose => {
                    self.last_warning = Some(message);
                    return Ok(());
                }
            }
        }

        self.entries.insert(entry.id, entry);
        Ok(())
    }

    /// Chooses an unused id at random, for `language-manager --create`
    /// (§6: "assigning previously unused 16-bit ids in random order").
    #[must_use]
    pub fn next_unused_id(&self, candidate: u16) -> u16 {
        let mut id = candidate.max(1);
        while self.entries.contains_key(&id) {
            id = if id == u16::MAX { 1 } else { id + 1 };
        }
        id
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, DuplicateMode::default())
    }

    pub fn load_with_mode(path: impl AsRef<Path>, duplicate_mode: DuplicateMode) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|_| Error::FileNotFound(path.as_ref().display().to_string()))?;
        let sections = ini::parse(&text)?;

        let mut registry = Self::new(duplicate_mode);
        for section in sections {
            let Some(id_str) = section.name.strip_prefix("l::") else {
                continue;
            };
            let id: u16 = id_str
                .parse()
                .map_err(|_| Error::InvalidNumber(format!("bad language section id '{id_str}'")))?;
            let get = |key: &str| section.get(key).map(str::to_owned).unwrap_or_default();
            registry.insert(LanguageEntry {
                id,
                country: get("country"),
                language: get("language"),
                country_2_letters: get("country_2_letters"),
                language_2_letters: get("language_2_letters"),
                language_3_letters: get("language_3_letters"),
            })?;
        }
        Ok(registry)
    }

    /// Writes the registry atomically: serialize to a `.bak` file, then
    /// rename over `path` (§4.8).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let backup = path.with_extension("bak");

        let mut text = String::new();
        for entry in self.entries.values() {
            text.push_str(&format!("[l::{}]\n", entry.id));
            text.push_str(&format!("country = {}\n", entry.country));
            text.push_str(&format!("language = {}\n", entry.language));
            text.push_str(&format!("country_2_letters = {}\n", entry.country_2_letters));
            text.push_str(&format!("language_2_letters = {}\n", entry.language_2_letters));
            text.push_str(&format!("language_3_letters = {}\n\n", entry.language_3_letters));
        }

        std::fs::write(&backup, text)?;
        std::fs::rename(&backup, path)?;
        Ok(())
    }
}
