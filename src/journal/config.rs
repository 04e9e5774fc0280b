// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! `journal.conf`: the persisted configuration a [`super::Journal`] is
//! opened with (§4.9).

use crate::error::{Error, Result};
use crate::ini;
use std::path::Path;

/// When a mutation's write is considered durable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Sync {
    /// No explicit flush; rely on the OS's own write-back schedule.
    None,
    /// Flush the process's user-space buffer (still survives a process
    /// crash, not a power loss).
    #[default]
    Flush,
    /// `fsync` after each mutation.
    Full,
}

/// What happens to a journal file once every event in it has completed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum FileManagement {
    /// Write a two-byte zero end-marker and keep using the file.
    #[default]
    Keep,
    /// `ftruncate` to the last append point.
    Truncate,
    /// Unlink the file once it holds no live events.
    Delete,
}

/// How an external (file-backed) attachment gets materialised into the
/// journal directory, in fallback order (§4.9).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AttachmentCopyHandling {
    #[default]
    Softlink,
    Hardlink,
    Reflink,
    Full,
}

/// Validated journal configuration, persisted in `journal.conf`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JournalConfig {
    pub sync: Sync,
    pub file_management: FileManagement,
    pub compress_when_full: bool,
    pub maximum_number_of_files: u8,
    pub maximum_file_size: u64,
    pub maximum_events: u32,
    pub inline_attachment_size_threshold: u32,
    pub attachment_copy_handling: AttachmentCopyHandling,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            sync: Sync::default(),
            file_management: FileManagement::default(),
            compress_when_full: true,
            maximum_number_of_files: 2,
            maximum_file_size: 16 * 1024 * 1024,
            maximum_events: 10_000,
            inline_attachment_size_threshold: 4096,
            attachment_copy_handling: AttachmentCopyHandling::default(),
        }
    }
}

impl JournalConfig {
    /// Range-checks every field against §4.9's documented bounds.
    pub fn validate(&self) -> Result<()> {
        if !(2..=255).contains(&self.maximum_number_of_files) {
            return Err(Error::OutOfRange("maximum_number_of_files must be 2..=255".into()));
        }
        if !(64 * 1024..=128 * 1024 * 1024).contains(&self.maximum_file_size) {
            return Err(Error::OutOfRange("maximum_file_size must be 64KiB..=128MiB".into()));
        }
        if !(100..=100_000).contains(&self.maximum_events) {
            return Err(Error::OutOfRange("maximum_events must be 100..=100000".into()));
        }
        if !(256..=16 * 1024).contains(&self.inline_attachment_size_threshold) {
            return Err(Error::OutOfRange(
                "inline_attachment_size_threshold must be 256B..=16KiB".into(),
            ));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|_| Error::FileNotFound(path.as_ref().display().to_string()))?;
        let sections = ini::parse(&text)?;
        let Some(section) = sections.into_iter().find(|s| s.name == "journal") else {
            return Err(Error::MissingParameter("[journal] section".into()));
        };

        let mut config = Self::default();
        if let Some(v) = section.get("sync") {
            config.sync = match v {
                "none" => Sync::None,
                "flush" => Sync::Flush,
                "full" => Sync::Full,
                other => return Err(Error::UnknownParameter(format!("sync = {other}"))),
            };
        }
        if let Some(v) = section.get("file_management") {
            config.file_management = match v {
                "keep" => FileManagement::Keep,
                "truncate" => FileManagement::Truncate,
                "delete" => FileManagement::Delete,
                other => return Err(Error::UnknownParameter(format!("file_management = {other}"))),
            };
        }
        if let Some(v) = section.get("compress_when_full") {
            config.compress_when_full = v == "true" || v == "1";
        }
        if let Some(v) = section.get("maximum_number_of_files") {
            config.maximum_number_of_files =
                v.parse().map_err(|_| Error::InvalidNumber(v.to_string()))?;
        }
        if let Some(v) = section.get("maximum_file_size") {
            config.maximum_file_size = v.parse().map_err(|_| Error::InvalidNumber(v.to_string()))?;
        }
        if let Some(v) = section.get("maximum_events") {
            config.maximum_events = v.parse().map_err(|_| Error::InvalidNumber(v.to_string()))?;
        }
        if let Some(v) = section.get("inline_attachment_size_threshold") {
            config.inline_attachment_size_threshold =
                v.parse().map_err(|_| Error::InvalidNumber(v.to_string()))?;
        }
        if let Some(v) = section.get("attachment_copy_handling") {
            config.attachment_copy_handling = match v {
                "softlink" => AttachmentCopyHandling::Softlink,
                "hardlink" => AttachmentCopyHandling::Hardlink,
                "reflink" => AttachmentCopyHandling::Reflink,
                "full" => AttachmentCopyHandling::Full,
                other => return Err(Error::UnknownParameter(format!("attachment_copy_handling = {other}"))),
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let sync = match self.sync {
            Sync::None => "none",
            Sync::Flush => "flush",
            Sync::Full => "full",
        };
        let file_management = match self.file_management {
            FileManagement::Keep => "keep",
            FileManagement::Truncate => "truncate",
            FileManagement::Delete => "delete",
        };
        let attachment_copy_handling = match self.attachment_copy_handling {
            AttachmentCopyHandling::Softlink => "softlink",
            AttachmentCopyHandling::Hardlink => "hardlink",
            AttachmentCopyHandling::Reflink => "reflink",
            AttachmentCopyHandling::Full => "full",
        };

        let text = format!(
            "[journal]\n\
             sync = {sync}\n\
             file_management = {file_management}\n\
             compress_when_full = {}\n\
             maximum_number_of_files = {}\n\
             maximum_file_size = {}\n\
             maximum_events = {}\n\
             inline_attachment_size_threshold = {}\n\
             attachment_copy_handling = {attachment_copy_handling}\n",
            self.compress_when_full,
            self.maximum_number_of_files,
            self.maximum_file_size,
            self.maximum_events,
            self.inline_attachment_size_threshold,
        );
        std::fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        JournalConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_file_count() {
        let mut config = JournalConfig::default();
        config.maximum_number_of_files = 1;
        assert!(matches!(config.validate(), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.conf");
        let mut config = JournalConfig::default();
        config.sync = Sync::Full;
        config.attachment_copy_handling = AttachmentCopyHandling::Hardlink;
        config.save(&path).unwrap();

        let reloaded = JournalConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }
}
