// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Materialising an external attachment into `<dir>/<id>.bin` (§4.9):
//! `attachment_copy_handling` names where in the fallback chain
//! `hard-link -> reflink -> full copy -> symlink` to start trying.

use super::config::AttachmentCopyHandling;
use crate::error::Result;
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Writes `source` into the journal directory as `<id>.bin`, starting at
/// `preference` in the canonical fallback chain and falling through to the
/// next method on failure. Symlink is the chain's last resort and is made
/// absolute so the journal stays valid regardless of working directory.
pub fn materialize<FS: FileSystem>(
    source: &Path,
    destination: &Path,
    preference: AttachmentCopyHandling,
) -> Result<()> {
    let absolute_source = absolute_path(source)?;

    let chain: &[AttachmentCopyHandling] = &[
        AttachmentCopyHandling::Hardlink,
        AttachmentCopyHandling::Reflink,
        AttachmentCopyHandling::Full,
        AttachmentCopyHandling::Softlink,
    ];
    let start = chain.iter().position(|m| *m == preference).unwrap_or(0);

    let mut last_error = None;
    for method in &chain[start..] {
        let attempt = match method {
            AttachmentCopyHandling::Hardlink => FS::hard_link(&absolute_source, destination),
            AttachmentCopyHandling::Reflink => FS::reflink_or_copy(&absolute_source, destination),
            AttachmentCopyHandling::Full => FS::reflink_or_copy(&absolute_source, destination),
            AttachmentCopyHandling::Softlink => FS::symlink(&absolute_source, destination),
        };
        match attempt {
            Ok(()) => return Ok(()),
            Err(e) => last_error = Some(e),
        }
    }

    #[allow(clippy::unwrap_used)]
    Err(last_error.unwrap().into())
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
