// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Primary-index bucket lookup: `PTBL.primary_index_reference_zero` for
//! bucket 0, the `PIDX` page for buckets `1..N` (§4.4).

use crate::block::{Pidx, Ref};
use crate::dbfile::Dbfile;
use crate::error::{Error, Result};
use crate::hash::murmur3_32;

/// Total bucket count for a table whose pages are `page_size` bytes.
#[must_use]
pub fn bucket_count(page_size: usize) -> u64 {
    crate::block::pidx::bucket_count(page_size)
}

/// The bucket a primary key falls into: its Murmur3 fingerprint mod `N`.
#[must_use]
pub fn bucket_for(key_bytes: &[u8], page_size: usize) -> u64 {
    let fingerprint = murmur3_32(key_bytes, 0);
    u64::from(fingerprint) % bucket_count(page_size)
}

/// Reads the root reference stored for `bucket`. A null (`0`) reference
/// means the bucket is empty.
pub fn get_root(dbfile: &Dbfile, bucket: u64) -> Result<Ref> {
    if bucket == 0 {
        return dbfile.with_header(|ptbl| ptbl.primary_index_reference_zero());
    }

    let pidx_ref = dbfile.with_header(|ptbl| ptbl.primary_index_block())?;
    if pidx_ref == 0 {
        return Err(Error::LogicError("primary index page not allocated".into()));
    }
    let handle = dbfile.get_block(pidx_ref)?;
    #[allow(clippy::unwrap_used)]
    let mut guard = handle.lock().unwrap();
    Pidx::view(&mut guard)?.get(bucket)
}

/// Writes the root reference for `bucket`; mirrors [`get_root`] (§4.4).
pub fn set_root(dbfile: &Dbfile, bucket: u64, value: Ref) -> Result<()> {
    if bucket == 0 {
        return dbfile.with_header_mut(|ptbl| ptbl.set_primary_index_reference_zero(value));
    }

    let pidx_ref = dbfile.with_header(|ptbl| ptbl.primary_index_block())?;
    if pidx_ref == 0 {
        return Err(Error::LogicError("primary index page not allocated".into()));
    }
    let handle = dbfile.get_block(pidx_ref)?;
    {
        #[allow(clippy::unwrap_used)]
        let mut guard = handle.lock().unwrap();
        Pidx::view(&mut guard)?.set(bucket, value)?;
    }
    dbfile.flush_block(pidx_ref, &handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;

    #[test]
    fn bucket_zero_roundtrips_through_ptbl() {
        let dir = tempfile::tempdir().unwrap();
        let dbfile = Dbfile::create(dir.path().join("t.db"), 4096).unwrap();
        dbfile.allocate_new_block(BlockType::Pidx).unwrap();
        dbfile
            .with_header_mut(|ptbl| ptbl.set_primary_index_block(4096))
            .unwrap();

        set_root(&dbfile, 0, 0x2000).unwrap();
        assert_eq!(get_root(&dbfile, 0).unwrap(), 0x2000);
    }

    #[test]
    fn nonzero_bucket_roundtrips_through_pidx() {
        let dir = tempfile::tempdir().unwrap();
        let dbfile = Dbfile::create(dir.path().join("t.db"), 4096).unwrap();
        let (pidx_ref, _) = dbfile.allocate_new_block(BlockType::Pidx).unwrap();
        dbfile
            .with_header_mut(|ptbl| ptbl.set_primary_index_block(pidx_ref))
            .unwrap();

        set_root(&dbfile, 5, 0x3000).unwrap();
        assert_eq!(get_root(&dbfile, 5).unwrap(), 0x3000);
        // Bucket 0 is independent storage and remains empty.
        assert_eq!(get_root(&dbfile, 0).unwrap(), 0);
    }
}
