// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Streaming non-cryptographic hashing (§4.1).
//!
//! Two hash families are used:
//! - [`IncrementalHash`], a streaming `xxh3` digest backing bloom filters
//!   and general map keys.
//! - [`murmur3_32`], the fixed Murmur3 fingerprint the primary index (§4.4)
//!   keys its buckets with; this one has a fixed, specified algorithm so it
//!   is implemented directly rather than borrowed from a hashing crate.

use xxhash_rust::xxh3::Xxh3Default;

/// A streaming, resettable non-cryptographic hash.
#[derive(Clone)]
pub struct IncrementalHash {
    hasher: Xxh3Default,
}

impl Default for IncrementalHash {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalHash {
    /// Starts a new incremental hash.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: Xxh3Default::new(),
        }
    }

    /// Feeds more bytes into the hash.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Finalizes and returns the 64-bit digest. The hash can keep being fed
    /// more bytes afterward; this does not consume `self`.
    #[must_use]
    pub fn digest64(&self) -> u64 {
        self.hasher.digest()
    }

    /// Finalizes and returns the 128-bit digest.
    #[must_use]
    pub fn digest128(&self) -> u128 {
        self.hasher.digest128()
    }
}

/// One-shot helper equivalent to feeding `data` into a fresh [`IncrementalHash`].
#[must_use]
pub fn hash64(data: &[u8]) -> u64 {
    let mut h = IncrementalHash::new();
    h.update(data);
    h.digest64()
}

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Murmur3 (x86, 32-bit) fingerprint, used by the primary index (§4.4) to
/// pick a row's bucket: `bucket = murmur3_32(key, 0) mod N`.
#[must_use]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;
    let chunks = data.chunks_exact(4);
    let remainder = chunks.remainder();

    for chunk in chunks {
        #[allow(clippy::unwrap_used)]
        let mut k = u32::from_le_bytes(chunk.try_into().unwrap());
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let mut k1: u32 = 0;
    for (i, &byte) in remainder.iter().enumerate().rev() {
        k1 ^= u32::from(byte) << (8 * i);
    }
    if !remainder.is_empty() {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        hash ^= k1;
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^= hash >> 16;
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn murmur3_known_vector() {
        // Reference vector for Murmur3 x86_32, seed 0.
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"test", 0), 0xba6b_d213);
    }

    #[test]
    fn murmur3_is_deterministic() {
        assert_eq!(murmur3_32(b"prinbee", 42), murmur3_32(b"prinbee", 42));
    }

    #[test]
    fn incremental_hash_matches_one_shot() {
        let mut h = IncrementalHash::new();
        h.update(b"abc");
        h.update(b"def");
        let incremental = h.digest64();
        assert_eq!(incremental, hash64(b"abcdef"));
    }
}
