// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Fixed-width 512-bit integers (§4.1).
//!
//! Two variants share one limb representation (eight little-endian `u64`
//! limbs): [`U512`] treats the high limb as magnitude, [`I512`] treats it as
//! two's-complement sign-and-magnitude. 512 bits is the widest integer that
//! still fits inline (no heap allocation) while covering Murmur3 fingerprints,
//! row-level counters, and signed query-evaluator accumulators.

mod int512;
mod limbs;
mod parse;
mod uint512;

pub use int512::I512;
pub use parse::{decode_c_escapes, Introducer};
pub use uint512::U512;
