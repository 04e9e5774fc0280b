// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The typed block framework (§4.2).
//!
//! Every page begins with a 4-byte magic and a packed `(major, minor)`
//! structure version; the remainder is a type-specific structure. Rather
//! than the source library's dynamic, string-keyed field accessor, each
//! block type here exposes statically-typed getter/setter methods at
//! compile-time-known byte offsets (see [`page::Page`]'s doc comment), with
//! a `field(name) -> Value` fallback reserved for diagnostics.

pub mod data;
pub mod free;
pub mod idxp;
pub mod page;
pub mod pidx;
pub mod ptbl;
pub mod schm;
pub mod types;
pub mod value;

pub use data::DataBlock;
pub use free::Free;
pub use idxp::Idxp;
pub use page::{Oid, Page, Ref, HEADER_LEN};
pub use pidx::Pidx;
pub use ptbl::Ptbl;
pub use schm::Schm;
pub use types::BlockType;
pub use value::Value;
