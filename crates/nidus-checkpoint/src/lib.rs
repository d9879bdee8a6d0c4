//! Binary checkpoint format for exact run continuation.
//!
//! A [`Snapshot`] captures everything a run needs to continue
//! bit-identically: arena slots with their free lists and generation
//! counters, the full random-stream state, solved probability tables,
//! and reservoir accounting. Per-step transients are never stored;
//! capture happens between steps where they are structurally empty.
//!
//! # Format
//!
//! ```text
//! [MAGIC "NIDS"] [VERSION u8] [step u64] [rng state]
//! [molecule slots] [complex slots] [tables] [reservoir]
//! ```
//!
//! All integers are little-endian; collections are prefixed with a
//! `u32` count. The codec is hand-rolled (no serde dependency) so the
//! byte layout is explicit and stable.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod snapshot;

pub use codec::{read_snapshot, write_snapshot};
pub use error::CheckpointError;
pub use hash::state_hash;
pub use snapshot::{ReservoirState, Snapshot};

/// Magic bytes at the start of every checkpoint file.
pub const MAGIC: [u8; 4] = *b"NIDS";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
