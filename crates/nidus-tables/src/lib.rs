//! Reaction-probability tables for diffusing pairs.
//!
//! Converts macroscopic rate constants into per-step event probabilities
//! by solving the irreversible pair Green's function, then memoizes the
//! results per (pair class, separation bin) so each solve happens once.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod gf;
pub mod solve;
pub mod table;

pub use nidus_core::TableError;
pub use table::{PairDump, PairKey, PairParams, PairTable, TableDump, TableEntry};
