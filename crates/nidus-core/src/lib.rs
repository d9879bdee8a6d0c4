//! Core types for the Nidus reaction-diffusion engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! strongly-typed identifiers, subsystem error enums, special functions,
//! the seeded random stream, and the simulation context that every other
//! Nidus crate builds on.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod id;
pub mod math;
pub mod rng;

pub use context::SimContext;
pub use error::{GridError, StepError, TableError};
pub use id::{ComplexId, MolId, RxnId, SpeciesIdx, StepId, TemplateId};
pub use rng::{RngState, SimRng};
