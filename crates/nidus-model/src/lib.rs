//! Data model for the Nidus reaction-diffusion engine.
//!
//! Defines the static species descriptions ([`MolTemplate`], the
//! [`SpeciesRegistry`] of absolute interface-state indices), the dynamic
//! records ([`Molecule`], [`Complex`]) with their recyclable arenas, and
//! the closed reaction-definition set ([`Reaction`], [`RxnKind`],
//! [`ReactionNetwork`]).
//!
//! Two invariants every mutation must preserve:
//! - bound-interface references are symmetric;
//! - complex membership partitions the live molecule set exactly.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod complex;
pub mod molecule;
pub mod reaction;
pub mod registry;
pub mod template;

pub use arena::{ComplexArena, MolArena};
pub use complex::Complex;
pub use molecule::{BoundPartner, Candidate, Interface, Molecule, TrajStatus};
pub use reaction::{RateVariant, Reactant, Reaction, ReactionNetwork, RxnKind, RxnMatch};
pub use registry::SpeciesRegistry;
pub use template::{IfaceSpec, MolTemplate};
