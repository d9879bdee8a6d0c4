//! Test fixtures for Nidus development.
//!
//! Standard small systems used across the workspace's integration tests:
//! an `A + B -> A.B` pair with optional dissociation, and a
//! membrane-binding system with an implicit-lipid reservoir.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    ab_binding, ab_dissociation, ab_templates, ab_world, membrane_world, reactant,
};
