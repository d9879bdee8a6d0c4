//! Nidus: a spatial stochastic reaction-diffusion simulation engine.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Nidus sub-crates. For most users, adding `nidus` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use nidus::prelude::*;
//! use nidus::model::{IfaceSpec, MolTemplate, RateVariant, Reactant, Reaction, RxnKind};
//! use nidus::types::{RxnId, SpeciesIdx, TemplateId};
//! use glam::DVec3;
//! use smallvec::smallvec;
//!
//! // Two single-site species, A and B, that bind reversibly.
//! let template = |id: u32, name: &str, site: &str, copies: u32| MolTemplate {
//!     id: TemplateId(id),
//!     name: name.into(),
//!     ifaces: smallvec![IfaceSpec::simple(site, DVec3::ZERO)],
//!     d_trans: DVec3::splat(50.0),
//!     d_rot: DVec3::splat(0.2),
//!     bind_to_surface: false,
//!     copies,
//! };
//! let reactant = |t: u32| Reactant {
//!     template: TemplateId(t),
//!     iface: 0,
//!     state: 0,
//!     species: SpeciesIdx(0), // recomputed during validation
//! };
//! let binding = Reaction {
//!     id: RxnId(0),
//!     kind: RxnKind::Bimolecular,
//!     reactants: smallvec![reactant(0), reactant(1)],
//!     rates: smallvec![RateVariant { rate: 100.0 }],
//!     sigma: 1.0,
//!     product_state: None,
//!     creates: None,
//!     is_surface: false,
//! };
//!
//! let config = SimConfig {
//!     box_dims: DVec3::splat(20.0),
//!     dt: 1e-6,
//!     seed: 42,
//!     ..SimConfig::default()
//! };
//! let templates = vec![template(0, "A", "a", 10), template(1, "B", "b", 10)];
//! let mut sim = Simulation::new(config, templates, vec![binding]).unwrap();
//! let summary = sim.run(100).unwrap();
//! assert_eq!(summary.steps, 100);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `nidus-core` | IDs, error enums, the random stream, special functions |
//! | [`model`] | `nidus-model` | Templates, molecules, complexes, arenas, the reaction network |
//! | [`grid`] | `nidus-grid` | The cell-list spatial partition |
//! | [`tables`] | `nidus-tables` | Green's-function association tables |
//! | [`obs`] | `nidus-obs` | Copy-number and bond observables |
//! | [`engine`] | `nidus-engine` | The simulation loop and configuration |
//! | [`checkpoint`] | `nidus-checkpoint` | Binary checkpoint encode/decode |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core ids, errors, and the seeded random stream (`nidus-core`).
pub use nidus_core as types;

/// Molecule templates, dynamic records, and reactions (`nidus-model`).
pub use nidus_model as model;

/// Cell-list spatial partition (`nidus-grid`).
pub use nidus_grid as grid;

/// Memoized Green's-function probability tables (`nidus-tables`).
pub use nidus_tables as tables;

/// Observable extraction (`nidus-obs`).
pub use nidus_obs as obs;

/// The simulation loop (`nidus-engine`).
pub use nidus_engine as engine;

/// Binary checkpointing (`nidus-checkpoint`).
pub use nidus_checkpoint as checkpoint;

/// Common imports for typical Nidus usage.
///
/// ```rust
/// use nidus::prelude::*;
/// ```
pub mod prelude {
    // Engine surface
    pub use nidus_engine::{
        ReservoirConfig, RunSummary, SimConfig, SimError, Simulation, StepReport,
    };

    // Ids and errors
    pub use nidus_core::{
        ComplexId, GridError, MolId, RxnId, SpeciesIdx, StepError, StepId, TableError, TemplateId,
    };

    // Model building blocks
    pub use nidus_model::{MolTemplate, Reaction, RxnKind};

    // Observables
    pub use nidus_obs::Counters;

    // Checkpointing
    pub use nidus_checkpoint::{read_snapshot, write_snapshot, CheckpointError, Snapshot};
}
