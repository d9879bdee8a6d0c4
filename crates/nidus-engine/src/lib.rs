//! Single-particle reaction-diffusion simulation loop.
//!
//! [`Simulation`] advances a population of diffusing, reacting molecules
//! through fixed timesteps. Each step runs a fixed phase order: zeroth-order
//! creation, unimolecular events, spatial-grid refresh, bimolecular
//! candidate collection, Green's-function probability evaluation,
//! acceptance, event execution, and rigid-body diffusion with overlap
//! sweeping. All randomness flows through one seeded stream in a
//! documented draw order, so runs are reproducible and checkpointable
//! bit-for-bit.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod collect;
mod evaluate;
mod exec;
mod propagate;
mod select;
mod setup;
mod sim;
mod topology;
mod unimol;
mod zeroth;

pub mod config;
pub mod metrics;

pub use config::{ConfigError, ReservoirConfig, SimConfig};
pub use metrics::{RunSummary, StepReport};
pub use setup::Reservoir;
pub use sim::{SimError, Simulation};
