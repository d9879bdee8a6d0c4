//! The simulation context.
//!
//! Process-wide counters that the original system kept as globals (the
//! random-draw counter, live molecule/complex totals) are explicit fields
//! here, owned by the simulation loop and passed by reference into each
//! phase.

use crate::id::StepId;
use crate::rng::SimRng;

/// Shared mutable context threaded through every simulation phase.
#[derive(Clone, Debug)]
pub struct SimContext {
    /// The single random stream driving all stochastic decisions.
    pub rng: SimRng,
    /// Current timestep (0 before the first step).
    pub step: StepId,
    /// Number of live (non-empty) molecules, implicit lipid excluded.
    pub live_molecules: usize,
    /// Number of live (non-empty) complexes.
    pub live_complexes: usize,
}

impl SimContext {
    /// Create a context at step 0 with a fresh stream.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimRng::seed_from_u64(seed),
            step: StepId(0),
            live_molecules: 0,
            live_complexes: 0,
        }
    }
}
