//! Zeroth-order creation phase.
//!
//! Runs first in every step. Each creation reaction contributes a Poisson
//! count with mean `rate * volume * dt`; new molecules land at uniform
//! positions with uniform orientations and participate in the rest of the
//! step like any other molecule.

use nidus_core::SimRng;
use nidus_model::{ComplexArena, MolArena, MolTemplate, ReactionNetwork, SpeciesRegistry};

use crate::config::SimConfig;
use crate::setup::{random_orientation, random_position, spawn_molecule};

pub(crate) fn run(
    config: &SimConfig,
    templates: &[MolTemplate],
    registry: &SpeciesRegistry,
    network: &ReactionNetwork,
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    rng: &mut SimRng,
) -> u32 {
    let mut created = 0;
    for &rid in network.creations() {
        let r = network.reaction(rid);
        let Some(target) = r.creates else { continue };
        let mean = r.rates[0].rate * config.volume() * config.dt;
        let count = rng.poisson(mean);
        for _ in 0..count {
            let pos = random_position(rng, config.box_dims);
            let q = random_orientation(rng);
            spawn_molecule(mols, comps, templates, registry, target, pos, q);
            created += 1;
        }
    }
    created
}
