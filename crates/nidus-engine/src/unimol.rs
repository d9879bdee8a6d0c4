//! Unimolecular phase: destruction, dissociation, spontaneous state flips.
//!
//! Visits live molecules in ascending handle order; each molecule performs
//! at most one unimolecular event per step. Acceptance is the exact
//! first-order probability `1 - exp(-k dt)` per reaction. Bond breaks flag
//! both ends as freshly dissociated, which suppresses re-binding for the
//! rest of the step.

use glam::DVec3;
use nidus_core::{MolId, SimRng};
use nidus_model::{ComplexArena, MolArena, MolTemplate, ReactionNetwork, SpeciesRegistry};

use crate::config::SimConfig;
use crate::setup::Reservoir;
use crate::topology::{
    destroy_molecule, reflect_complex, split_complex, translate_complex, unbind_iface,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct UnimolOutcome {
    pub destroyed: u32,
    pub dissociations: u32,
    pub state_changes: u32,
}

pub(crate) fn run(
    config: &SimConfig,
    templates: &[MolTemplate],
    registry: &SpeciesRegistry,
    network: &ReactionNetwork,
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    mut reservoir: Option<&mut Reservoir>,
    rng: &mut SimRng,
) -> UnimolOutcome {
    let mut out = UnimolOutcome::default();
    let accept = |rng: &mut SimRng, rate: f64| rng.uniform() < 1.0 - (-rate * config.dt).exp();

    for idx in 0..mols.slot_count() as u32 {
        let id = MolId(idx);
        if mols[id].is_empty || mols[id].is_implicit_lipid {
            continue;
        }

        let mut destroyed = false;
        for &rid in network.destructions_for(mols[id].template) {
            if accept(rng, network.reaction(rid).rates[0].rate) {
                let released = destroy_molecule(mols, comps, id, templates);
                if let Some(res) = reservoir.as_deref_mut() {
                    res.bound -= released;
                }
                out.destroyed += 1;
                destroyed = true;
                break;
            }
        }
        if destroyed {
            continue;
        }

        'ifaces: for i in 0..mols[id].ifaces.len() {
            let species = mols[id].ifaces[i].species;
            let bound = mols[id].ifaces[i].bound;
            match bound {
                Some(partner) => {
                    let lipid = mols[partner.mol].is_implicit_lipid;
                    // Each bond's break probability is drawn once, from
                    // the lower (molecule, interface) end.
                    if !lipid && (partner.mol, partner.iface) < (id, i as u8) {
                        continue;
                    }
                    let other = mols[partner.mol].ifaces[partner.iface as usize].species;
                    for m in network.dissociations_for(species, other) {
                        let r = network.reaction(m.rxn);
                        if !accept(rng, r.rates[m.variant as usize].rate) {
                            continue;
                        }
                        unbind_iface(mols, id, i as u8);
                        if lipid {
                            if let Some(res) = reservoir.as_deref_mut() {
                                res.bound -= 1;
                            }
                            // Re-derive surface pinning and diffusion.
                            split_complex(mols, comps, mols[id].complex, templates);
                        } else {
                            split_complex(mols, comps, mols[id].complex, templates);
                            restore_separation(mols, comps, id, i as u8, partner.mol,
                                partner.iface, r.sigma, config.box_dims);
                        }
                        out.dissociations += 1;
                        break 'ifaces;
                    }
                }
                None => {
                    for m in network.unimol_for(species) {
                        let r = network.reaction(m.rxn);
                        let Some(state) = r.product_state else { continue };
                        if !accept(rng, r.rates[m.variant as usize].rate) {
                            continue;
                        }
                        mols[id].ifaces[i].state = state;
                        mols[id].ifaces[i].species =
                            registry.species(mols[id].template, i as u8, state);
                        out.state_changes += 1;
                        break 'ifaces;
                    }
                }
            }
        }
    }
    out
}

// Push the freed fragment out along the bond axis so the two interfaces
// sit exactly at the unbinding radius, then fold any wall overshoot back
// inside.
fn restore_separation(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    a: MolId,
    ia: u8,
    b: MolId,
    ib: u8,
    sigma: f64,
    box_dims: DVec3,
) {
    let moved = mols[b].complex;
    if moved == mols[a].complex {
        // A ring bond broke without splitting connectivity; the bound
        // geometry stands.
        return;
    }
    let anchor = mols[a].ifaces[ia as usize].pos;
    let current = mols[b].ifaces[ib as usize].pos;
    let axis = current - anchor;
    let dir = if axis.length() > 1e-12 {
        axis / axis.length()
    } else {
        DVec3::X
    };
    translate_complex(mols, comps, moved, anchor + dir * sigma - current);
    reflect_complex(mols, comps, moved, box_dims);
}
