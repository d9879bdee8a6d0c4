//! Probability evaluation phase.
//!
//! Fills every collected candidate's probability slot from the memoized
//! pair tables. Deterministic: no random draws happen here, so table
//! cache misses (which trigger solves) cannot perturb the stream.

use nidus_core::{MolId, StepError};
use nidus_model::{Complex, ComplexArena, MolArena, ReactionNetwork};
use nidus_tables::{PairParams, PairTable};

use crate::collect::pair_separation;
use crate::config::SimConfig;
use crate::setup::Reservoir;

fn d_mean(c: &Complex) -> f64 {
    (c.d_trans.x + c.d_trans.y + c.d_trans.z) / 3.0
}

pub(crate) fn run(
    config: &SimConfig,
    network: &ReactionNetwork,
    mols: &mut MolArena,
    comps: &ComplexArena,
    tables: &mut PairTable,
    reservoir: Option<&Reservoir>,
) -> Result<(), StepError> {
    for idx in 0..mols.slot_count() as u32 {
        let id = MolId(idx);
        if mols[id].is_empty {
            continue;
        }
        for k in 0..mols[id].candidates.len() {
            let cand = mols[id].candidates[k];
            let r = network.reaction(cand.rxn);
            let ka = r.rates[cand.variant as usize].rate;
            if mols[cand.partner].is_empty {
                return Err(StepError::StaleHandle { mol: cand.partner });
            }

            let (separation, d_tot, scale) = if mols[cand.partner].is_implicit_lipid {
                let comp = &comps[mols[id].complex];
                let dz = if comp.is_planar() {
                    0.0
                } else {
                    mols[id].ifaces[cand.own_iface as usize].pos.z - config.membrane_z()
                };
                let res = reservoir.ok_or(StepError::StaleHandle { mol: cand.partner })?;
                let frac = if res.total == 0 {
                    0.0
                } else {
                    res.free() as f64 / res.total as f64
                };
                (dz.max(r.sigma), d_mean(comp), frac)
            } else {
                let pa = mols[id].ifaces[cand.own_iface as usize].pos;
                let pb = mols[cand.partner].ifaces[cand.partner_iface as usize].pos;
                let ca = &comps[mols[id].complex];
                let cb = &comps[mols[cand.partner].complex];
                let d_tot = d_mean(ca) + d_mean(cb);
                (pair_separation(ca, cb, pa, pb).max(r.sigma), d_tot, 1.0)
            };

            let prob = if d_tot <= 0.0 || ka <= 0.0 {
                // A fully pinned pair has no relative motion to react by.
                0.0
            } else if config.force_accept {
                1.0
            } else {
                let params = PairParams {
                    d_tot,
                    ka,
                    sigma: r.sigma,
                    dt: config.dt,
                };
                tables.lookup(&params, separation)?.assoc_prob * scale
            };
            mols[id].candidates[k].prob = prob;
        }
    }
    Ok(())
}
