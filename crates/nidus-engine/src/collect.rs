//! Candidate collection phase.
//!
//! Scans each grid cell's members against later members of the same cell
//! and all members of forward-neighbor cells, so every distinct pair is
//! considered exactly once, from exactly one direction. A pair within the
//! reaction cutoff becomes a [`Candidate`] on the scanning molecule with a
//! zero probability slot; no random draws happen here.
//!
//! Candidate order is the acceptance tie-break order. It derives from
//! cell index, member order within each cell, and interface order, all of
//! which are functions of state and seed alone.

use glam::DVec3;
use nidus_core::MolId;
use nidus_model::{Candidate, Complex, ComplexArena, MolArena, ReactionNetwork};
use nidus_grid::CellGrid;

use crate::config::SimConfig;
use crate::setup::Reservoir;

fn d_mean(c: &Complex) -> f64 {
    (c.d_trans.x + c.d_trans.y + c.d_trans.z) / 3.0
}

// Two membrane-pinned complexes close their gap in-plane only; the
// out-of-plane offset has no diffusive motion behind it.
pub(crate) fn pair_separation(ca: &Complex, cb: &Complex, pa: DVec3, pb: DVec3) -> f64 {
    if ca.is_planar() && cb.is_planar() {
        (pa.truncate() - pb.truncate()).length()
    } else {
        pa.distance(pb)
    }
}

fn scan_pair(
    config: &SimConfig,
    network: &ReactionNetwork,
    mols: &MolArena,
    comps: &ComplexArena,
    a: MolId,
    b: MolId,
    staged: &mut Vec<(MolId, Candidate)>,
) {
    let (ma, mb) = (&mols[a], &mols[b]);
    if ma.complex == mb.complex {
        return;
    }
    // A freshly broken bond sits at contact; re-binding is deferred one
    // step so the pair can diffuse apart first.
    if ma.just_dissociated || mb.just_dissociated {
        return;
    }
    let d_tot = d_mean(&comps[ma.complex]) + d_mean(&comps[mb.complex]);
    let spread = 3.0 * (6.0 * d_tot * config.dt).sqrt();
    for ia in ma.free_ifaces() {
        for ib in mb.free_ifaces() {
            let sa = ma.ifaces[ia as usize].species;
            let sb = mb.ifaces[ib as usize].species;
            for m in network.matches_for_pair(sa, sb) {
                let r = network.reaction(m.rxn);
                let dist = pair_separation(
                    &comps[ma.complex],
                    &comps[mb.complex],
                    ma.ifaces[ia as usize].pos,
                    mb.ifaces[ib as usize].pos,
                );
                if dist <= r.sigma + spread {
                    staged.push((
                        a,
                        Candidate {
                            partner: b,
                            partner_iface: ib,
                            own_iface: ia,
                            rxn: m.rxn,
                            variant: m.variant,
                            flipped: m.flipped,
                            prob: 0.0,
                        },
                    ));
                }
            }
        }
    }
}

pub(crate) fn run(
    config: &SimConfig,
    network: &ReactionNetwork,
    grid: &CellGrid,
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    reservoir: Option<&Reservoir>,
) -> u32 {
    let mut staged: Vec<(MolId, Candidate)> = Vec::new();

    for cell in 0..grid.cell_count() {
        let members = grid.members(cell);
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                scan_pair(config, network, mols, comps, a, b, &mut staged);
            }
            for &nb in grid.forward_neighbors(cell) {
                for &b in grid.members(nb as usize) {
                    scan_pair(config, network, mols, comps, a, b, &mut staged);
                }
            }
        }
    }

    if let Some(res) = reservoir {
        for idx in 0..mols.slot_count() as u32 {
            let id = MolId(idx);
            let m = &mols[id];
            if m.is_empty || m.is_implicit_lipid || m.just_dissociated {
                continue;
            }
            let comp = &comps[m.complex];
            let d_tot = d_mean(comp);
            let spread = 3.0 * (6.0 * d_tot * config.dt).sqrt();
            for ia in m.free_ifaces() {
                let species = m.ifaces[ia as usize].species;
                for mt in network.surface_matches(species) {
                    let r = network.reaction(mt.rxn);
                    // An already-pinned complex touches the membrane by
                    // definition; otherwise use the vertical clearance.
                    let dz = if comp.is_planar() {
                        0.0
                    } else {
                        m.ifaces[ia as usize].pos.z - config.membrane_z()
                    };
                    if dz <= r.sigma + spread {
                        staged.push((
                            id,
                            Candidate {
                                partner: res.mol,
                                partner_iface: 0,
                                own_iface: ia,
                                rxn: mt.rxn,
                                variant: mt.variant,
                                flipped: mt.flipped,
                                prob: 0.0,
                            },
                        ));
                    }
                }
            }
        }
    }

    let total = staged.len() as u32;
    for (owner, cand) in staged {
        let ca = mols[owner].complex;
        comps[ca].ncross += 1;
        if !mols[cand.partner].is_implicit_lipid {
            let cb = mols[cand.partner].complex;
            comps[cb].ncross += 1;
        }
        mols[owner].candidates.push(cand);
    }
    total
}
