//! Acceptance phase.
//!
//! Walks candidates in collection order and draws one uniform per
//! still-eligible candidate. Accepting a candidate books both molecules
//! for the step; every later candidate touching a booked molecule is
//! skipped without a draw, which is the mutual-exclusion rule that keeps
//! one reaction per molecule per step.
//!
//! The reservoir pseudo-molecule is never booked (it serves many binders);
//! instead its free-copy pool caps how many surface bindings one step can
//! accept.

use nidus_core::{MolId, SimRng};
use nidus_model::{Candidate, MolArena};

use crate::setup::Reservoir;

/// An accepted candidate, in acceptance order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Accepted {
    pub mol: MolId,
    pub cand: Candidate,
}

pub(crate) fn run(
    mols: &MolArena,
    reservoir: Option<&Reservoir>,
    rng: &mut SimRng,
) -> Vec<Accepted> {
    let mut booked = vec![false; mols.slot_count()];
    let mut reservoir_left = reservoir.map_or(0, Reservoir::free);
    let mut accepted = Vec::new();

    for idx in 0..mols.slot_count() as u32 {
        let id = MolId(idx);
        if mols[id].is_empty {
            continue;
        }
        for cand in &mols[id].candidates {
            if cand.prob <= 0.0 || booked[id.index()] {
                continue;
            }
            let lipid = mols[cand.partner].is_implicit_lipid;
            if lipid {
                if reservoir_left == 0 {
                    continue;
                }
            } else if booked[cand.partner.index()] {
                continue;
            }
            if rng.uniform() < cand.prob {
                booked[id.index()] = true;
                if lipid {
                    reservoir_left -= 1;
                } else {
                    booked[cand.partner.index()] = true;
                }
                accepted.push(Accepted {
                    mol: id,
                    cand: *cand,
                });
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use nidus_core::{ComplexId, RxnId, TemplateId};
    use nidus_model::{Molecule, TrajStatus};
    use smallvec::SmallVec;

    fn mol(id: u32, candidates: Vec<Candidate>) -> Molecule {
        Molecule {
            id: MolId(id),
            template: TemplateId(0),
            complex: ComplexId(id),
            com: DVec3::ZERO,
            ifaces: SmallVec::new(),
            candidates,
            traj_status: TrajStatus::None,
            is_empty: false,
            is_implicit_lipid: false,
            just_dissociated: false,
        }
    }

    fn cand(partner: u32, prob: f64) -> Candidate {
        Candidate {
            partner: MolId(partner),
            partner_iface: 0,
            own_iface: 0,
            rxn: RxnId(0),
            variant: 0,
            flipped: false,
            prob,
        }
    }

    #[test]
    fn certain_candidate_books_both_molecules() {
        let mut arena = MolArena::new();
        arena.alloc(|_| mol(0, vec![cand(1, 1.0)]));
        arena.alloc(|_| mol(1, Vec::new()));
        // A third molecule also wants 1: blocked by the booking.
        arena.alloc(|_| mol(2, vec![cand(1, 1.0)]));
        let mut rng = SimRng::seed_from_u64(0);
        let accepted = run(&arena, None, &mut rng);
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].mol, MolId(0));
        // The blocked candidate consumed no draw.
        assert_eq!(rng.draw_count(), 1);
    }

    #[test]
    fn zero_probability_candidates_consume_no_draws() {
        let mut arena = MolArena::new();
        arena.alloc(|_| mol(0, vec![cand(1, 0.0), cand(2, 0.0)]));
        arena.alloc(|_| mol(1, Vec::new()));
        arena.alloc(|_| mol(2, Vec::new()));
        let mut rng = SimRng::seed_from_u64(0);
        assert!(run(&arena, None, &mut rng).is_empty());
        assert_eq!(rng.draw_count(), 0);
    }

    #[test]
    fn reservoir_pool_caps_surface_acceptances() {
        let mut arena = MolArena::new();
        arena.alloc(|_| mol(0, vec![cand(3, 1.0)]));
        arena.alloc(|_| mol(1, vec![cand(3, 1.0)]));
        arena.alloc(|_| mol(2, vec![cand(3, 1.0)]));
        let lipid = arena.alloc(|_| mol(3, Vec::new()));
        arena[lipid].is_implicit_lipid = true;
        let reservoir = Reservoir {
            mol: lipid,
            template: TemplateId(0),
            total: 10,
            bound: 8,
        };
        let mut rng = SimRng::seed_from_u64(0);
        let accepted = run(&arena, Some(&reservoir), &mut rng);
        // Only two copies were free; the third binder is skipped drawless.
        assert_eq!(accepted.len(), 2);
        assert_eq!(rng.draw_count(), 2);
    }
}
