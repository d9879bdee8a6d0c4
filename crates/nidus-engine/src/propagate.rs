//! Diffusion phase.
//!
//! Every complex not already frozen by a reaction samples one rigid-body
//! move: per-axis Gaussian translation with variance `2 D dt` and a
//! small-angle rotation about its center of mass with variance `2 Dr dt`.
//! Walls mirror-reflect; the reflected exit distance equals the incoming
//! overshoot.
//!
//! A complex that still carries unreacted candidates must not end the
//! step overlapping a candidate partner (the pair's probability was
//! evaluated at the pre-move separation). Such complexes sweep: the
//! sampled displacement is halved until the move is clear, and a complex
//! that exhausts its budget keeps its old position.

use glam::{DQuat, DVec3, EulerRot};
use nidus_core::{ComplexId, MolId, SimRng};
use nidus_model::{ComplexArena, MolArena, ReactionNetwork, TrajStatus};
use smallvec::SmallVec;

use crate::config::SimConfig;

// One unreacted candidate pair to keep separated during the sweep.
struct Check {
    owner: MolId,
    own_iface: u8,
    partner: MolId,
    partner_iface: u8,
    sigma: f64,
}

type MemberPos = (DVec3, SmallVec<[DVec3; 4]>);

pub(crate) fn run(
    config: &SimConfig,
    network: &ReactionNetwork,
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    rng: &mut SimRng,
) -> u32 {
    let mut checks: Vec<Check> = Vec::new();
    let mut by_complex: Vec<Vec<u32>> = vec![Vec::new(); comps.slot_count()];
    for mol in mols.iter_live() {
        for c in &mol.candidates {
            if c.prob <= 0.0 || mols[c.partner].is_empty || mols[c.partner].is_implicit_lipid {
                continue;
            }
            let i = checks.len() as u32;
            checks.push(Check {
                owner: mol.id,
                own_iface: c.own_iface,
                partner: c.partner,
                partner_iface: c.partner_iface,
                sigma: network.reaction(c.rxn).sigma,
            });
            by_complex[mol.complex.index()].push(i);
            by_complex[mols[c.partner].complex.index()].push(i);
        }
    }

    let half = config.box_dims * 0.5;
    let mut rescales = 0;

    for idx in 0..comps.slot_count() as u32 {
        let cid = ComplexId(idx);
        if comps[cid].is_empty || comps[cid].traj_status == TrajStatus::Propagated {
            continue;
        }
        if comps[cid]
            .members
            .iter()
            .any(|&m| mols[m].is_implicit_lipid)
        {
            comps[cid].traj_status = TrajStatus::Propagated;
            continue;
        }

        let com = comps[cid].com;
        let d_t = comps[cid].d_trans;
        let d_r = comps[cid].d_rot;
        let std = |d: f64| (2.0 * d * config.dt).sqrt();
        let trans = DVec3::new(
            rng.gaussian() * std(d_t.x),
            rng.gaussian() * std(d_t.y),
            rng.gaussian() * std(d_t.z),
        );
        let mut rot = DVec3::new(
            rng.gaussian() * std(d_r.x),
            rng.gaussian() * std(d_r.y),
            rng.gaussian() * std(d_r.z),
        );
        if comps[cid].is_planar() {
            // Membrane-pinned complexes spin in-plane only.
            rot.x = 0.0;
            rot.y = 0.0;
        }

        let members = comps[cid].members.clone();
        let attempts = if comps[cid].ncross > 0 {
            config.sweep_budget.max(1)
        } else {
            1
        };

        let mut applied = None;
        for attempt in 0..attempts {
            let s = 0.5f64.powi(attempt as i32);
            let Some((new_com, positions)) = transform(mols, &members, com, trans * s, rot * s, half)
            else {
                continue;
            };
            if blocked(mols, cid, &members, &positions, &checks, &by_complex[cid.index()]) {
                continue;
            }
            applied = Some((s, new_com, positions));
            break;
        }

        match applied {
            Some((s, new_com, positions)) => {
                for (&m, (mcom, ifaces)) in members.iter().zip(positions) {
                    mols[m].com = mcom;
                    for (iface, pos) in mols[m].ifaces.iter_mut().zip(ifaces) {
                        iface.pos = pos;
                    }
                    mols[m].traj_status = TrajStatus::Propagated;
                }
                comps[cid].com = new_com;
                comps[cid].traj_trans = trans * s;
                comps[cid].traj_rot = rot * s;
                if s < 1.0 {
                    rescales += 1;
                }
            }
            None => {
                // Budget exhausted: the old position is always clear.
                comps[cid].traj_trans = DVec3::ZERO;
                comps[cid].traj_rot = DVec3::ZERO;
                rescales += 1;
            }
        }
        comps[cid].traj_status = TrajStatus::Propagated;
    }
    rescales
}

// Rigid transform of all member coordinates, with wall reflection.
// Returns None when reflection cannot settle (box smaller than complex).
fn transform(
    mols: &MolArena,
    members: &[MolId],
    com: DVec3,
    trans: DVec3,
    rot: DVec3,
    half: DVec3,
) -> Option<(DVec3, Vec<MemberPos>)> {
    let q = DQuat::from_euler(EulerRot::XYZ, rot.x, rot.y, rot.z);
    let mut new_com = com + trans;
    let mut positions: Vec<MemberPos> = members
        .iter()
        .map(|&m| {
            let mol = &mols[m];
            let mcom = com + q * (mol.com - com) + trans;
            let ifaces = mol.ifaces.iter().map(|i| com + q * (i.pos - com) + trans).collect();
            (mcom, ifaces)
        })
        .collect();

    for _ in 0..8 {
        let adj = wall_adjustment(&positions, half);
        if adj == DVec3::ZERO {
            return Some((new_com, positions));
        }
        for (mcom, ifaces) in &mut positions {
            *mcom += adj;
            for p in ifaces.iter_mut() {
                *p += adj;
            }
        }
        new_com += adj;
    }
    None
}

// Mirror correction for coordinates outside the box: a point overshooting
// a wall by `e` comes to rest `e` inside it.
fn wall_adjustment(positions: &[MemberPos], half: DVec3) -> DVec3 {
    let mut lo = DVec3::INFINITY;
    let mut hi = DVec3::NEG_INFINITY;
    for (mcom, ifaces) in positions {
        lo = lo.min(*mcom);
        hi = hi.max(*mcom);
        for p in ifaces {
            lo = lo.min(*p);
            hi = hi.max(*p);
        }
    }
    let axis = |lo: f64, hi: f64, half: f64| {
        if hi > half {
            -2.0 * (hi - half)
        } else if lo < -half {
            2.0 * (-half - lo)
        } else {
            0.0
        }
    };
    DVec3::new(
        axis(lo.x, hi.x, half.x),
        axis(lo.y, hi.y, half.y),
        axis(lo.z, hi.z, half.z),
    )
}

// Would the proposed positions leave any candidate pair inside its
// binding radius?
fn blocked(
    mols: &MolArena,
    cid: ComplexId,
    members: &[MolId],
    positions: &[MemberPos],
    checks: &[Check],
    involved: &[u32],
) -> bool {
    let moved_pos = |m: MolId, iface: u8| -> Option<DVec3> {
        members
            .iter()
            .position(|&x| x == m)
            .map(|i| positions[i].1[iface as usize])
    };
    for &ci in involved {
        let ch = &checks[ci as usize];
        let owner_in = mols[ch.owner].complex == cid;
        let partner_in = mols[ch.partner].complex == cid;
        if owner_in == partner_in {
            // Both inside (rigid, distance preserved) or neither (this
            // complex is only indirectly on the list).
            continue;
        }
        let pa = match moved_pos(ch.owner, ch.own_iface) {
            Some(p) if owner_in => p,
            _ => mols[ch.owner].ifaces[ch.own_iface as usize].pos,
        };
        let pb = match moved_pos(ch.partner, ch.partner_iface) {
            Some(p) if partner_in => p,
            _ => mols[ch.partner].ifaces[ch.partner_iface as usize].pos,
        };
        if pa.distance(pb) < ch.sigma {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use nidus_core::{RxnId, SpeciesIdx, TemplateId};
    use nidus_model::{
        Candidate, IfaceSpec, MolTemplate, RateVariant, Reactant, Reaction, RxnKind,
        SpeciesRegistry,
    };
    use smallvec::smallvec;

    use crate::setup::spawn_molecule;

    fn world(d: f64) -> (
        SimConfig,
        Vec<MolTemplate>,
        SpeciesRegistry,
        ReactionNetwork,
        MolArena,
        ComplexArena,
    ) {
        let config = SimConfig {
            box_dims: DVec3::splat(20.0),
            dt: 1e-3,
            ..SimConfig::default()
        };
        let templates = vec![MolTemplate {
            id: TemplateId(0),
            name: "A".into(),
            ifaces: smallvec![IfaceSpec::simple("a", DVec3::ZERO)],
            d_trans: DVec3::splat(d),
            d_rot: DVec3::splat(0.01),
            bind_to_surface: false,
            copies: 0,
        }];
        let registry = SpeciesRegistry::build(&templates);
        let network = ReactionNetwork::build(vec![Reaction {
            id: RxnId(0),
            kind: RxnKind::Bimolecular,
            reactants: smallvec![
                Reactant {
                    template: TemplateId(0),
                    iface: 0,
                    state: 0,
                    species: SpeciesIdx(0),
                },
                Reactant {
                    template: TemplateId(0),
                    iface: 0,
                    state: 0,
                    species: SpeciesIdx(0),
                },
            ],
            rates: smallvec![RateVariant { rate: 100.0 }],
            sigma: 1.0,
            product_state: None,
            creates: None,
            is_surface: false,
        }]);
        (
            config,
            templates,
            registry,
            network,
            MolArena::new(),
            ComplexArena::new(),
        )
    }

    #[test]
    fn displacement_variance_matches_two_d_dt() {
        let (config, templates, registry, network, mut mols, mut comps) = world(10.0);
        let a = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::ZERO, DQuat::IDENTITY,
        );
        let cid = mols[a].complex;
        let mut rng = SimRng::seed_from_u64(77);
        let n = 4000;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            run(&config, &network, &mut mols, &mut comps, &mut rng);
            sum_sq += comps[cid].traj_trans.x.powi(2);
            // Recenter so walls never interfere with the statistics.
            mols[a].com = DVec3::ZERO;
            mols[a].ifaces[0].pos = DVec3::ZERO;
            comps[cid].com = DVec3::ZERO;
            comps[cid].traj_status = TrajStatus::None;
        }
        let var = sum_sq / n as f64;
        let expected = 2.0 * 10.0 * config.dt;
        assert!(
            (var - expected).abs() < 0.1 * expected,
            "var {var}, expected {expected}"
        );
    }

    #[test]
    fn positions_never_leave_the_box() {
        let (mut config, templates, registry, network, mut mols, mut comps) = world(2000.0);
        config.box_dims = DVec3::splat(4.0);
        let a = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::new(1.9, 0.0, 0.0), DQuat::IDENTITY,
        );
        let mut rng = SimRng::seed_from_u64(5);
        for _ in 0..500 {
            run(&config, &network, &mut mols, &mut comps, &mut rng);
            assert!(mols[a].com.abs().max_element() <= 2.0 + 1e-9);
            comps[mols[a].complex].traj_status = TrajStatus::None;
        }
    }

    #[test]
    fn candidate_pairs_never_end_overlapped() {
        for seed in 0..20 {
            let (config, templates, registry, network, mut mols, mut comps) = world(500.0);
            let a = spawn_molecule(
                &mut mols, &mut comps, &templates, &registry, TemplateId(0),
                DVec3::ZERO, DQuat::IDENTITY,
            );
            let b = spawn_molecule(
                &mut mols, &mut comps, &templates, &registry, TemplateId(0),
                DVec3::new(1.05, 0.0, 0.0), DQuat::IDENTITY,
            );
            mols[a].candidates.push(Candidate {
                partner: b,
                partner_iface: 0,
                own_iface: 0,
                rxn: RxnId(0),
                variant: 0,
                flipped: false,
                prob: 0.2,
            });
            comps[mols[a].complex].ncross = 1;
            comps[mols[b].complex].ncross = 1;
            let mut rng = SimRng::seed_from_u64(seed);
            run(&config, &network, &mut mols, &mut comps, &mut rng);
            let gap = mols[a].ifaces[0].pos.distance(mols[b].ifaces[0].pos);
            assert!(gap >= 1.0, "seed {seed}: pair overlapped at {gap}");
        }
    }

    #[test]
    fn reflection_is_a_mirror() {
        // A point overshooting the wall by e must come to rest e inside.
        let positions: Vec<MemberPos> = vec![(DVec3::new(2.3, 0.0, 0.0), smallvec![])];
        let adj = wall_adjustment(&positions, DVec3::splat(2.0));
        assert_eq!(adj, DVec3::new(-0.6, 0.0, 0.0));
        // 2.3 - 0.6 = 1.7: exactly 0.3 inside the wall it crossed by 0.3.
    }

    proptest::proptest! {
        #[test]
        fn reflection_settles_inside_and_preserves_overshoot(
            x in -3.9f64..3.9,
            y in -3.9f64..3.9,
            z in -3.9f64..3.9,
        ) {
            use proptest::prelude::*;

            let half = DVec3::splat(2.0);
            let p = DVec3::new(x, y, z);
            let adj = wall_adjustment(&[(p, smallvec![])], half);
            let q = p + adj;

            prop_assert!(q.abs().max_element() <= 2.0 + 1e-12);
            for axis in 0..3 {
                let (pi, qi) = (p[axis], q[axis]);
                if pi.abs() > 2.0 {
                    // Exit distance inside equals the incoming overshoot.
                    let overshoot = pi.abs() - 2.0;
                    let rest = 2.0 - qi.abs();
                    prop_assert!((rest - overshoot).abs() < 1e-12);
                } else {
                    prop_assert_eq!(pi, qi);
                }
            }

            // Reflection is idempotent: an in-box point is left alone.
            let again = wall_adjustment(&[(q, smallvec![])], half);
            prop_assert_eq!(again, DVec3::ZERO);
        }
    }
}
