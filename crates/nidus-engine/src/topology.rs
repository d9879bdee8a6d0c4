//! Bond and membership mutations.
//!
//! Every routine here preserves the two structural invariants the phases
//! rely on: bound-partner references are symmetric (the implicit-lipid
//! reservoir excepted, whose record fans out to many binders), and live
//! molecules partition exactly into live complexes.

use glam::DVec3;
use nidus_core::{ComplexId, MolId};
use nidus_model::{BoundPartner, Complex, ComplexArena, MolArena, MolTemplate, TrajStatus};

/// Create a symmetric bond between two interfaces.
pub fn bind_ifaces(mols: &mut MolArena, a: MolId, ia: u8, b: MolId, ib: u8) {
    mols[a].ifaces[ia as usize].bound = Some(BoundPartner { mol: b, iface: ib });
    mols[b].ifaces[ib as usize].bound = Some(BoundPartner { mol: a, iface: ia });
}

/// Break the bond on interface `ia` of `a`, flagging both ends as freshly
/// dissociated. Returns the former partner.
///
/// A bond into the implicit-lipid reservoir is one-sided; only the
/// molecular end is cleared and flagged.
pub fn unbind_iface(mols: &mut MolArena, a: MolId, ia: u8) -> Option<BoundPartner> {
    let partner = mols[a].ifaces[ia as usize].bound.take()?;
    mols[a].just_dissociated = true;
    if !mols[partner.mol].is_implicit_lipid {
        mols[partner.mol].ifaces[partner.iface as usize].bound = None;
        mols[partner.mol].just_dissociated = true;
    }
    Some(partner)
}

/// Rigidly translate a complex and all member coordinates.
pub fn translate_complex(mols: &mut MolArena, comps: &mut ComplexArena, cid: ComplexId, shift: DVec3) {
    for i in 0..comps[cid].members.len() {
        let m = comps[cid].members[i];
        mols[m].com += shift;
        for iface in &mut mols[m].ifaces {
            iface.pos += shift;
        }
    }
    comps[cid].com += shift;
}

/// Fold a complex back inside the box after a reaction moved it.
///
/// Same mirror rule as the diffusion phase: a coordinate overshooting a
/// wall by `e` comes to rest `e` inside it. Reaction placement (contact
/// translation, dissociation push-out) marks the complex propagated, so
/// the diffusion pass never gets a chance to reflect it; this must run
/// before the next grid refresh.
pub fn reflect_complex(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    cid: ComplexId,
    box_dims: DVec3,
) {
    let half = box_dims * 0.5;
    for _ in 0..8 {
        let mut lo = DVec3::INFINITY;
        let mut hi = DVec3::NEG_INFINITY;
        for &m in &comps[cid].members {
            lo = lo.min(mols[m].com);
            hi = hi.max(mols[m].com);
            for iface in &mols[m].ifaces {
                lo = lo.min(iface.pos);
                hi = hi.max(iface.pos);
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
        let adj = DVec3::new(
            axis(lo.x, hi.x, half.x),
            axis(lo.y, hi.y, half.y),
            axis(lo.z, hi.z, half.z),
        );
        if adj == DVec3::ZERO {
            return;
        }
        translate_complex(mols, comps, cid, adj);
    }
}

/// Merge `src`'s membership into `dst`, release `src`, and refresh the
/// merged record. A no-op (plus refresh) when the two are the same.
pub fn merge_complexes(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    dst: ComplexId,
    src: ComplexId,
    templates: &[MolTemplate],
) {
    if dst != src {
        let moved = std::mem::take(&mut comps[src].members);
        for &m in &moved {
            mols[m].complex = dst;
        }
        let surf = comps[src].on_surface || comps[dst].on_surface;
        comps[dst].members.extend(moved);
        comps[dst].on_surface = surf;
        comps.release(src);
    }
    comps[dst].refresh_from_members(mols, templates);
}

/// Re-partition a complex into bond-connected components.
///
/// The first component keeps the original handle; every further component
/// gets a fresh complex. Surface pinning is recomputed per component from
/// surviving reservoir bonds. Returns the resulting complex handles.
pub fn split_complex(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    cid: ComplexId,
    templates: &[MolTemplate],
) -> Vec<ComplexId> {
    let members = std::mem::take(&mut comps[cid].members);
    let mut assigned = vec![usize::MAX; members.len()];
    let mut groups: Vec<Vec<MolId>> = Vec::new();

    for start in 0..members.len() {
        if assigned[start] != usize::MAX {
            continue;
        }
        let g = groups.len();
        let mut group = Vec::new();
        let mut queue = vec![start];
        assigned[start] = g;
        while let Some(j) = queue.pop() {
            group.push(members[j]);
            for iface in &mols[members[j]].ifaces {
                let Some(p) = iface.bound else { continue };
                if mols[p.mol].is_implicit_lipid {
                    continue;
                }
                if let Some(k) = members.iter().position(|&m| m == p.mol) {
                    if assigned[k] == usize::MAX {
                        assigned[k] = g;
                        queue.push(k);
                    }
                }
            }
        }
        groups.push(group);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (g, group) in groups.into_iter().enumerate() {
        let target = if g == 0 {
            comps[cid].members = group;
            cid
        } else {
            comps.alloc(|id| Complex {
                id,
                members: group,
                com: DVec3::ZERO,
                d_trans: DVec3::ZERO,
                d_rot: DVec3::ZERO,
                ncross: 0,
                traj_status: TrajStatus::None,
                traj_trans: DVec3::ZERO,
                traj_rot: DVec3::ZERO,
                is_empty: false,
                on_surface: false,
            })
        };
        let surf = comps[target].members.iter().any(|&m| {
            mols[m]
                .ifaces
                .iter()
                .any(|i| i.bound.is_some_and(|p| mols[p.mol].is_implicit_lipid))
        });
        comps[target].on_surface = surf;
        for i in 0..comps[target].members.len() {
            let m = comps[target].members[i];
            mols[m].complex = target;
        }
        comps[target].refresh_from_members(mols, templates);
        out.push(target);
    }
    out
}

/// Remove a molecule from the system: break its bonds, drop it from its
/// complex, release the record, and re-partition what remains.
///
/// Returns the number of reservoir bonds released so the caller can
/// return those copies to the free pool.
pub fn destroy_molecule(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    mid: MolId,
    templates: &[MolTemplate],
) -> u64 {
    let mut reservoir_released = 0;
    for i in 0..mols[mid].ifaces.len() {
        if mols[mid].ifaces[i].bound.is_some() {
            let partner = unbind_iface(mols, mid, i as u8);
            if partner.is_some_and(|p| mols[p.mol].is_implicit_lipid) {
                reservoir_released += 1;
            }
        }
    }
    let cid = mols[mid].complex;
    comps[cid].members.retain(|&m| m != mid);
    mols.release(mid);
    if comps[cid].members.is_empty() {
        comps.release(cid);
    } else {
        split_complex(mols, comps, cid, templates);
    }
    reservoir_released
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use nidus_core::{SpeciesIdx, TemplateId};
    use nidus_model::{IfaceSpec, Interface, Molecule};
    use smallvec::smallvec;

    fn template() -> MolTemplate {
        MolTemplate {
            id: TemplateId(0),
            name: "A".into(),
            ifaces: smallvec![
                IfaceSpec::simple("x", DVec3::ZERO),
                IfaceSpec::simple("y", DVec3::ZERO)
            ],
            d_trans: DVec3::splat(10.0),
            d_rot: DVec3::splat(0.1),
            bind_to_surface: false,
            copies: 0,
        }
    }

    fn spawn(mols: &mut MolArena, comps: &mut ComplexArena, pos: DVec3) -> (MolId, ComplexId) {
        let cid = comps.alloc(|id| Complex {
            id,
            members: Vec::new(),
            com: pos,
            d_trans: DVec3::splat(10.0),
            d_rot: DVec3::splat(0.1),
            ncross: 0,
            traj_status: TrajStatus::None,
            traj_trans: DVec3::ZERO,
            traj_rot: DVec3::ZERO,
            is_empty: false,
            on_surface: false,
        });
        let mid = mols.alloc(|id| Molecule {
            id,
            template: TemplateId(0),
            complex: cid,
            com: pos,
            ifaces: smallvec![
                Interface {
                    pos,
                    state: 0,
                    species: SpeciesIdx(0),
                    bound: None,
                },
                Interface {
                    pos,
                    state: 0,
                    species: SpeciesIdx(1),
                    bound: None,
                },
            ],
            candidates: Vec::new(),
            traj_status: TrajStatus::None,
            is_empty: false,
            is_implicit_lipid: false,
            just_dissociated: false,
        });
        comps[cid].members.push(mid);
        (mid, cid)
    }

    #[test]
    fn bind_is_symmetric_and_unbind_flags_both_ends() {
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, _) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        let (b, _) = spawn(&mut mols, &mut comps, DVec3::X);

        bind_ifaces(&mut mols, a, 0, b, 1);
        assert_eq!(
            mols[a].ifaces[0].bound,
            Some(BoundPartner { mol: b, iface: 1 })
        );
        assert_eq!(
            mols[b].ifaces[1].bound,
            Some(BoundPartner { mol: a, iface: 0 })
        );

        unbind_iface(&mut mols, a, 0);
        assert!(mols[a].ifaces[0].bound.is_none());
        assert!(mols[b].ifaces[1].bound.is_none());
        assert!(mols[a].just_dissociated && mols[b].just_dissociated);
    }

    #[test]
    fn merge_moves_membership_and_halves_diffusion() {
        let templates = vec![template()];
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        let (b, cb) = spawn(&mut mols, &mut comps, DVec3::new(2.0, 0.0, 0.0));

        merge_complexes(&mut mols, &mut comps, ca, cb, &templates);
        assert_eq!(comps[ca].members, vec![a, b]);
        assert_eq!(mols[b].complex, ca);
        assert!(comps[cb].is_empty);
        assert!((comps[ca].d_trans.x - 5.0).abs() < 1e-12);
        assert_eq!(comps[ca].com, DVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn split_separates_disconnected_members() {
        let templates = vec![template()];
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        let (b, cb) = spawn(&mut mols, &mut comps, DVec3::X);
        let (c, cc) = spawn(&mut mols, &mut comps, DVec3::new(2.0, 0.0, 0.0));
        bind_ifaces(&mut mols, a, 0, b, 1);
        bind_ifaces(&mut mols, b, 0, c, 1);
        merge_complexes(&mut mols, &mut comps, ca, cb, &templates);
        merge_complexes(&mut mols, &mut comps, ca, cc, &templates);

        // Break the a-b bond: connectivity is now {a}, {b, c}.
        unbind_iface(&mut mols, a, 0);
        let parts = split_complex(&mut mols, &mut comps, ca, &templates);
        assert_eq!(parts.len(), 2);
        assert_eq!(comps[parts[0]].members, vec![a]);
        assert_eq!(comps[parts[1]].members, vec![b, c]);
        assert_eq!(mols[c].complex, parts[1]);
    }

    #[test]
    fn destroy_releases_bonds_membership_and_slot() {
        let templates = vec![template()];
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        let (b, cb) = spawn(&mut mols, &mut comps, DVec3::X);
        bind_ifaces(&mut mols, a, 0, b, 1);
        merge_complexes(&mut mols, &mut comps, ca, cb, &templates);

        destroy_molecule(&mut mols, &mut comps, a, &templates);
        assert!(mols[a].is_empty);
        assert!(mols[b].ifaces[1].bound.is_none());
        assert!(mols[b].just_dissociated);
        assert_eq!(comps[ca].members, vec![b]);
        assert_eq!(mols.live_count(), 1);
        assert_eq!(comps.live_count(), 1);
    }

    #[test]
    fn destroying_a_lone_molecule_releases_its_complex() {
        let templates = vec![template()];
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        destroy_molecule(&mut mols, &mut comps, a, &templates);
        assert!(comps[ca].is_empty);
        assert_eq!(comps.live_count(), 0);
    }

    #[test]
    fn reflect_folds_overshoot_back_inside() {
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::new(10.5, 0.0, 0.0));

        reflect_complex(&mut mols, &mut comps, ca, DVec3::splat(20.0));
        // Overshot by 0.5, so it rests 0.5 inside the wall.
        assert_eq!(mols[a].com, DVec3::new(9.5, 0.0, 0.0));
        assert_eq!(mols[a].ifaces[0].pos, DVec3::new(9.5, 0.0, 0.0));
        assert_eq!(comps[ca].com, DVec3::new(9.5, 0.0, 0.0));

        // An in-box complex is left alone.
        reflect_complex(&mut mols, &mut comps, ca, DVec3::splat(20.0));
        assert_eq!(mols[a].com, DVec3::new(9.5, 0.0, 0.0));
    }

    #[test]
    fn translate_moves_members_and_reference_point() {
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let (a, ca) = spawn(&mut mols, &mut comps, DVec3::ZERO);
        translate_complex(&mut mols, &mut comps, ca, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(mols[a].com, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(mols[a].ifaces[0].pos, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(comps[ca].com, DVec3::new(1.0, 2.0, 3.0));
    }
}
