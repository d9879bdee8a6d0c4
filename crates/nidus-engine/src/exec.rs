//! Execution phase for accepted collision events.
//!
//! Events execute in acceptance order. A binding moves the partner's
//! complex to contact along the current approach axis, creates the bond,
//! and merges memberships; the merged complex is marked propagated so the
//! step's diffusion pass leaves the fresh geometry alone. Surface bindings
//! consume a reservoir copy and pin the complex to the membrane plane.

use glam::DVec3;
use nidus_core::StepError;
use nidus_model::{
    ComplexArena, MolArena, MolTemplate, ReactionNetwork, RxnKind, SpeciesRegistry, TrajStatus,
};

use crate::config::SimConfig;
use crate::select::Accepted;
use crate::setup::Reservoir;
use crate::topology::{bind_ifaces, merge_complexes, reflect_complex, translate_complex};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ExecOutcome {
    pub associations: u32,
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
    accepted: &[Accepted],
) -> Result<ExecOutcome, StepError> {
    let mut out = ExecOutcome::default();
    for event in accepted {
        let a = event.mol;
        let cand = event.cand;
        if mols[a].is_empty || mols[cand.partner].is_empty {
            return Err(StepError::StaleHandle { mol: cand.partner });
        }
        let r = network.reaction(cand.rxn);
        match r.kind {
            RxnKind::Bimolecular if r.is_surface => {
                let Some(res) = reservoir.as_deref_mut() else {
                    return Err(StepError::StaleHandle { mol: cand.partner });
                };
                mols[a].ifaces[cand.own_iface as usize].bound =
                    Some(nidus_model::BoundPartner {
                        mol: res.mol,
                        iface: 0,
                    });
                res.bound += 1;
                let cid = mols[a].complex;
                let drop = config.membrane_z() - mols[a].ifaces[cand.own_iface as usize].pos.z;
                translate_complex(mols, comps, cid, DVec3::new(0.0, 0.0, drop));
                comps[cid].on_surface = true;
                comps[cid].refresh_from_members(mols, templates);
                comps[cid].traj_status = TrajStatus::Propagated;
                out.associations += 1;
            }
            RxnKind::Bimolecular => {
                let b = cand.partner;
                let ca = mols[a].complex;
                let cb = mols[b].complex;
                if ca != cb {
                    // Close the gap to the binding radius, moving the
                    // partner's complex along the approach axis.
                    let pa = mols[a].ifaces[cand.own_iface as usize].pos;
                    let pb = mols[b].ifaces[cand.partner_iface as usize].pos;
                    let axis = pb - pa;
                    let dir = if axis.length() > 1e-12 {
                        axis / axis.length()
                    } else {
                        DVec3::X
                    };
                    translate_complex(mols, comps, cb, pa + dir * r.sigma - pb);
                }
                bind_ifaces(mols, a, cand.own_iface, b, cand.partner_iface);
                merge_complexes(mols, comps, ca, cb, templates);
                // The contact translation may have crossed a wall; fold
                // the merged complex back in (rigid, so the bond holds).
                reflect_complex(mols, comps, ca, config.box_dims);
                comps[ca].traj_status = TrajStatus::Propagated;
                out.associations += 1;
            }
            RxnKind::BiMolStateChange => {
                // The product state applies to the first declared
                // reactant; the flipped flag says which end that is.
                let (target, iface) = if cand.flipped && !mols[cand.partner].is_implicit_lipid {
                    (cand.partner, cand.partner_iface)
                } else {
                    (a, cand.own_iface)
                };
                let Some(state) = r.product_state else {
                    return Err(StepError::MalformedCandidate {
                        rxn: r.id,
                        kind: r.kind.name(),
                    });
                };
                let template = mols[target].template;
                mols[target].ifaces[iface as usize].state = state;
                mols[target].ifaces[iface as usize].species =
                    registry.species(template, iface, state);
                out.state_changes += 1;
            }
            _ => {
                return Err(StepError::MalformedCandidate {
                    rxn: r.id,
                    kind: r.kind.name(),
                });
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};
    use nidus_core::{MolId, RxnId, SpeciesIdx, TemplateId};
    use nidus_model::{Candidate, IfaceSpec, RateVariant, Reactant, Reaction};
    use smallvec::smallvec;

    use crate::config::ReservoirConfig;
    use crate::setup::{populate, spawn_molecule};
    use nidus_core::SimRng;

    fn binding(is_surface: bool) -> Reaction {
        Reaction {
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
                    template: TemplateId(if is_surface { 1 } else { 0 }),
                    iface: 0,
                    state: 0,
                    species: SpeciesIdx(if is_surface { 1 } else { 0 }),
                },
            ],
            rates: smallvec![RateVariant { rate: 100.0 }],
            sigma: 1.0,
            product_state: None,
            creates: None,
            is_surface,
        }
    }

    fn templates() -> Vec<MolTemplate> {
        vec![
            MolTemplate {
                id: TemplateId(0),
                name: "A".into(),
                ifaces: smallvec![IfaceSpec::simple("a", DVec3::ZERO)],
                d_trans: DVec3::splat(10.0),
                d_rot: DVec3::splat(0.1),
                bind_to_surface: true,
                copies: 0,
            },
            MolTemplate {
                id: TemplateId(1),
                name: "L".into(),
                ifaces: smallvec![IfaceSpec::simple("l", DVec3::ZERO)],
                d_trans: DVec3::ZERO,
                d_rot: DVec3::ZERO,
                bind_to_surface: false,
                copies: 0,
            },
        ]
    }

    fn accepted(a: MolId, partner: MolId) -> Vec<Accepted> {
        vec![Accepted {
            mol: a,
            cand: Candidate {
                partner,
                partner_iface: 0,
                own_iface: 0,
                rxn: RxnId(0),
                variant: 0,
                flipped: false,
                prob: 1.0,
            },
        }]
    }

    #[test]
    fn binding_merges_at_contact_and_freezes_motion() {
        let config = SimConfig {
            box_dims: DVec3::splat(20.0),
            ..SimConfig::default()
        };
        let templates = templates();
        let registry = nidus_model::SpeciesRegistry::build(&templates);
        let network = ReactionNetwork::build(vec![binding(false)]);
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let a = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::ZERO, DQuat::IDENTITY,
        );
        let b = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::new(1.4, 0.0, 0.0), DQuat::IDENTITY,
        );
        let out = run(
            &config, &templates, &registry, &network, &mut mols, &mut comps, None,
            &accepted(a, b),
        )
        .unwrap();

        assert_eq!(out.associations, 1);
        assert_eq!(mols[a].complex, mols[b].complex);
        let c = &comps[mols[a].complex];
        assert_eq!(c.members.len(), 2);
        assert_eq!(c.traj_status, TrajStatus::Propagated);
        let gap = mols[a].ifaces[0].pos.distance(mols[b].ifaces[0].pos);
        assert!((gap - 1.0).abs() < 1e-12, "bound at sigma, got {gap}");
        assert!(mols[a].ifaces[0].bound.is_some());
    }

    #[test]
    fn binding_near_a_wall_folds_the_merged_pair_inside() {
        let config = SimConfig {
            box_dims: DVec3::splat(20.0),
            ..SimConfig::default()
        };
        let templates = templates();
        let registry = nidus_model::SpeciesRegistry::build(&templates);
        let network = ReactionNetwork::build(vec![binding(false)]);
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        // The contact translation pushes b to x = 10.3, past the wall.
        let a = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::new(9.3, 0.0, 0.0), DQuat::IDENTITY,
        );
        let b = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::new(9.8, 0.0, 0.0), DQuat::IDENTITY,
        );
        run(
            &config, &templates, &registry, &network, &mut mols, &mut comps, None,
            &accepted(a, b),
        )
        .unwrap();

        assert!(mols[a].com.abs().max_element() <= 10.0);
        assert!(mols[b].com.abs().max_element() <= 10.0);
        // The fold is rigid: the fresh bond still sits at sigma.
        let gap = mols[a].ifaces[0].pos.distance(mols[b].ifaces[0].pos);
        assert!((gap - 1.0).abs() < 1e-12, "bound at {gap}");
        assert!((mols[b].com.x - 9.7).abs() < 1e-12);
    }

    #[test]
    fn surface_binding_pins_to_the_membrane_and_spends_a_copy() {
        let mut config = SimConfig {
            box_dims: DVec3::splat(20.0),
            ..SimConfig::default()
        };
        config.reservoir = Some(ReservoirConfig {
            template: TemplateId(1),
            total: 100,
        });
        let templates = templates();
        let registry = nidus_model::SpeciesRegistry::build(&templates);
        let network = ReactionNetwork::build(vec![binding(true)]);
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let mut rng = SimRng::seed_from_u64(0);
        let mut res =
            populate(&config, &templates, &registry, &mut mols, &mut comps, &mut rng).unwrap();
        let a = spawn_molecule(
            &mut mols, &mut comps, &templates, &registry, TemplateId(0),
            DVec3::new(0.0, 0.0, -9.5), DQuat::IDENTITY,
        );
        let lipid = res.mol;
        run(
            &config, &templates, &registry, &network, &mut mols, &mut comps, Some(&mut res),
            &accepted(a, lipid),
        )
        .unwrap();

        assert_eq!(res.free(), 99);
        assert_eq!(mols[a].ifaces[0].pos.z, -10.0);
        let c = &comps[mols[a].complex];
        assert!(c.on_surface);
        assert_eq!(c.d_trans.z, 0.0);
        assert_eq!(c.traj_status, TrajStatus::Propagated);
        // One-sided bond: the reservoir record stays free.
        assert!(mols[lipid].ifaces[0].bound.is_none());
    }
}
