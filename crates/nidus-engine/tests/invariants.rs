//! Structural invariants that must hold after any number of steps.
//!
//! Each test runs a full simulation and then audits the arenas directly:
//! live molecules partition exactly into live complexes, bonds are
//! symmetric, bonded interfaces sit at the binding radius, and every
//! coordinate stays inside the reflecting box.

use glam::DVec3;
use nidus_engine::{SimConfig, Simulation};
use nidus_model::{ComplexArena, MolArena};
use nidus_test_utils::{ab_binding, ab_dissociation, ab_templates, ab_world};
use proptest::prelude::*;

// ── Audits ──────────────────────────────────────────────────────

/// Every live molecule belongs to exactly one live complex, and complex
/// membership lists agree with the molecules' back-references.
fn audit_partition(mols: &MolArena, comps: &ComplexArena) {
    let mut seen = vec![0u32; mols.slot_count()];
    for comp in comps.iter_live() {
        assert!(!comp.members.is_empty(), "live complex {} has no members", comp.id);
        for &m in &comp.members {
            assert!(!mols[m].is_empty, "complex {} lists empty slot {m}", comp.id);
            assert_eq!(mols[m].complex, comp.id, "molecule {m} back-reference disagrees");
            seen[m.index()] += 1;
        }
    }
    for mol in mols.iter_live() {
        assert_eq!(
            seen[mol.id.index()],
            1,
            "molecule {} appears in {} complexes",
            mol.id,
            seen[mol.id.index()]
        );
    }
}

/// Bound-partner references mirror each other.
fn audit_bond_symmetry(mols: &MolArena) {
    for mol in mols.iter_live() {
        for (i, iface) in mol.ifaces.iter().enumerate() {
            let Some(p) = iface.bound else { continue };
            if mols[p.mol].is_implicit_lipid {
                continue;
            }
            let back = mols[p.mol].ifaces[p.iface as usize]
                .bound
                .expect("one-sided bond between ordinary molecules");
            assert_eq!((back.mol, back.iface), (mol.id, i as u8));
        }
    }
}

/// Bonded interfaces were placed at the binding radius and move rigidly,
/// so their separation never drifts.
fn audit_bond_geometry(mols: &MolArena, sigma: f64) {
    for mol in mols.iter_live() {
        for (i, iface) in mol.ifaces.iter().enumerate() {
            let Some(p) = iface.bound else { continue };
            if mols[p.mol].is_implicit_lipid || (p.mol, p.iface) < (mol.id, i as u8) {
                continue;
            }
            let gap = iface.pos.distance(mols[p.mol].ifaces[p.iface as usize].pos);
            assert!(
                (gap - sigma).abs() < 1e-9,
                "bond {}/{} separation {gap}, binding radius {sigma}",
                mol.id,
                p.mol
            );
        }
    }
}

fn audit_in_box(mols: &MolArena, box_dims: DVec3) {
    let half = box_dims * 0.5;
    for mol in mols.iter_live() {
        assert!(
            mol.com.abs().cmple(half + DVec3::splat(1e-9)).all(),
            "molecule {} escaped to {:?}",
            mol.id,
            mol.com.to_array()
        );
    }
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn arenas_stay_consistent_across_runs(seed in 0u64..1000) {
        let (config, templates, reactions) = ab_world(seed, 25, 1500.0, 50.0);
        let box_dims = config.box_dims;
        let mut sim = Simulation::new(config, templates, reactions).unwrap();
        sim.run(60).unwrap();

        audit_partition(sim.molecules(), sim.complexes());
        audit_bond_symmetry(sim.molecules());
        audit_bond_geometry(sim.molecules(), 1.0);
        audit_in_box(sim.molecules(), box_dims);
    }

    #[test]
    fn molecule_count_is_conserved_without_creation(seed in 0u64..1000) {
        let (config, templates, reactions) = ab_world(seed, 20, 800.0, 0.0);
        let mut sim = Simulation::new(config, templates, reactions).unwrap();
        for _ in 0..40 {
            let report = sim.step().unwrap();
            prop_assert_eq!(report.live_molecules, 40);
            prop_assert_eq!(report.created, 0);
            prop_assert_eq!(report.destroyed, 0);
        }
    }
}

// ── Deterministic scenarios ─────────────────────────────────────

#[test]
fn complexes_shrink_and_grow_through_reversible_binding() {
    let (config, templates, reactions) = ab_world(3, 30, 2000.0, 1000.0);
    let mut sim = Simulation::new(config, templates, reactions).unwrap();
    let summary = sim.run(300).unwrap();
    assert!(summary.associations > 0, "no bindings");
    assert!(summary.dissociations > 0, "no unbindings");

    // Net bonds equal the association/dissociation balance.
    let net = summary.associations - summary.dissociations;
    assert_eq!(sim.observables().bond_count(), net);
    audit_partition(sim.molecules(), sim.complexes());
}

#[test]
fn reaction_placement_never_escapes_the_box() {
    // Unbinding radius close to half the box edge: without wall folding,
    // the post-dissociation push-out lands outside the domain and the
    // next partition refresh fails.
    let config = SimConfig {
        box_dims: DVec3::splat(12.0),
        dt: 1e-5,
        seed: 41,
        obs_interval: 0,
        ..SimConfig::default()
    };
    let reactions = vec![ab_binding(0, 5000.0, 1.0), ab_dissociation(1, 5e5, 5.0)];
    let mut sim = Simulation::new(config, ab_templates(20, 20), reactions).unwrap();
    let summary = sim.run(300).unwrap();
    assert!(summary.dissociations > 0, "no unbindings to place");
    audit_in_box(sim.molecules(), DVec3::splat(12.0));
}

#[test]
fn candidate_bookkeeping_resets_every_step() {
    let (config, templates, reactions) = ab_world(9, 20, 1000.0, 0.0);
    let mut sim = Simulation::new(config, templates, reactions).unwrap();
    sim.run(25).unwrap();
    for mol in sim.molecules().iter_live() {
        assert!(mol.candidates.is_empty());
        assert!(!mol.just_dissociated);
    }
    for comp in sim.complexes().iter_live() {
        assert_eq!(comp.ncross, 0);
    }
}
