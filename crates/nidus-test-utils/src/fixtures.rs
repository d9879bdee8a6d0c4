//! Reusable simulation fixtures.
//!
//! Two standard systems:
//!
//! - [`ab_world`] — heterodimerization `A + B -> A.B` in a cube, with an
//!   optional reverse rate.
//! - [`membrane_world`] — a volume species binding an implicit-lipid
//!   reservoir on the bottom face.

use glam::DVec3;
use nidus_core::{RxnId, SpeciesIdx, TemplateId};
use nidus_engine::{ReservoirConfig, SimConfig};
use nidus_model::{IfaceSpec, MolTemplate, RateVariant, Reactant, Reaction, RxnKind};
use smallvec::smallvec;

/// A reactant referencing interface 0, state 0 of a template.
///
/// The species index is a placeholder; `Simulation::new` recomputes it
/// from the registry.
pub fn reactant(template: u32) -> Reactant {
    Reactant {
        template: TemplateId(template),
        iface: 0,
        state: 0,
        species: SpeciesIdx(u32::MAX),
    }
}

/// Two single-interface templates `A` and `B` with equal diffusion.
pub fn ab_templates(copies_a: u32, copies_b: u32) -> Vec<MolTemplate> {
    vec![
        MolTemplate {
            id: TemplateId(0),
            name: "A".into(),
            ifaces: smallvec![IfaceSpec::simple("a", DVec3::ZERO)],
            d_trans: DVec3::splat(50.0),
            d_rot: DVec3::splat(0.2),
            bind_to_surface: false,
            copies: copies_a,
        },
        MolTemplate {
            id: TemplateId(1),
            name: "B".into(),
            ifaces: smallvec![IfaceSpec::simple("b", DVec3::ZERO)],
            d_trans: DVec3::splat(50.0),
            d_rot: DVec3::splat(0.2),
            bind_to_surface: false,
            copies: copies_b,
        },
    ]
}

/// The forward binding reaction `A(a) + B(b) -> A(a).B(b)`.
pub fn ab_binding(id: u32, rate: f64, sigma: f64) -> Reaction {
    Reaction {
        id: RxnId(id),
        kind: RxnKind::Bimolecular,
        reactants: smallvec![reactant(0), reactant(1)],
        rates: smallvec![RateVariant { rate }],
        sigma,
        product_state: None,
        creates: None,
        is_surface: false,
    }
}

/// The reverse reaction `A(a).B(b) -> A(a) + B(b)`.
pub fn ab_dissociation(id: u32, rate: f64, sigma: f64) -> Reaction {
    Reaction {
        id: RxnId(id),
        kind: RxnKind::Dissociation,
        reactants: smallvec![reactant(0), reactant(1)],
        rates: smallvec![RateVariant { rate }],
        sigma,
        product_state: None,
        creates: None,
        is_surface: false,
    }
}

/// A complete reversible `A + B` system in a 20 nm cube.
///
/// `kb = 0` drops the reverse reaction entirely.
pub fn ab_world(
    seed: u64,
    copies: u32,
    ka: f64,
    kb: f64,
) -> (SimConfig, Vec<MolTemplate>, Vec<Reaction>) {
    let config = SimConfig {
        box_dims: DVec3::splat(20.0),
        dt: 1e-5,
        seed,
        obs_interval: 0,
        ..SimConfig::default()
    };
    let mut reactions = vec![ab_binding(0, ka, 1.0)];
    if kb > 0.0 {
        reactions.push(ab_dissociation(1, kb, 1.0));
    }
    (config, ab_templates(copies, copies), reactions)
}

/// A volume species binding an implicit-lipid reservoir on the membrane.
///
/// Template 0 is the binder `A`, template 1 the lipid site `L`; the
/// reservoir holds `sites` copies.
pub fn membrane_world(
    seed: u64,
    copies: u32,
    sites: u64,
    ka: f64,
    kb: f64,
) -> (SimConfig, Vec<MolTemplate>, Vec<Reaction>) {
    let templates = vec![
        MolTemplate {
            id: TemplateId(0),
            name: "A".into(),
            ifaces: smallvec![IfaceSpec::simple("a", DVec3::ZERO)],
            d_trans: DVec3::splat(30.0),
            d_rot: DVec3::splat(0.2),
            bind_to_surface: true,
            copies,
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
    ];
    let config = SimConfig {
        box_dims: DVec3::splat(20.0),
        dt: 1e-5,
        seed,
        obs_interval: 0,
        reservoir: Some(ReservoirConfig {
            template: TemplateId(1),
            total: sites,
        }),
        ..SimConfig::default()
    };
    let mut reactions = vec![Reaction {
        id: RxnId(0),
        kind: RxnKind::Bimolecular,
        reactants: smallvec![reactant(0), reactant(1)],
        rates: smallvec![RateVariant { rate: ka }],
        sigma: 1.0,
        product_state: None,
        creates: None,
        is_surface: true,
    }];
    if kb > 0.0 {
        reactions.push(Reaction {
            id: RxnId(1),
            kind: RxnKind::Dissociation,
            reactants: smallvec![reactant(0), reactant(1)],
            rates: smallvec![RateVariant { rate: kb }],
            sigma: 1.0,
            product_state: None,
            creates: None,
            is_surface: true,
        });
    }
    (config, templates, reactions)
}
