//! Initial state construction and molecule spawning.

use glam::{DQuat, DVec3, EulerRot};
use nidus_core::{MolId, SimRng, TemplateId};
use nidus_model::{
    Complex, ComplexArena, Interface, MolArena, MolTemplate, Molecule, SpeciesRegistry, TrajStatus,
};
use smallvec::SmallVec;

use crate::config::SimConfig;

/// Live accounting for the implicit-membrane reservoir.
///
/// One pseudo-molecule record stands in for every membrane site; bonds
/// into it are one-sided and the copy pool is tracked here by counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reservoir {
    /// The pseudo-molecule record binders point at.
    pub mol: MolId,
    /// Template describing one site.
    pub template: TemplateId,
    /// Total site copies.
    pub total: u64,
    /// Copies currently bound.
    pub bound: u64,
}

impl Reservoir {
    /// Copies currently free to bind.
    pub fn free(&self) -> u64 {
        self.total - self.bound
    }
}

/// A uniformly random orientation from three stream draws.
pub fn random_orientation(rng: &mut SimRng) -> DQuat {
    let tau = std::f64::consts::TAU;
    DQuat::from_euler(
        EulerRot::XYZ,
        rng.uniform() * tau,
        rng.uniform() * tau,
        rng.uniform() * tau,
    )
}

/// A uniformly random position inside the box (three stream draws).
pub fn random_position(rng: &mut SimRng, box_dims: DVec3) -> DVec3 {
    DVec3::new(
        (rng.uniform() - 0.5) * box_dims.x,
        (rng.uniform() - 0.5) * box_dims.y,
        (rng.uniform() - 0.5) * box_dims.z,
    )
}

/// Spawn one molecule of a template in its own fresh complex.
///
/// Interfaces are placed at the template offsets under the given
/// orientation; all interfaces start in state 0.
pub fn spawn_molecule(
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    templates: &[MolTemplate],
    registry: &SpeciesRegistry,
    template: TemplateId,
    pos: DVec3,
    orientation: DQuat,
) -> MolId {
    let spec = &templates[template.index()];
    let cid = comps.alloc(|id| Complex {
        id,
        members: Vec::new(),
        com: pos,
        d_trans: spec.d_trans,
        d_rot: spec.d_rot,
        ncross: 0,
        traj_status: TrajStatus::None,
        traj_trans: DVec3::ZERO,
        traj_rot: DVec3::ZERO,
        is_empty: false,
        on_surface: false,
    });
    let ifaces: SmallVec<[Interface; 4]> = spec
        .ifaces
        .iter()
        .enumerate()
        .map(|(i, f)| Interface {
            pos: pos + orientation * f.offset,
            state: 0,
            species: registry.species(template, i as u8, 0),
            bound: None,
        })
        .collect();
    let mid = mols.alloc(|id| Molecule {
        id,
        template,
        complex: cid,
        com: pos,
        ifaces,
        candidates: Vec::new(),
        traj_status: TrajStatus::None,
        is_empty: false,
        is_implicit_lipid: false,
        just_dissociated: false,
    });
    comps[cid].members.push(mid);
    mid
}

/// Place the initial population and (when configured) the reservoir.
///
/// Molecules are placed template by template in declaration order, each
/// at a uniform position with a uniform orientation (six draws per copy),
/// so the initial state is a pure function of config and seed.
pub fn populate(
    config: &SimConfig,
    templates: &[MolTemplate],
    registry: &SpeciesRegistry,
    mols: &mut MolArena,
    comps: &mut ComplexArena,
    rng: &mut SimRng,
) -> Option<Reservoir> {
    let reservoir_template = config.reservoir.map(|r| r.template);
    for t in templates {
        if Some(t.id) == reservoir_template {
            continue;
        }
        for _ in 0..t.copies {
            let pos = random_position(rng, config.box_dims);
            let q = random_orientation(rng);
            spawn_molecule(mols, comps, templates, registry, t.id, pos, q);
        }
    }
    config.reservoir.map(|res| {
        let pos = DVec3::new(0.0, 0.0, config.membrane_z());
        let mid = spawn_molecule(
            mols,
            comps,
            templates,
            registry,
            res.template,
            pos,
            DQuat::IDENTITY,
        );
        mols[mid].is_implicit_lipid = true;
        let cid = mols[mid].complex;
        comps[cid].on_surface = true;
        comps[cid].d_trans = DVec3::ZERO;
        comps[cid].d_rot = DVec3::ZERO;
        Reservoir {
            mol: mid,
            template: res.template,
            total: res.total,
            bound: 0,
        }
    })
}
