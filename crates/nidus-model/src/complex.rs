//! Complex records and diffusion-tensor aggregation.

use glam::DVec3;
use nidus_core::{ComplexId, MolId};

use crate::arena::MolArena;
use crate::molecule::TrajStatus;
use crate::template::MolTemplate;

/// A rigid group of bound molecules sharing one diffusive motion per step.
///
/// The complex owns its member set; each member molecule holds a
/// non-owning back-reference. Membership partitions the live molecule set
/// exactly: every non-empty molecule belongs to exactly one complex.
#[derive(Clone, Debug, PartialEq)]
pub struct Complex {
    /// This record's own handle.
    pub id: ComplexId,
    /// Member molecule handles (unordered).
    pub members: Vec<MolId>,
    /// Center of mass of the membership, world frame.
    pub com: DVec3,
    /// Aggregate translational diffusion constants per axis.
    pub d_trans: DVec3,
    /// Aggregate rotational diffusion constants per axis.
    pub d_rot: DVec3,
    /// Count of members with at least one pending reaction candidate.
    pub ncross: u32,
    /// Displacement bookkeeping for this step.
    pub traj_status: TrajStatus,
    /// Proposed rigid translation for this step.
    pub traj_trans: DVec3,
    /// Proposed rigid rotation (axis angles) for this step.
    pub traj_rot: DVec3,
    /// Tombstone flag.
    pub is_empty: bool,
    /// Pinned to the membrane: out-of-plane diffusion forced to zero.
    pub on_surface: bool,
}

impl Complex {
    /// Whether this complex diffuses only in-plane.
    pub fn is_planar(&self) -> bool {
        self.on_surface || self.d_trans.z < 1e-10
    }

    /// Recompute the center of mass and diffusion tensors from the
    /// current membership.
    ///
    /// Aggregation is drag-additive per axis (`1/D = sum 1/D_i`); a
    /// surface-bound complex keeps `D.z = 0` regardless of membership.
    pub fn refresh_from_members(&mut self, mols: &MolArena, templates: &[MolTemplate]) {
        let mut com = DVec3::ZERO;
        let mut inv_t = DVec3::ZERO;
        let mut inv_r = DVec3::ZERO;
        for &m in &self.members {
            let mol = &mols[m];
            let t = &templates[mol.template.index()];
            com += mol.com;
            inv_t += recip_or_zero(t.d_trans);
            inv_r += recip_or_zero(t.d_rot);
        }
        let n = self.members.len().max(1) as f64;
        self.com = com / n;
        self.d_trans = recip_or_zero(inv_t);
        self.d_rot = recip_or_zero(inv_r);
        if self.on_surface {
            self.d_trans.z = 0.0;
        }
    }

    /// Reset per-step mutable state.
    pub fn reset_step_state(&mut self) {
        self.ncross = 0;
        self.traj_status = TrajStatus::None;
        self.traj_trans = DVec3::ZERO;
        self.traj_rot = DVec3::ZERO;
    }
}

// Component-wise reciprocal treating 0 as 0 (a zero diffusion axis stays
// pinned rather than becoming infinite drag).
fn recip_or_zero(v: DVec3) -> DVec3 {
    let f = |x: f64| if x > 0.0 { 1.0 / x } else { 0.0 };
    DVec3::new(f(v.x), f(v.y), f(v.z))
}
