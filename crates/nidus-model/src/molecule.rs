//! Dynamic molecule records.

use glam::DVec3;
use nidus_core::{ComplexId, MolId, RxnId, SpeciesIdx, TemplateId};
use smallvec::SmallVec;

/// Symmetric bound-partner reference.
///
/// If interface `i` of molecule `m` holds `BoundPartner { mol, iface }`,
/// then interface `iface` of `mol` must hold the mirror reference back to
/// `(m, i)`. Every topology mutation preserves this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundPartner {
    /// The partner molecule.
    pub mol: MolId,
    /// The partner's interface index.
    pub iface: u8,
}

/// One binding interface instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Interface {
    /// World coordinate.
    pub pos: DVec3,
    /// Discrete state tag (`0..n_states` of the template's spec).
    pub state: u8,
    /// Absolute interface-state species index for the current state.
    pub species: SpeciesIdx,
    /// Bound partner, or `None` when free.
    pub bound: Option<BoundPartner>,
}

impl Interface {
    /// Whether this interface is free to react.
    pub fn is_free(&self) -> bool {
        self.bound.is_none()
    }
}

/// A pending bimolecular reaction candidate.
///
/// Candidates are appended in cell/member/interface scan order during
/// collection; that order is the acceptance tie-break and must not be
/// re-sorted. The probability slot shares the record (the index
/// correspondence between partner entry and probability is structural).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Partner molecule handle (the implicit-lipid record for surface
    /// binding candidates).
    pub partner: MolId,
    /// Partner interface index.
    pub partner_iface: u8,
    /// Own interface index.
    pub own_iface: u8,
    /// The reaction this candidate would perform.
    pub rxn: RxnId,
    /// Rate-variant index within the reaction.
    pub variant: u8,
    /// Whether the scanning molecule matched the reaction's *second*
    /// declared reactant (argument order flag).
    pub flipped: bool,
    /// Acceptance probability, filled by the evaluator (0 until then).
    pub prob: f64,
}

/// Per-step displacement bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrajStatus {
    /// No displacement proposed yet.
    #[default]
    None,
    /// A displacement was proposed but may still be rescaled or resampled.
    CanBeResampled,
    /// Final position applied for this step.
    Propagated,
}

/// A molecule record.
///
/// Slots are recycled: a destroyed molecule is tombstoned (`is_empty`) and
/// its handle pushed on the arena free list, never erased mid-run.
#[derive(Clone, Debug, PartialEq)]
pub struct Molecule {
    /// This record's own handle.
    pub id: MolId,
    /// The species definition.
    pub template: TemplateId,
    /// Owning complex (back-reference; the complex owns the membership).
    pub complex: ComplexId,
    /// Center of mass, world frame.
    pub com: DVec3,
    /// Interface instances, in template order.
    pub ifaces: SmallVec<[Interface; 4]>,
    /// Reaction candidates collected this step, in scan order.
    pub candidates: Vec<Candidate>,
    /// Displacement bookkeeping for this step.
    pub traj_status: TrajStatus,
    /// Tombstone flag; empty slots are skipped by every phase.
    pub is_empty: bool,
    /// Whether this is the implicit-lipid reservoir pseudo-molecule.
    pub is_implicit_lipid: bool,
    /// Set when a bond broke this step; suppresses same-step rebinding.
    pub just_dissociated: bool,
}

impl Molecule {
    /// Indices of interfaces currently free to react.
    pub fn free_ifaces(&self) -> impl Iterator<Item = u8> + '_ {
        self.ifaces
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_free())
            .map(|(n, _)| n as u8)
    }

    /// Whether any interface is bound.
    pub fn has_bonds(&self) -> bool {
        self.ifaces.iter().any(|i| i.bound.is_some())
    }

    /// Reset per-step mutable state (candidates, flags, displacement).
    pub fn reset_step_state(&mut self) {
        self.candidates.clear();
        self.traj_status = TrajStatus::None;
        self.just_dissociated = false;
    }
}
