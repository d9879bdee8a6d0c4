//! The checkpointable state capture.

use nidus_core::{MolId, RngState, TemplateId};
use nidus_model::{Complex, Molecule};
use nidus_tables::TableDump;

use crate::error::CheckpointError;

/// Reservoir accounting as captured in a checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservoirState {
    /// Handle of the reservoir pseudo-molecule.
    pub mol: MolId,
    /// Template describing one site.
    pub template: TemplateId,
    /// Total site copies.
    pub total: u64,
    /// Copies bound at capture time.
    pub bound: u64,
}

/// Everything needed to continue a run bit-identically.
///
/// Captured between steps, so per-step transients (candidates,
/// displacement bookkeeping, dissociation flags) are structurally empty
/// and are not stored. Slot order, free lists, and generation counters
/// are stored exactly: recycling behavior after resume must match the
/// uninterrupted run.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Step count at capture time.
    pub step: u64,
    /// Full random-stream state.
    pub rng: RngState,
    /// Molecule slots in handle order, tombstones included.
    pub mol_slots: Vec<Molecule>,
    /// Molecule free list, most recently released last.
    pub mol_free: Vec<MolId>,
    /// Per-slot molecule generation counters.
    pub mol_generations: Vec<u32>,
    /// Complex slots in handle order, tombstones included.
    pub comp_slots: Vec<Complex>,
    /// Complex free list.
    pub comp_free: Vec<nidus_core::ComplexId>,
    /// Per-slot complex generation counters.
    pub comp_generations: Vec<u32>,
    /// Solved probability-table contents (resuming re-solves nothing).
    pub tables: TableDump,
    /// Reservoir accounting, if the run has one.
    pub reservoir: Option<ReservoirState>,
}

impl Snapshot {
    /// Check the captured step against what the caller expects.
    pub fn verify_step(&self, expected: u64) -> Result<(), CheckpointError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckpointError::StepMismatch {
                expected,
                found: self.step,
            })
        }
    }
}
