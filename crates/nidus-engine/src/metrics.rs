//! Per-step event accounting.

use nidus_core::StepId;

/// Event counts for one completed step.
///
/// Returned by [`Simulation::step`](crate::Simulation::step); callers that
/// do not care can drop it without cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The step this report covers (the value before advancing).
    pub step: StepId,
    /// Molecules created by zeroth-order reactions.
    pub created: u32,
    /// Molecules removed by destruction reactions.
    pub destroyed: u32,
    /// Accepted binding events (surface bindings included).
    pub associations: u32,
    /// Accepted bond-break events (surface unbindings included).
    pub dissociations: u32,
    /// Accepted interface state flips, collision-driven or spontaneous.
    pub state_changes: u32,
    /// Bimolecular candidates collected this step.
    pub candidates: u32,
    /// Complexes whose displacement was rescaled or dropped to avoid
    /// overlapping a reaction partner.
    pub overlap_rescales: u32,
    /// Live molecules after the step (reservoir record excluded).
    pub live_molecules: usize,
    /// Live complexes after the step.
    pub live_complexes: usize,
}

/// Cumulative totals over a [`run`](crate::Simulation::run) call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Steps executed.
    pub steps: u64,
    /// Total molecules created.
    pub created: u64,
    /// Total molecules destroyed.
    pub destroyed: u64,
    /// Total accepted bindings.
    pub associations: u64,
    /// Total accepted bond breaks.
    pub dissociations: u64,
    /// Total accepted state flips.
    pub state_changes: u64,
}

impl RunSummary {
    /// Fold one step's report into the totals.
    pub fn absorb(&mut self, report: &StepReport) {
        self.steps += 1;
        self.created += u64::from(report.created);
        self.destroyed += u64::from(report.destroyed);
        self.associations += u64::from(report.associations);
        self.dissociations += u64::from(report.dissociations);
        self.state_changes += u64::from(report.state_changes);
    }
}
