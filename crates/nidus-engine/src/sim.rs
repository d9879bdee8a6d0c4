//! The simulation driver.
//!
//! [`Simulation`] owns all run state and executes the fixed phase order:
//! creation, unimolecular events, grid refresh, candidate collection,
//! probability evaluation, acceptance, execution, diffusion, and the
//! per-step reset. Random draws happen only in the phases documented to
//! draw, in a fixed order, so a (config, seed) pair names exactly one
//! trajectory and a mid-run checkpoint continues it bit-identically.

use std::error::Error;
use std::fmt;
use std::io::{Read, Write};

use nidus_checkpoint::{read_snapshot, write_snapshot, CheckpointError, ReservoirState, Snapshot};
use nidus_core::{ComplexId, GridError, MolId, SimContext, SimRng, StepError, StepId};
use nidus_grid::CellGrid;
use nidus_model::{
    ComplexArena, MolArena, MolTemplate, Reaction, ReactionNetwork, SpeciesRegistry,
};
use nidus_obs::Counters;
use nidus_tables::PairTable;

use crate::config::{ConfigError, SimConfig};
use crate::metrics::{RunSummary, StepReport};
use crate::setup::{populate, Reservoir};
use crate::{collect, evaluate, exec, propagate, select, unimol, zeroth};

/// Any failure a simulation can surface.
#[derive(Debug)]
pub enum SimError {
    /// The configuration was rejected before the first step.
    Config(ConfigError),
    /// The spatial partition could not be built.
    Grid(GridError),
    /// A timestep failed mid-flight; the run cannot continue.
    Step(StepError),
    /// Checkpoint encode or decode failed.
    Checkpoint(CheckpointError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Grid(e) => write!(f, "spatial partition: {e}"),
            Self::Step(e) => write!(f, "step failed: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Grid(e) => Some(e),
            Self::Step(e) => Some(e),
            Self::Checkpoint(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GridError> for SimError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<StepError> for SimError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}

impl From<CheckpointError> for SimError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}

/// A running reaction-diffusion system.
pub struct Simulation {
    config: SimConfig,
    templates: Vec<MolTemplate>,
    registry: SpeciesRegistry,
    network: ReactionNetwork,
    mols: MolArena,
    comps: ComplexArena,
    grid: CellGrid,
    tables: PairTable,
    counters: Counters,
    ctx: SimContext,
    reservoir: Option<Reservoir>,
}

impl Simulation {
    /// Validate the inputs and build the initial state.
    ///
    /// Initial placement consumes six uniforms per molecule copy in
    /// template declaration order, so the state after `new` is a pure
    /// function of (config, templates, reactions).
    pub fn new(
        config: SimConfig,
        templates: Vec<MolTemplate>,
        reactions: Vec<Reaction>,
    ) -> Result<Self, SimError> {
        config.validate(&templates, &reactions)?;
        let registry = SpeciesRegistry::build(&templates);
        let reactions = normalize_species(reactions, &registry);
        let r_max = config.r_max(&templates, &reactions);
        let grid = CellGrid::new(config.box_dims, r_max)?;
        let network = ReactionNetwork::build(reactions);
        let counters = Counters::new(&registry);

        let mut ctx = SimContext::new(config.seed);
        let mut mols = MolArena::new();
        let mut comps = ComplexArena::new();
        let reservoir = populate(
            &config,
            &templates,
            &registry,
            &mut mols,
            &mut comps,
            &mut ctx.rng,
        );
        ctx.live_molecules = mols.live_count() - usize::from(reservoir.is_some());
        ctx.live_complexes = comps.live_count();
        log::info!(
            "initialized {} molecules in a {:?} box, seed {}",
            ctx.live_molecules,
            config.box_dims.to_array(),
            config.seed
        );

        Ok(Self {
            config,
            templates,
            registry,
            network,
            mols,
            comps,
            grid,
            tables: PairTable::new(),
            counters,
            ctx,
            reservoir,
        })
    }

    /// Execute one timestep and report its event counts.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        let step = self.ctx.step;

        let created = zeroth::run(
            &self.config,
            &self.templates,
            &self.registry,
            &self.network,
            &mut self.mols,
            &mut self.comps,
            &mut self.ctx.rng,
        );

        let uni = unimol::run(
            &self.config,
            &self.templates,
            &self.registry,
            &self.network,
            &mut self.mols,
            &mut self.comps,
            self.reservoir.as_mut(),
            &mut self.ctx.rng,
        );

        self.grid
            .update(&self.mols, &self.comps)
            .map_err(StepError::from)?;

        let candidates = collect::run(
            &self.config,
            &self.network,
            &self.grid,
            &mut self.mols,
            &mut self.comps,
            self.reservoir.as_ref(),
        );

        evaluate::run(
            &self.config,
            &self.network,
            &mut self.mols,
            &self.comps,
            &mut self.tables,
            self.reservoir.as_ref(),
        )
        .map_err(SimError::Step)?;

        let accepted = select::run(&self.mols, self.reservoir.as_ref(), &mut self.ctx.rng);

        let ex = exec::run(
            &self.config,
            &self.templates,
            &self.registry,
            &self.network,
            &mut self.mols,
            &mut self.comps,
            self.reservoir.as_mut(),
            &accepted,
        )
        .map_err(SimError::Step)?;

        let overlap_rescales = propagate::run(
            &self.config,
            &self.network,
            &mut self.mols,
            &mut self.comps,
            &mut self.ctx.rng,
        );

        for idx in 0..self.mols.slot_count() as u32 {
            let id = MolId(idx);
            if !self.mols[id].is_empty {
                self.mols[id].reset_step_state();
            }
        }
        for idx in 0..self.comps.slot_count() as u32 {
            let id = ComplexId(idx);
            if !self.comps[id].is_empty {
                self.comps[id].reset_step_state();
            }
        }

        self.ctx.live_molecules =
            self.mols.live_count() - usize::from(self.reservoir.is_some());
        self.ctx.live_complexes = self.comps.live_count();
        self.ctx.step = StepId(step.0 + 1);

        Ok(StepReport {
            step,
            created,
            destroyed: uni.destroyed,
            associations: ex.associations,
            dissociations: uni.dissociations,
            state_changes: uni.state_changes + ex.state_changes,
            candidates,
            overlap_rescales,
            live_molecules: self.ctx.live_molecules,
            live_complexes: self.ctx.live_complexes,
        })
    }

    /// Execute `steps` timesteps, logging observables every
    /// [`obs_interval`](SimConfig::obs_interval) steps.
    pub fn run(&mut self, steps: u64) -> Result<RunSummary, SimError> {
        self.run_with_trajectory(steps, |_, _| {})
    }

    /// Execute `steps` timesteps, handing the molecule arena to `visit`
    /// every [`traj_interval`](SimConfig::traj_interval) steps.
    ///
    /// The visitor reads positions and interface states between steps;
    /// nothing it observes feeds back into the trajectory.
    pub fn run_with_trajectory<F>(
        &mut self,
        steps: u64,
        mut visit: F,
    ) -> Result<RunSummary, SimError>
    where
        F: FnMut(StepId, &MolArena),
    {
        let mut summary = RunSummary::default();
        for _ in 0..steps {
            let report = self.step()?;
            summary.absorb(&report);
            if self.config.obs_interval > 0 && self.ctx.step.0 % self.config.obs_interval == 0 {
                self.counters.refresh(&self.mols, &self.comps);
                self.counters.reservoir_free = self.reservoir.as_ref().map(Reservoir::free);
                log::info!(
                    "step {} {}",
                    self.ctx.step,
                    nidus_obs::format_line(&self.counters, &self.registry)
                );
            }
            if self.config.traj_interval > 0 && self.ctx.step.0 % self.config.traj_interval == 0 {
                visit(self.ctx.step, &self.mols);
            }
        }
        Ok(summary)
    }

    /// Refresh and return the current observables.
    pub fn observables(&mut self) -> &Counters {
        self.counters.refresh(&self.mols, &self.comps);
        self.counters.reservoir_free = self.reservoir.as_ref().map(Reservoir::free);
        &self.counters
    }

    /// The current step count (steps completed so far).
    pub fn current_step(&self) -> StepId {
        self.ctx.step
    }

    /// The run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The interface-state species registry.
    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    /// The molecule arena (tombstones included).
    pub fn molecules(&self) -> &MolArena {
        &self.mols
    }

    /// The complex arena (tombstones included).
    pub fn complexes(&self) -> &ComplexArena {
        &self.comps
    }

    /// Reservoir accounting, when the run has one.
    pub fn reservoir(&self) -> Option<&Reservoir> {
        self.reservoir.as_ref()
    }

    /// The memoized pair probability tables.
    pub fn tables(&self) -> &PairTable {
        &self.tables
    }

    /// Uniforms drawn from the stream so far.
    pub fn draw_count(&self) -> u64 {
        self.ctx.rng.draw_count()
    }

    /// Capture the full continuation state.
    ///
    /// Must be called between steps; per-step transients are empty there
    /// and are not stored.
    pub fn capture(&self) -> Snapshot {
        Snapshot {
            step: self.ctx.step.0,
            rng: self.ctx.rng.state(),
            mol_slots: self.mols.slots().to_vec(),
            mol_free: self.mols.free_list().to_vec(),
            mol_generations: (0..self.mols.slot_count() as u32)
                .map(|i| self.mols.generation(MolId(i)))
                .collect(),
            comp_slots: self.comps.slots().to_vec(),
            comp_free: self.comps.free_list().to_vec(),
            comp_generations: (0..self.comps.slot_count() as u32)
                .map(|i| self.comps.generation(ComplexId(i)))
                .collect(),
            tables: self.tables.export(),
            reservoir: self.reservoir.as_ref().map(|r| ReservoirState {
                mol: r.mol,
                template: r.template,
                total: r.total,
                bound: r.bound,
            }),
        }
    }

    /// Rebuild a simulation from a captured snapshot.
    ///
    /// Config, templates, and reactions are supplied again (the snapshot
    /// stores only state); the restored run continues the original
    /// trajectory exactly.
    pub fn resume(
        config: SimConfig,
        templates: Vec<MolTemplate>,
        reactions: Vec<Reaction>,
        snapshot: Snapshot,
    ) -> Result<Self, SimError> {
        config.validate(&templates, &reactions)?;
        let registry = SpeciesRegistry::build(&templates);
        let reactions = normalize_species(reactions, &registry);
        let r_max = config.r_max(&templates, &reactions);
        let grid = CellGrid::new(config.box_dims, r_max)?;
        let network = ReactionNetwork::build(reactions);
        let counters = Counters::new(&registry);

        let mols = MolArena::from_parts(
            snapshot.mol_slots,
            snapshot.mol_free,
            snapshot.mol_generations,
        );
        let comps = ComplexArena::from_parts(
            snapshot.comp_slots,
            snapshot.comp_free,
            snapshot.comp_generations,
        );
        let reservoir = snapshot.reservoir.map(|r| Reservoir {
            mol: r.mol,
            template: r.template,
            total: r.total,
            bound: r.bound,
        });

        let mut ctx = SimContext::new(config.seed);
        ctx.rng = SimRng::restore(&snapshot.rng);
        ctx.step = StepId(snapshot.step);
        ctx.live_molecules = mols.live_count() - usize::from(reservoir.is_some());
        ctx.live_complexes = comps.live_count();
        log::info!("resumed at step {} with {} molecules", ctx.step, ctx.live_molecules);

        Ok(Self {
            config,
            templates,
            registry,
            network,
            mols,
            comps,
            grid,
            tables: PairTable::import(snapshot.tables),
            counters,
            ctx,
            reservoir,
        })
    }

    /// Capture and write a checkpoint to a sink.
    pub fn write_checkpoint(&self, w: &mut dyn Write) -> Result<(), SimError> {
        write_snapshot(w, &self.capture())?;
        Ok(())
    }

    /// Read a checkpoint and resume from it.
    pub fn from_checkpoint(
        config: SimConfig,
        templates: Vec<MolTemplate>,
        reactions: Vec<Reaction>,
        r: &mut dyn Read,
    ) -> Result<Self, SimError> {
        let snapshot = read_snapshot(r)?;
        Self::resume(config, templates, reactions, snapshot)
    }
}

// Reactant species indices are derived data; recompute them from the
// registry so callers never have to keep them consistent by hand.
fn normalize_species(mut reactions: Vec<Reaction>, registry: &SpeciesRegistry) -> Vec<Reaction> {
    for r in &mut reactions {
        for reactant in &mut r.reactants {
            reactant.species = registry.species(reactant.template, reactant.iface, reactant.state);
        }
    }
    reactions
}
