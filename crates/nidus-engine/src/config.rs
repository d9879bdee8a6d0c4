//! Run configuration, validation, and error types.
//!
//! [`SimConfig`] is the builder-input for a [`Simulation`](crate::Simulation).
//! [`validate`](SimConfig::validate) checks the structural invariants that
//! would otherwise surface as mid-run step failures: every rejection here
//! is a condition no amount of stepping can recover from.

use std::error::Error;
use std::fmt;

use glam::DVec3;
use nidus_core::{RxnId, TemplateId};
use nidus_model::{MolTemplate, Reaction, RxnKind};

/// Implicit-membrane reservoir parameters.
///
/// The reservoir stands in for a uniform field of membrane binding sites
/// on the bottom face of the box; binders consume copies by counter
/// rather than by colliding with individual site records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReservoirConfig {
    /// Template describing a reservoir site (one interface).
    pub template: TemplateId,
    /// Total site copies on the membrane face.
    pub total: u64,
}

/// Full configuration of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Full box extents, origin-centered (length units).
    pub box_dims: DVec3,
    /// Timestep (time units).
    pub dt: f64,
    /// Random seed; two runs with equal config and seed are bit-identical.
    pub seed: u64,
    /// Displacement-halving attempts before a blocked complex gives up
    /// and keeps its old position for the step.
    pub sweep_budget: u32,
    /// Debug switch: accept every bimolecular candidate with probability 1.
    pub force_accept: bool,
    /// Steps between observable log lines during [`run`](crate::Simulation::run).
    pub obs_interval: u64,
    /// Steps between trajectory visitor calls during
    /// [`run_with_trajectory`](crate::Simulation::run_with_trajectory);
    /// zero disables visitation.
    pub traj_interval: u64,
    /// Implicit-membrane reservoir, if the system has one.
    pub reservoir: Option<ReservoirConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            box_dims: DVec3::splat(100.0),
            dt: 1e-6,
            seed: 0,
            sweep_budget: 20,
            force_accept: false,
            obs_interval: 1000,
            traj_interval: 0,
            reservoir: None,
        }
    }
}

impl SimConfig {
    /// Validate the configuration against a template and reaction set.
    pub fn validate(
        &self,
        templates: &[MolTemplate],
        reactions: &[Reaction],
    ) -> Result<(), ConfigError> {
        if !self.box_dims.is_finite() || self.box_dims.min_element() <= 0.0 {
            return Err(ConfigError::BadBox {
                dims: self.box_dims.to_array(),
            });
        }
        if !(self.dt > 0.0) || !self.dt.is_finite() {
            return Err(ConfigError::BadTimeStep { dt: self.dt });
        }
        if templates.is_empty() {
            return Err(ConfigError::NoTemplates);
        }
        for (i, t) in templates.iter().enumerate() {
            if t.id.index() != i {
                return Err(ConfigError::TemplateIdMismatch { template: t.id });
            }
            if t.d_trans.min_element() < 0.0 || t.d_rot.min_element() < 0.0 {
                return Err(ConfigError::BadDiffusion { template: t.id });
            }
        }
        if let Some(res) = &self.reservoir {
            let t = templates
                .get(res.template.index())
                .ok_or(ConfigError::BadReservoir)?;
            if t.iface_count() != 1 || res.total == 0 {
                return Err(ConfigError::BadReservoir);
            }
        }
        for r in reactions {
            self.validate_reaction(templates, r)?;
        }
        Ok(())
    }

    fn validate_reaction(
        &self,
        templates: &[MolTemplate],
        r: &Reaction,
    ) -> Result<(), ConfigError> {
        let expected_reactants = match r.kind {
            RxnKind::Bimolecular | RxnKind::BiMolStateChange | RxnKind::Dissociation => 2,
            RxnKind::UniMolStateChange | RxnKind::Destruction => 1,
            RxnKind::Creation => 0,
        };
        if r.reactants.len() != expected_reactants {
            return Err(ConfigError::WrongReactantCount {
                rxn: r.id,
                expected: expected_reactants,
                found: r.reactants.len(),
            });
        }
        if r.rates.is_empty() || r.rates.iter().any(|v| !(v.rate >= 0.0) || !v.rate.is_finite())
        {
            return Err(ConfigError::BadRate { rxn: r.id });
        }
        for reactant in &r.reactants {
            let t = templates
                .get(reactant.template.index())
                .ok_or(ConfigError::IfaceOutOfRange { rxn: r.id })?;
            let spec = t
                .ifaces
                .get(reactant.iface as usize)
                .ok_or(ConfigError::IfaceOutOfRange { rxn: r.id })?;
            if reactant.state >= spec.n_states {
                return Err(ConfigError::IfaceOutOfRange { rxn: r.id });
            }
        }
        match r.kind {
            RxnKind::Bimolecular | RxnKind::Dissociation => {
                if !(r.sigma > 0.0) || !r.sigma.is_finite() {
                    return Err(ConfigError::BadBindingRadius { rxn: r.id });
                }
            }
            RxnKind::Creation => {
                let target = r.creates.ok_or(ConfigError::MissingCreationTarget { rxn: r.id })?;
                if target.index() >= templates.len() {
                    return Err(ConfigError::MissingCreationTarget { rxn: r.id });
                }
            }
            RxnKind::BiMolStateChange | RxnKind::UniMolStateChange => {
                if r.product_state.is_none() {
                    return Err(ConfigError::MissingProductState { rxn: r.id });
                }
            }
            RxnKind::Destruction => {}
        }
        if r.is_surface {
            if self.reservoir.is_none() {
                return Err(ConfigError::MissingReservoir { rxn: r.id });
            }
            let t = &templates[r.reactants[0].template.index()];
            if !t.bind_to_surface {
                return Err(ConfigError::MissingReservoir { rxn: r.id });
            }
        }
        Ok(())
    }

    /// Largest reaction cutoff over the reaction set.
    ///
    /// Per pair, the cutoff is the binding radius plus three standard
    /// deviations of the relative diffusive step; the grid's cell edge is
    /// sized to this so no reactive pair escapes the neighbor scan.
    pub fn r_max(&self, templates: &[MolTemplate], reactions: &[Reaction]) -> f64 {
        let mut r_max: f64 = 0.0;
        for r in reactions {
            if !matches!(r.kind, RxnKind::Bimolecular | RxnKind::BiMolStateChange) {
                continue;
            }
            let d_a = templates[r.reactants[0].template.index()].d_mean();
            let d_b = if r.is_surface {
                0.0
            } else {
                templates[r.reactants[1].template.index()].d_mean()
            };
            let d_tot = d_a + d_b;
            r_max = r_max.max(r.sigma + 3.0 * (6.0 * d_tot * self.dt).sqrt());
        }
        if r_max == 0.0 {
            // No collision reactions: one cell per axis works fine.
            self.box_dims.min_element()
        } else {
            r_max
        }
    }

    /// Box volume.
    pub fn volume(&self) -> f64 {
        self.box_dims.x * self.box_dims.y * self.box_dims.z
    }

    /// Z coordinate of the membrane plane (bottom face).
    pub fn membrane_z(&self) -> f64 {
        -0.5 * self.box_dims.z
    }
}

/// Errors detected during [`SimConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A box extent was zero, negative, or non-finite.
    BadBox {
        /// The offending extents.
        dims: [f64; 3],
    },
    /// The timestep was zero, negative, or non-finite.
    BadTimeStep {
        /// The offending timestep.
        dt: f64,
    },
    /// No molecule templates were supplied.
    NoTemplates,
    /// A template's id does not match its position in the list.
    TemplateIdMismatch {
        /// The offending template.
        template: TemplateId,
    },
    /// A template carried a negative diffusion constant.
    BadDiffusion {
        /// The offending template.
        template: TemplateId,
    },
    /// A reaction's reactant count does not fit its kind.
    WrongReactantCount {
        /// The offending reaction.
        rxn: RxnId,
        /// Reactants its kind requires.
        expected: usize,
        /// Reactants it declared.
        found: usize,
    },
    /// A reaction rate was negative or non-finite.
    BadRate {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// A binding or unbinding radius was non-positive.
    BadBindingRadius {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// A creation reaction named no (or an unknown) product template.
    MissingCreationTarget {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// A state-change reaction named no product state.
    MissingProductState {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// A reactant referenced an interface or state its template lacks.
    IfaceOutOfRange {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// A surface reaction was declared without a usable reservoir.
    MissingReservoir {
        /// The offending reaction.
        rxn: RxnId,
    },
    /// The reservoir template is missing, multi-interface, or empty.
    BadReservoir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadBox { dims } => {
                write!(f, "invalid box extents [{}, {}, {}]", dims[0], dims[1], dims[2])
            }
            Self::BadTimeStep { dt } => write!(f, "invalid timestep {dt}"),
            Self::NoTemplates => write!(f, "no molecule templates supplied"),
            Self::TemplateIdMismatch { template } => {
                write!(f, "template {template} is out of order in the template list")
            }
            Self::BadDiffusion { template } => {
                write!(f, "template {template} has a negative diffusion constant")
            }
            Self::WrongReactantCount {
                rxn,
                expected,
                found,
            } => write!(
                f,
                "reaction {rxn} declares {found} reactants, its kind requires {expected}"
            ),
            Self::BadRate { rxn } => write!(f, "reaction {rxn} has a negative or non-finite rate"),
            Self::BadBindingRadius { rxn } => {
                write!(f, "reaction {rxn} has a non-positive binding radius")
            }
            Self::MissingCreationTarget { rxn } => {
                write!(f, "creation reaction {rxn} names no valid product template")
            }
            Self::MissingProductState { rxn } => {
                write!(f, "state-change reaction {rxn} names no product state")
            }
            Self::IfaceOutOfRange { rxn } => {
                write!(f, "reaction {rxn} references an interface or state its template lacks")
            }
            Self::MissingReservoir { rxn } => {
                write!(f, "surface reaction {rxn} requires an implicit-membrane reservoir")
            }
            Self::BadReservoir => write!(f, "reservoir template is missing or unusable"),
        }
    }
}

impl Error for ConfigError {}
