//! Error types shared across the Nidus workspace.
//!
//! One enum per subsystem: grid construction/update, probability-table
//! solves, and step execution. Configuration errors live with the engine's
//! config type; checkpoint errors live with the codec.

use std::error::Error;
use std::fmt;

use crate::id::{MolId, RxnId};

/// Errors from spatial-partition construction or per-step update.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// A box dimension was zero, negative, or non-finite.
    BadDimensions {
        /// The offending box extents (x, y, z).
        dims: [f64; 3],
    },
    /// The reaction cutoff was zero, negative, or non-finite.
    BadCutoff {
        /// The offending cutoff.
        r_max: f64,
    },
    /// A molecule's reference point lies outside the domain.
    ///
    /// Positions are boundary-reflected every step, so this indicates a
    /// broken invariant upstream, not a recoverable condition.
    OutOfDomain {
        /// The molecule whose complex reference point escaped.
        mol: MolId,
        /// The escaped coordinate (x, y, z).
        pos: [f64; 3],
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadDimensions { dims } => {
                write!(
                    f,
                    "invalid box dimensions [{}, {}, {}]",
                    dims[0], dims[1], dims[2]
                )
            }
            Self::BadCutoff { r_max } => write!(f, "invalid reaction cutoff {r_max}"),
            Self::OutOfDomain { mol, pos } => {
                write!(
                    f,
                    "molecule {mol} outside domain at [{}, {}, {}]",
                    pos[0], pos[1], pos[2]
                )
            }
        }
    }
}

impl Error for GridError {}

/// Errors from probability-table solves.
///
/// An out-of-`[0, 1]` solve is *not* an error: it is clamped and logged
/// per the consistency contract. These variants cover the cases where no
/// meaningful value exists at all.
#[derive(Clone, Debug, PartialEq)]
pub enum TableError {
    /// A solve produced NaN or infinity.
    NonFinite {
        /// Separation at which the solve was attempted.
        separation: f64,
    },
    /// Root bracketing failed for the effective-radius solve.
    BracketFailed {
        /// Lower bracket endpoint.
        lo: f64,
        /// Upper bracket endpoint.
        hi: f64,
    },
    /// Pair parameters were non-physical (non-positive diffusion,
    /// rate, or contact radius).
    BadPairParams {
        /// Relative diffusion constant.
        d_tot: f64,
        /// Intrinsic association rate.
        ka: f64,
        /// Contact (binding) radius.
        sigma: f64,
    },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { separation } => {
                write!(f, "non-finite table solve at separation {separation}")
            }
            Self::BracketFailed { lo, hi } => {
                write!(f, "effective-radius root not bracketed in [{lo}, {hi}]")
            }
            Self::BadPairParams { d_tot, ka, sigma } => {
                write!(
                    f,
                    "non-physical pair parameters (d_tot={d_tot}, ka={ka}, sigma={sigma})"
                )
            }
        }
    }
}

impl Error for TableError {}

/// Fatal errors raised while executing a timestep.
///
/// Every variant aborts the run: draws already consumed from the random
/// stream cannot be replayed backward, so there is no partial recovery.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// An accepted candidate resolved to a reaction the bimolecular
    /// executor cannot perform (configuration inconsistency).
    MalformedCandidate {
        /// The reaction the candidate referenced.
        rxn: RxnId,
        /// The reaction kind actually found.
        kind: &'static str,
    },
    /// A candidate referenced a molecule slot that is empty.
    StaleHandle {
        /// The dangling handle.
        mol: MolId,
    },
    /// A probability-table solve failed.
    Table(TableError),
    /// The spatial partition rejected the current state.
    Grid(GridError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedCandidate { rxn, kind } => {
                write!(f, "candidate for reaction {rxn} has unexecutable kind {kind}")
            }
            Self::StaleHandle { mol } => write!(f, "candidate references empty slot {mol}"),
            Self::Table(e) => write!(f, "probability table: {e}"),
            Self::Grid(e) => write!(f, "spatial partition: {e}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Table(e) => Some(e),
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TableError> for StepError {
    fn from(e: TableError) -> Self {
        Self::Table(e)
    }
}

impl From<GridError> for StepError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}
