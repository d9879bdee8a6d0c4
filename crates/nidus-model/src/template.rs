//! Static per-species definitions.

use glam::DVec3;
use nidus_core::TemplateId;
use smallvec::SmallVec;

/// One binding interface in a template's local frame.
#[derive(Clone, Debug, PartialEq)]
pub struct IfaceSpec {
    /// Interface name (e.g. `"a"`, `"pip2"`).
    pub name: String,
    /// Offset from the molecule's center of mass, in the template frame.
    pub offset: DVec3,
    /// Number of discrete states this interface can take (>= 1).
    /// State tags are `0..n_states`.
    pub n_states: u8,
}

impl IfaceSpec {
    /// A single-state interface at the given offset.
    pub fn simple(name: &str, offset: DVec3) -> Self {
        Self {
            name: name.to_string(),
            offset,
            n_states: 1,
        }
    }
}

/// Static definition of a molecule species.
#[derive(Clone, Debug, PartialEq)]
pub struct MolTemplate {
    /// Sequential template id, assigned at setup.
    pub id: TemplateId,
    /// Species name.
    pub name: String,
    /// Interface layout in the template frame.
    pub ifaces: SmallVec<[IfaceSpec; 4]>,
    /// Translational diffusion constants per axis (length^2 / time).
    pub d_trans: DVec3,
    /// Rotational diffusion constants per axis (rad^2 / time).
    pub d_rot: DVec3,
    /// Whether this species can bind the implicit membrane reservoir.
    pub bind_to_surface: bool,
    /// Copy count placed at initialization.
    pub copies: u32,
}

impl MolTemplate {
    /// Isotropic translational diffusion constant (axis mean).
    ///
    /// Used for reaction-cutoff estimates, where only the relative pair
    /// magnitude matters.
    pub fn d_mean(&self) -> f64 {
        (self.d_trans.x + self.d_trans.y + self.d_trans.z) / 3.0
    }

    /// Number of interfaces.
    pub fn iface_count(&self) -> usize {
        self.ifaces.len()
    }
}
