//! Absolute interface-state species indices.
//!
//! Every (template, interface, state) triple gets a unique [`SpeciesIdx`]
//! at registry build time. Reaction definitions carry these absolute
//! indices to disambiguate reactant argument order, and the observable
//! counters are keyed by them.

use nidus_core::{SpeciesIdx, TemplateId};

use crate::template::MolTemplate;

/// Maps (template, interface, state) triples to dense [`SpeciesIdx`] values.
///
/// Indices are assigned in template order, then interface order, then state
/// order, so the layout is reproducible from the template list alone.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesRegistry {
    // base[t][i] = index of state 0 of interface i on template t
    base: Vec<Vec<u32>>,
    names: Vec<String>,
}

impl SpeciesRegistry {
    /// Build the registry from the template list.
    pub fn build(templates: &[MolTemplate]) -> Self {
        let mut base = Vec::with_capacity(templates.len());
        let mut names = Vec::new();
        let mut next = 0u32;
        for t in templates {
            let mut per_iface = Vec::with_capacity(t.ifaces.len());
            for iface in &t.ifaces {
                per_iface.push(next);
                for state in 0..iface.n_states {
                    if iface.n_states == 1 {
                        names.push(format!("{}({})", t.name, iface.name));
                    } else {
                        names.push(format!("{}({}~{})", t.name, iface.name, state));
                    }
                    next += 1;
                }
            }
            base.push(per_iface);
        }
        Self { base, names }
    }

    /// The species index of an interface in a given state.
    pub fn species(&self, template: TemplateId, iface: u8, state: u8) -> SpeciesIdx {
        SpeciesIdx(self.base[template.index()][iface as usize] + state as u32)
    }

    /// Total number of distinct interface-state species.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the registry is empty (no templates with interfaces).
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Human-readable name of a species (`Tmpl(iface~state)`).
    pub fn name(&self, species: SpeciesIdx) -> &str {
        &self.names[species.index()]
    }
}
