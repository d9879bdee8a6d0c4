//! Strongly-typed identifiers.
//!
//! Molecule and complex handles index dense arena slots and stay stable for
//! the life of the record; destroyed slots are recycled through free lists,
//! so a handle must never be retained across a step boundary (the arena
//! tracks a per-slot generation so tests can detect stale handles).

use std::fmt;

/// Handle of a molecule record in the molecule arena.
///
/// `MolId(n)` addresses the n-th slot. Slots are tombstoned on destruction
/// and reused on creation, keeping handles dense and checkpoint-stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MolId(pub u32);

impl MolId {
    /// The slot index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MolId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Handle of a complex record in the complex arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComplexId(pub u32);

impl ComplexId {
    /// The slot index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComplexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ComplexId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a molecule template (species definition).
///
/// Templates are registered at construction and assigned sequential IDs;
/// `TemplateId(n)` is the n-th template in the setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u32);

impl TemplateId {
    /// The template index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TemplateId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a reaction in the reaction network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RxnId(pub u32);

impl RxnId {
    /// The reaction index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for RxnId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Absolute index of an interface-state species.
///
/// Every (template, interface, state) triple in the system gets a unique
/// index at registry build time. Used to disambiguate reactant argument
/// order and to key copy-number counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesIdx(pub u32);

impl SpeciesIdx {
    /// The species index as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpeciesIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SpeciesIdx {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing timestep counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_number() {
        assert_eq!(MolId(7).to_string(), "7");
        assert_eq!(ComplexId(3).to_string(), "3");
        assert_eq!(SpeciesIdx(12).to_string(), "12");
        assert_eq!(StepId(99).to_string(), "99");
    }

    #[test]
    fn ids_order_by_value() {
        assert!(MolId(1) < MolId(2));
        assert!(StepId(10) > StepId(9));
    }
}
