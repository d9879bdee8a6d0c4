//! Recyclable record arenas for molecules and complexes.
//!
//! Dense `Vec`s addressed by integer handle. Destruction tombstones the
//! slot and pushes the handle on a free list; creation pops the free list
//! (or appends), so handles stay dense and checkpoint-stable and records
//! are never physically erased mid-run.
//!
//! A per-slot generation counter is bumped on every release. Live code
//! must not retain handles across a recycling point; the generation is the
//! test-time facility for catching code that does.

use std::ops::{Index, IndexMut};

use nidus_core::{ComplexId, MolId};

use crate::complex::Complex;
use crate::molecule::Molecule;

/// Arena of [`Molecule`] records with a recyclable free list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MolArena {
    slots: Vec<Molecule>,
    free: Vec<MolId>,
    generations: Vec<u32>,
}

impl MolArena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty arena with reserved capacity.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            slots: Vec::with_capacity(n),
            free: Vec::new(),
            generations: Vec::new(),
        }
    }

    /// Allocate a record, recycling a free slot when one exists.
    ///
    /// The closure receives the handle the record will live at.
    pub fn alloc(&mut self, build: impl FnOnce(MolId) -> Molecule) -> MolId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = build(id);
                id
            }
            None => {
                let id = MolId(self.slots.len() as u32);
                self.slots.push(build(id));
                self.generations.push(0);
                id
            }
        }
    }

    /// Tombstone a record and return its handle to the free list.
    ///
    /// The slot keeps its (now empty) record; the generation bump marks
    /// every outstanding handle to it stale.
    pub fn release(&mut self, id: MolId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(!slot.is_empty, "double release of molecule slot {id}");
        slot.is_empty = true;
        slot.candidates.clear();
        slot.ifaces.clear();
        self.generations[id.index()] += 1;
        self.free.push(id);
    }

    /// Number of slots (live + tombstoned).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live records.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Iterate all handles, tombstoned slots included.
    pub fn ids(&self) -> impl Iterator<Item = MolId> {
        (0..self.slots.len() as u32).map(MolId)
    }

    /// Iterate live records.
    pub fn iter_live(&self) -> impl Iterator<Item = &Molecule> {
        self.slots.iter().filter(|m| !m.is_empty)
    }

    /// The current generation of a slot.
    pub fn generation(&self, id: MolId) -> u32 {
        self.generations[id.index()]
    }

    /// The free list, most recently released last.
    pub fn free_list(&self) -> &[MolId] {
        &self.free
    }

    /// All slots in handle order (checkpoint capture).
    pub fn slots(&self) -> &[Molecule] {
        &self.slots
    }

    /// Rebuild from checkpointed parts.
    pub fn from_parts(slots: Vec<Molecule>, free: Vec<MolId>, generations: Vec<u32>) -> Self {
        debug_assert_eq!(slots.len(), generations.len());
        Self {
            slots,
            free,
            generations,
        }
    }
}

impl Index<MolId> for MolArena {
    type Output = Molecule;
    fn index(&self, id: MolId) -> &Molecule {
        &self.slots[id.index()]
    }
}

impl IndexMut<MolId> for MolArena {
    fn index_mut(&mut self, id: MolId) -> &mut Molecule {
        &mut self.slots[id.index()]
    }
}

/// Arena of [`Complex`] records with a recyclable free list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComplexArena {
    slots: Vec<Complex>,
    free: Vec<ComplexId>,
    generations: Vec<u32>,
}

impl ComplexArena {
    /// An empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a record, recycling a free slot when one exists.
    pub fn alloc(&mut self, build: impl FnOnce(ComplexId) -> Complex) -> ComplexId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = build(id);
                id
            }
            None => {
                let id = ComplexId(self.slots.len() as u32);
                self.slots.push(build(id));
                self.generations.push(0);
                id
            }
        }
    }

    /// Tombstone a record and return its handle to the free list.
    pub fn release(&mut self, id: ComplexId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(!slot.is_empty, "double release of complex slot {id}");
        slot.is_empty = true;
        slot.members.clear();
        self.generations[id.index()] += 1;
        self.free.push(id);
    }

    /// Number of slots (live + tombstoned).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live records.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Iterate all handles, tombstoned slots included.
    pub fn ids(&self) -> impl Iterator<Item = ComplexId> {
        (0..self.slots.len() as u32).map(ComplexId)
    }

    /// Iterate live records.
    pub fn iter_live(&self) -> impl Iterator<Item = &Complex> {
        self.slots.iter().filter(|c| !c.is_empty)
    }

    /// The current generation of a slot.
    pub fn generation(&self, id: ComplexId) -> u32 {
        self.generations[id.index()]
    }

    /// The free list, most recently released last.
    pub fn free_list(&self) -> &[ComplexId] {
        &self.free
    }

    /// All slots in handle order (checkpoint capture).
    pub fn slots(&self) -> &[Complex] {
        &self.slots
    }

    /// Rebuild from checkpointed parts.
    pub fn from_parts(slots: Vec<Complex>, free: Vec<ComplexId>, generations: Vec<u32>) -> Self {
        debug_assert_eq!(slots.len(), generations.len());
        Self {
            slots,
            free,
            generations,
        }
    }
}

impl Index<ComplexId> for ComplexArena {
    type Output = Complex;
    fn index(&self, id: ComplexId) -> &Complex {
        &self.slots[id.index()]
    }
}

impl IndexMut<ComplexId> for ComplexArena {
    fn index_mut(&mut self, id: ComplexId) -> &mut Complex {
        &mut self.slots[id.index()]
    }
}
