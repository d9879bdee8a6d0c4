//! Reaction definitions and the species-pair lookup index.
//!
//! The reaction set is closed: the six kinds below are the only ones the
//! executor dispatches on. Anything else is a configuration error caught
//! before the first step.

use indexmap::IndexMap;
use nidus_core::{RxnId, SpeciesIdx, TemplateId};
use smallvec::SmallVec;

/// The closed set of reaction kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RxnKind {
    /// Two free interfaces bind; their complexes merge.
    Bimolecular,
    /// A collision flips one interface's state; no membership change.
    BiMolStateChange,
    /// A free interface flips state spontaneously.
    UniMolStateChange,
    /// A bond breaks; the owning complex splits by connectivity.
    Dissociation,
    /// A molecule appears from nothing (zeroth order).
    Creation,
    /// A molecule is removed from the system.
    Destruction,
}

impl RxnKind {
    /// Short name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bimolecular => "bimolecular",
            Self::BiMolStateChange => "biMolStateChange",
            Self::UniMolStateChange => "uniMolStateChange",
            Self::Dissociation => "dissociation",
            Self::Creation => "creation",
            Self::Destruction => "destruction",
        }
    }
}

/// One declared reactant of a reaction.
///
/// The absolute species index disambiguates argument order: the executor
/// matches colliding interfaces against `reactants[0]`/`reactants[1]` by
/// species, never by scan position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reactant {
    /// The reactant's template.
    pub template: TemplateId,
    /// Interface index on that template.
    pub iface: u8,
    /// Required interface state.
    pub state: u8,
    /// Absolute interface-state species index.
    pub species: SpeciesIdx,
}

/// One rate variant of a reaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateVariant {
    /// Macroscopic rate. Units depend on kind: volume/time for
    /// bimolecular, 1/time for unimolecular kinds, number/(volume·time)
    /// for creation.
    pub rate: f64,
}

/// A reaction definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    /// Sequential id in the network.
    pub id: RxnId,
    /// Which state machine branch executes this reaction.
    pub kind: RxnKind,
    /// Declared reactants (2 for collision kinds, 1 for unimolecular
    /// kinds and destruction, 0 for creation).
    pub reactants: SmallVec<[Reactant; 2]>,
    /// Rate variants; candidates carry the variant index they matched.
    pub rates: SmallVec<[RateVariant; 2]>,
    /// Binding radius for `Bimolecular`, separation restored on
    /// `Dissociation`. Zero for other kinds.
    pub sigma: f64,
    /// Target state tag for the state-change kinds.
    pub product_state: Option<u8>,
    /// Template created by a `Creation` reaction.
    pub creates: Option<TemplateId>,
    /// Implicit-membrane variant: the second reactant is the lipid
    /// reservoir, consumed by counter rather than by handle.
    pub is_surface: bool,
}

/// A reaction matched against a species (pair) during collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RxnMatch {
    /// The matched reaction.
    pub rxn: RxnId,
    /// Rate-variant index within the reaction.
    pub variant: u8,
    /// Whether the scanning species matched the *second* declared
    /// reactant.
    pub flipped: bool,
}

/// The full reaction set plus lookup indices for the per-step scans.
///
/// All indices use [`IndexMap`] so iteration order is reproducible from
/// the declaration order alone.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionNetwork {
    reactions: Vec<Reaction>,
    // (species seen first in scan order, species seen second) -> matches
    pair_index: IndexMap<(SpeciesIdx, SpeciesIdx), Vec<RxnMatch>>,
    // non-lipid reactant species -> surface-binding matches
    surface_index: IndexMap<SpeciesIdx, Vec<RxnMatch>>,
    // normalized (min, max) bound-pair species -> dissociations
    dissoc_index: IndexMap<(SpeciesIdx, SpeciesIdx), Vec<RxnMatch>>,
    // free interface species -> spontaneous state changes
    unimol_index: IndexMap<SpeciesIdx, Vec<RxnMatch>>,
    // template -> destruction reactions
    destruct_index: IndexMap<TemplateId, Vec<RxnId>>,
    creations: Vec<RxnId>,
}

impl ReactionNetwork {
    /// Build the lookup indices from a validated reaction list.
    pub fn build(reactions: Vec<Reaction>) -> Self {
        let mut pair_index: IndexMap<(SpeciesIdx, SpeciesIdx), Vec<RxnMatch>> = IndexMap::new();
        let mut surface_index: IndexMap<SpeciesIdx, Vec<RxnMatch>> = IndexMap::new();
        let mut dissoc_index: IndexMap<(SpeciesIdx, SpeciesIdx), Vec<RxnMatch>> = IndexMap::new();
        let mut unimol_index: IndexMap<SpeciesIdx, Vec<RxnMatch>> = IndexMap::new();
        let mut destruct_index: IndexMap<TemplateId, Vec<RxnId>> = IndexMap::new();
        let mut creations = Vec::new();

        for r in &reactions {
            // One match per rate variant, so every declared variant is
            // reachable from the scans.
            let variants = 0..r.rates.len() as u8;
            match r.kind {
                RxnKind::Bimolecular | RxnKind::BiMolStateChange if r.is_surface => {
                    let a = r.reactants[0].species;
                    for v in variants {
                        surface_index.entry(a).or_default().push(RxnMatch {
                            rxn: r.id,
                            variant: v,
                            flipped: false,
                        });
                    }
                }
                RxnKind::Bimolecular | RxnKind::BiMolStateChange => {
                    let a = r.reactants[0].species;
                    let b = r.reactants[1].species;
                    for v in variants {
                        pair_index.entry((a, b)).or_default().push(RxnMatch {
                            rxn: r.id,
                            variant: v,
                            flipped: false,
                        });
                        if a != b {
                            pair_index.entry((b, a)).or_default().push(RxnMatch {
                                rxn: r.id,
                                variant: v,
                                flipped: true,
                            });
                        }
                    }
                }
                RxnKind::Dissociation => {
                    let a = r.reactants[0].species;
                    let b = if r.reactants.len() > 1 {
                        r.reactants[1].species
                    } else {
                        a
                    };
                    let key = (a.min(b), a.max(b));
                    for v in variants {
                        dissoc_index.entry(key).or_default().push(RxnMatch {
                            rxn: r.id,
                            variant: v,
                            flipped: false,
                        });
                    }
                }
                RxnKind::UniMolStateChange => {
                    let a = r.reactants[0].species;
                    for v in variants {
                        unimol_index.entry(a).or_default().push(RxnMatch {
                            rxn: r.id,
                            variant: v,
                            flipped: false,
                        });
                    }
                }
                RxnKind::Destruction => {
                    destruct_index
                        .entry(r.reactants[0].template)
                        .or_default()
                        .push(r.id);
                }
                RxnKind::Creation => creations.push(r.id),
            }
        }

        Self {
            reactions,
            pair_index,
            surface_index,
            dissoc_index,
            unimol_index,
            destruct_index,
            creations,
        }
    }

    /// The reaction record behind an id.
    pub fn reaction(&self, id: RxnId) -> &Reaction {
        &self.reactions[id.index()]
    }

    /// All reactions in declaration order.
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Collision matches for a scanned species pair (scan order preserved
    /// in the `flipped` flag).
    pub fn matches_for_pair(&self, first: SpeciesIdx, second: SpeciesIdx) -> &[RxnMatch] {
        self.pair_index
            .get(&(first, second))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Surface-binding matches for a free interface species.
    pub fn surface_matches(&self, species: SpeciesIdx) -> &[RxnMatch] {
        self.surface_index
            .get(&species)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dissociations for a bound species pair (order-insensitive).
    pub fn dissociations_for(&self, a: SpeciesIdx, b: SpeciesIdx) -> &[RxnMatch] {
        self.dissoc_index
            .get(&(a.min(b), a.max(b)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Spontaneous state changes for a free interface species.
    pub fn unimol_for(&self, species: SpeciesIdx) -> &[RxnMatch] {
        self.unimol_index
            .get(&species)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Destruction reactions for a template.
    pub fn destructions_for(&self, template: TemplateId) -> &[RxnId] {
        self.destruct_index
            .get(&template)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Creation reactions in declaration order.
    pub fn creations(&self) -> &[RxnId] {
        &self.creations
    }
}
