//! Observable extraction from simulation state.
//!
//! Derives the quantities a run reports at sampling intervals: free and
//! bound copy numbers per interface-state species, bond counts per bound
//! species pair, and the complex-size distribution. Everything here is a
//! pure function of the arenas; refreshing never mutates simulation state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use indexmap::IndexMap;
use nidus_core::SpeciesIdx;
use nidus_model::{ComplexArena, MolArena, SpeciesRegistry};

/// Copy numbers and bond statistics for one sampling point.
///
/// Bond keys are normalized `(min, max)` species pairs so a bond is
/// counted once regardless of which end is visited first. Maps are
/// [`IndexMap`] keyed in first-seen order, so report columns are stable
/// across a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Counters {
    /// Free (unbound) interface copies per species.
    pub free: Vec<u64>,
    /// Total interface copies per species, bound or not.
    pub total: Vec<u64>,
    /// Bonds per normalized bound species pair.
    pub bonds: IndexMap<(SpeciesIdx, SpeciesIdx), u64>,
    /// `histogram[k]` counts complexes with `k + 1` member molecules.
    pub histogram: Vec<u64>,
    /// Remaining copies in the implicit-lipid reservoir, if one exists.
    pub reservoir_free: Option<u64>,
}

impl Counters {
    /// Empty counters sized for a registry.
    pub fn new(registry: &SpeciesRegistry) -> Self {
        Self {
            free: vec![0; registry.len()],
            total: vec![0; registry.len()],
            bonds: IndexMap::new(),
            histogram: Vec::new(),
            reservoir_free: None,
        }
    }

    /// Recompute every counter from the live arena contents.
    pub fn refresh(&mut self, mols: &MolArena, comps: &ComplexArena) {
        self.free.iter_mut().for_each(|c| *c = 0);
        self.total.iter_mut().for_each(|c| *c = 0);
        self.bonds.clear();
        self.histogram.clear();

        for mol in mols.iter_live() {
            // The reservoir record stands in for a whole site population;
            // its pool is reported separately, not as one molecule.
            if mol.is_implicit_lipid {
                continue;
            }
            for (i, iface) in mol.ifaces.iter().enumerate() {
                self.total[iface.species.index()] += 1;
                match iface.bound {
                    None => self.free[iface.species.index()] += 1,
                    Some(partner) => {
                        let lipid = mols[partner.mol].is_implicit_lipid;
                        // The two ends of a bond are distinct (molecule,
                        // interface) pairs; count from the lower end only.
                        // Reservoir bonds are one-sided, so the molecular
                        // end is the only end that gets visited.
                        if lipid || (mol.id, i as u8) < (partner.mol, partner.iface) {
                            let other =
                                mols[partner.mol].ifaces[partner.iface as usize].species;
                            let key = (iface.species.min(other), iface.species.max(other));
                            *self.bonds.entry(key).or_insert(0) += 1;
                        }
                    }
                }
            }
        }

        for comp in comps.iter_live() {
            let size = comp.members.len();
            if size == 0 || comp.members.iter().any(|&m| mols[m].is_implicit_lipid) {
                continue;
            }
            if self.histogram.len() < size {
                self.histogram.resize(size, 0);
            }
            self.histogram[size - 1] += 1;
        }
    }

    /// Number of bonds in the system.
    pub fn bond_count(&self) -> u64 {
        self.bonds.values().sum()
    }

    /// Largest complex size seen at the last refresh.
    pub fn largest_complex(&self) -> usize {
        self.histogram.len()
    }
}

/// Render counters as one whitespace-separated observables line,
/// `name=count` per species with nonzero total, free counts only.
pub fn format_line(counters: &Counters, registry: &SpeciesRegistry) -> String {
    let mut out = String::new();
    for (i, (&free, &total)) in counters.free.iter().zip(&counters.total).enumerate() {
        if total == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{}={free}", registry.name(SpeciesIdx(i as u32))));
    }
    for ((a, b), &n) in &counters.bonds {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("{}.{}={n}", registry.name(*a), registry.name(*b)));
    }
    if let Some(free) = counters.reservoir_free {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&format!("reservoir={free}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use nidus_core::{ComplexId, MolId, TemplateId};
    use nidus_model::{
        BoundPartner, Complex, IfaceSpec, Interface, MolTemplate, Molecule, TrajStatus,
    };
    use smallvec::smallvec;

    fn fixture() -> (SpeciesRegistry, MolArena, ComplexArena) {
        let templates = vec![
            MolTemplate {
                id: TemplateId(0),
                name: "A".into(),
                ifaces: vec![IfaceSpec::simple("a", DVec3::ZERO)].into(),
                d_trans: DVec3::ONE,
                d_rot: DVec3::ONE,
                bind_to_surface: false,
                copies: 0,
            },
            MolTemplate {
                id: TemplateId(1),
                name: "B".into(),
                ifaces: vec![IfaceSpec::simple("b", DVec3::ZERO)].into(),
                d_trans: DVec3::ONE,
                d_rot: DVec3::ONE,
                bind_to_surface: false,
                copies: 0,
            },
        ];
        let registry = SpeciesRegistry::build(&templates);
        (registry, MolArena::new(), ComplexArena::new())
    }

    fn add_mol(
        mols: &mut MolArena,
        comps: &mut ComplexArena,
        template: u32,
        species: u32,
    ) -> MolId {
        let cid = comps.alloc(|id| Complex {
            id,
            members: Vec::new(),
            com: DVec3::ZERO,
            d_trans: DVec3::ONE,
            d_rot: DVec3::ONE,
            ncross: 0,
            traj_status: TrajStatus::None,
            traj_trans: DVec3::ZERO,
            traj_rot: DVec3::ZERO,
            is_empty: false,
            on_surface: false,
        });
        let mid = mols.alloc(|id| Molecule {
            id,
            template: TemplateId(template),
            complex: cid,
            com: DVec3::ZERO,
            ifaces: smallvec![Interface {
                pos: DVec3::ZERO,
                state: 0,
                species: SpeciesIdx(species),
                bound: None,
            }],
            candidates: Vec::new(),
            traj_status: TrajStatus::None,
            is_empty: false,
            is_implicit_lipid: false,
            just_dissociated: false,
        });
        comps[cid].members.push(mid);
        mid
    }

    fn bind(mols: &mut MolArena, comps: &mut ComplexArena, a: MolId, b: MolId) {
        mols[a].ifaces[0].bound = Some(BoundPartner { mol: b, iface: 0 });
        mols[b].ifaces[0].bound = Some(BoundPartner { mol: a, iface: 0 });
        let (ca, cb) = (mols[a].complex, mols[b].complex);
        if ca != cb {
            let moved: Vec<MolId> = comps[cb].members.drain(..).collect();
            for m in &moved {
                mols[*m].complex = ca;
            }
            comps[ca].members.extend(moved);
            comps.release(cb);
        }
    }

    #[test]
    fn counts_free_and_total_per_species() {
        let (registry, mut mols, mut comps) = fixture();
        add_mol(&mut mols, &mut comps, 0, 0);
        let a = add_mol(&mut mols, &mut comps, 0, 0);
        let b = add_mol(&mut mols, &mut comps, 1, 1);
        bind(&mut mols, &mut comps, a, b);

        let mut counters = Counters::new(&registry);
        counters.refresh(&mols, &comps);
        assert_eq!(counters.total, vec![2, 1]);
        assert_eq!(counters.free, vec![1, 0]);
    }

    #[test]
    fn bonds_count_once_per_pair() {
        let (registry, mut mols, mut comps) = fixture();
        let a = add_mol(&mut mols, &mut comps, 0, 0);
        let b = add_mol(&mut mols, &mut comps, 1, 1);
        bind(&mut mols, &mut comps, a, b);

        let mut counters = Counters::new(&registry);
        counters.refresh(&mols, &comps);
        assert_eq!(counters.bond_count(), 1);
        assert_eq!(counters.bonds[&(SpeciesIdx(0), SpeciesIdx(1))], 1);
    }

    #[test]
    fn histogram_tracks_complex_sizes() {
        let (registry, mut mols, mut comps) = fixture();
        add_mol(&mut mols, &mut comps, 0, 0);
        let a = add_mol(&mut mols, &mut comps, 0, 0);
        let b = add_mol(&mut mols, &mut comps, 1, 1);
        bind(&mut mols, &mut comps, a, b);

        let mut counters = Counters::new(&registry);
        counters.refresh(&mols, &comps);
        assert_eq!(counters.histogram, vec![1, 1]);
        assert_eq!(counters.largest_complex(), 2);
    }

    #[test]
    fn format_line_is_stable_and_named() {
        let (registry, mut mols, mut comps) = fixture();
        let a = add_mol(&mut mols, &mut comps, 0, 0);
        let b = add_mol(&mut mols, &mut comps, 1, 1);
        bind(&mut mols, &mut comps, a, b);
        let mut counters = Counters::new(&registry);
        counters.refresh(&mols, &comps);
        assert_eq!(format_line(&counters, &registry), "A(a)=0 B(b)=0 A(a).B(b)=1");
    }
}
