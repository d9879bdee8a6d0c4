//! Lazily-solved, memoized per-pair probability tables.
//!
//! Solving the Green's function is far more expensive than a hash probe,
//! and the same (diffusion, rate, radius, separation-bin) tuple recurs
//! every step, so entries are solved once on first demand and never
//! evicted. Iteration order over the maps is insertion order, which keeps
//! checkpoint capture reproducible.

use indexmap::IndexMap;

use crate::gf::{assoc_prob, radial_density, truncation_radius};
use crate::solve::{effective_radius, simpson};
use crate::TableError;

/// Physical parameters identifying one reactive pair class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairParams {
    /// Combined translational diffusion coefficient of the pair.
    pub d_tot: f64,
    /// Intrinsic (microscopic) association rate.
    pub ka: f64,
    /// Binding radius.
    pub sigma: f64,
    /// Time step the probabilities are solved for.
    pub dt: f64,
}

/// Exact-bit key for a pair class.
///
/// Parameters reach the table as already-derived f64s, so keying on their
/// bit patterns dedupes identical pairs without inventing a tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairKey {
    /// Bits of the combined diffusion coefficient.
    pub d_bits: u64,
    /// Bits of the intrinsic rate.
    pub ka_bits: u64,
    /// Bits of the binding radius.
    pub sigma_bits: u64,
}

impl PairKey {
    fn of(params: &PairParams) -> Self {
        Self {
            d_bits: params.d_tot.to_bits(),
            ka_bits: params.ka.to_bits(),
            sigma_bits: params.sigma.to_bits(),
        }
    }
}

/// One solved table entry for a separation bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableEntry {
    /// Association probability within one step, clamped to `[0, 1]`.
    pub assoc_prob: f64,
    /// Survival complement `1 - assoc_prob`.
    pub survival: f64,
    /// Numerically recovered total probability (reacted + surviving);
    /// deviation from 1 measures quadrature error.
    pub norm: f64,
    /// Effective absorbing radius for post-dissociation placement.
    pub irr_radius: f64,
}

/// Bins per diffusion length: bin width is `sqrt(d_tot dt) / 50`.
const BINS_PER_STEP_LENGTH: f64 = 50.0;

// Survivor-density quadrature resolution.
const NORM_PANELS: usize = 512;

#[derive(Clone, Debug)]
struct PairSlice {
    params: PairParams,
    bin_width: f64,
    irr_radius: f64,
    bins: IndexMap<u32, TableEntry>,
}

/// The memoized table over all pair classes.
#[derive(Clone, Debug, Default)]
pub struct PairTable {
    pairs: IndexMap<PairKey, PairSlice>,
    solves: u64,
    clamped: u64,
}

impl PairTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The solved entry for a pair class at a separation, computing and
    /// memoizing it on first demand.
    pub fn lookup(&mut self, params: &PairParams, r0: f64) -> Result<TableEntry, TableError> {
        if !r0.is_finite() {
            return Err(TableError::NonFinite { separation: r0 });
        }
        if !(params.d_tot > 0.0 && params.ka > 0.0 && params.sigma > 0.0) {
            return Err(TableError::BadPairParams {
                d_tot: params.d_tot,
                ka: params.ka,
                sigma: params.sigma,
            });
        }
        let key = PairKey::of(params);
        if !self.pairs.contains_key(&key) {
            let slice = PairSlice {
                params: *params,
                bin_width: (params.d_tot * params.dt).sqrt() / BINS_PER_STEP_LENGTH,
                irr_radius: effective_radius(params.d_tot, params.ka, params.sigma)?,
                bins: IndexMap::new(),
            };
            self.pairs.insert(key, slice);
        }
        // Entries are solved at the bin center so every separation in the
        // bin sees the same probability.
        let slice = &self.pairs[&key];
        let bin = (((r0 - params.sigma).max(0.0)) / slice.bin_width) as u32;
        if let Some(entry) = slice.bins.get(&bin) {
            return Ok(*entry);
        }
        let entry = Self::solve_bin(slice, bin)?;
        let (entry, was_clamped) = Self::clamp(entry);
        self.solves += 1;
        if was_clamped {
            self.clamped += 1;
        }
        let slice = &mut self.pairs[&key];
        slice.bins.insert(bin, entry);
        Ok(entry)
    }

    /// Effective absorbing radius for a pair class, solving the slice on
    /// first demand.
    pub fn irr_radius(&mut self, params: &PairParams) -> Result<f64, TableError> {
        let key = PairKey::of(params);
        if let Some(slice) = self.pairs.get(&key) {
            return Ok(slice.irr_radius);
        }
        // Force the slice into existence via a contact lookup.
        self.lookup(params, params.sigma)?;
        Ok(self.pairs[&key].irr_radius)
    }

    fn solve_bin(slice: &PairSlice, bin: u32) -> Result<TableEntry, TableError> {
        let p = &slice.params;
        let r0 = p.sigma + (bin as f64 + 0.5) * slice.bin_width;
        let prob = assoc_prob(r0, p.dt, p.d_tot, p.ka, p.sigma)?;
        let hi = truncation_radius(r0, p.dt, p.d_tot, p.sigma);
        let surviving = simpson(
            |r| radial_density(r, r0, p.dt, p.d_tot, p.ka, p.sigma),
            p.sigma,
            hi,
            NORM_PANELS,
        );
        Ok(TableEntry {
            assoc_prob: prob,
            survival: 1.0 - prob,
            norm: prob + surviving,
            irr_radius: slice.irr_radius,
        })
    }

    fn clamp(mut entry: TableEntry) -> (TableEntry, bool) {
        if entry.assoc_prob.is_nan() {
            // NaN never reaches acceptance draws; treat as impossible.
            log::warn!("association probability solved to NaN, storing 0");
            entry.assoc_prob = 0.0;
            entry.survival = 1.0;
            return (entry, true);
        }
        if (0.0..=1.0).contains(&entry.assoc_prob) {
            return (entry, false);
        }
        log::warn!(
            "association probability {} outside [0, 1], clamping",
            entry.assoc_prob
        );
        entry.assoc_prob = entry.assoc_prob.clamp(0.0, 1.0);
        entry.survival = 1.0 - entry.assoc_prob;
        (entry, true)
    }

    /// Total entries solved so far.
    pub fn solve_count(&self) -> u64 {
        self.solves
    }

    /// Entries that needed clamping into `[0, 1]`.
    pub fn clamp_count(&self) -> u64 {
        self.clamped
    }

    /// Number of distinct pair classes seen.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Flatten to checkpointable parts, insertion order preserved.
    pub fn export(&self) -> TableDump {
        TableDump {
            pairs: self
                .pairs
                .values()
                .map(|slice| PairDump {
                    params: slice.params,
                    irr_radius: slice.irr_radius,
                    bins: slice.bins.iter().map(|(&b, &e)| (b, e)).collect(),
                })
                .collect(),
            solves: self.solves,
            clamped: self.clamped,
        }
    }

    /// Rebuild from checkpointed parts without re-solving.
    pub fn import(dump: TableDump) -> Self {
        let mut pairs = IndexMap::new();
        for p in dump.pairs {
            let key = PairKey::of(&p.params);
            pairs.insert(
                key,
                PairSlice {
                    params: p.params,
                    bin_width: (p.params.d_tot * p.params.dt).sqrt() / BINS_PER_STEP_LENGTH,
                    irr_radius: p.irr_radius,
                    bins: p.bins.into_iter().collect(),
                },
            );
        }
        Self {
            pairs,
            solves: dump.solves,
            clamped: dump.clamped,
        }
    }
}

/// Flattened table contents for checkpointing.
#[derive(Clone, Debug, PartialEq)]
pub struct TableDump {
    /// Per-pair-class slices in insertion order.
    pub pairs: Vec<PairDump>,
    /// Solve counter at capture time.
    pub solves: u64,
    /// Clamp counter at capture time.
    pub clamped: u64,
}

/// One flattened pair-class slice.
#[derive(Clone, Debug, PartialEq)]
pub struct PairDump {
    /// Identifying parameters.
    pub params: PairParams,
    /// Solved effective absorbing radius.
    pub irr_radius: f64,
    /// `(bin, entry)` pairs in insertion order.
    pub bins: Vec<(u32, TableEntry)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PairParams {
        PairParams {
            d_tot: 10.0,
            ka: 200.0,
            sigma: 1.0,
            dt: 1e-3,
        }
    }

    #[test]
    fn lookup_is_memoized_per_bin() {
        let mut table = PairTable::new();
        let p = params();
        let first = table.lookup(&p, 1.2).unwrap();
        assert_eq!(table.solve_count(), 1);
        // Same bin: no new solve, identical entry.
        let again = table.lookup(&p, 1.2 + 1e-4).unwrap();
        assert_eq!(table.solve_count(), 1);
        assert_eq!(first, again);
        // A well-separated separation lands in another bin.
        table.lookup(&p, 1.5).unwrap();
        assert_eq!(table.solve_count(), 2);
        assert_eq!(table.pair_count(), 1);
    }

    #[test]
    fn distinct_pair_classes_get_distinct_slices() {
        let mut table = PairTable::new();
        let a = params();
        let mut b = params();
        b.ka = 400.0;
        table.lookup(&a, 1.2).unwrap();
        table.lookup(&b, 1.2).unwrap();
        assert_eq!(table.pair_count(), 2);
    }

    #[test]
    fn entries_are_consistent_probabilities() {
        let mut table = PairTable::new();
        let p = params();
        for &r0 in &[1.0, 1.05, 1.3, 2.0] {
            let e = table.lookup(&p, r0).unwrap();
            assert!((0.0..=1.0).contains(&e.assoc_prob));
            assert!((e.assoc_prob + e.survival - 1.0).abs() < 1e-12);
            assert!((e.norm - 1.0).abs() < 1e-3, "norm = {}", e.norm);
            assert!(e.irr_radius > 0.0 && e.irr_radius < p.sigma);
        }
        assert_eq!(table.clamp_count(), 0);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let mut table = PairTable::new();
        let mut p = params();
        p.ka = 0.0;
        assert!(matches!(
            table.lookup(&p, 1.2),
            Err(TableError::BadPairParams { .. })
        ));
        assert!(matches!(
            table.lookup(&params(), f64::INFINITY),
            Err(TableError::NonFinite { .. })
        ));
    }

    #[test]
    fn export_import_round_trips_without_resolving() {
        let mut table = PairTable::new();
        let p = params();
        table.lookup(&p, 1.2).unwrap();
        table.lookup(&p, 1.8).unwrap();
        let dump = table.export();
        let mut rebuilt = PairTable::import(dump.clone());
        assert_eq!(rebuilt.solve_count(), table.solve_count());
        let before = table.lookup(&p, 1.2).unwrap();
        let after = rebuilt.lookup(&p, 1.2).unwrap();
        assert_eq!(before, after);
        // No additional solve happened on either side.
        assert_eq!(rebuilt.export(), dump);
    }
}
