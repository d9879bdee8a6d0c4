//! The shared deterministic random stream.
//!
//! One [`SimRng`] drives every stochastic decision in a run. Draws occur in
//! a fixed, documented order per step (creation counts, unimolecular
//! acceptance, bimolecular acceptance, propagation displacements); that
//! order plus the seed reproduces bit-identical trajectories.
//!
//! Gaussian variates use the Box-Muller transform over stream uniforms,
//! avoiding a `rand_distr` dependency. The full internal state (key,
//! stream, word position, draw counter) round-trips through [`RngState`]
//! for checkpoint/restart.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Serializable internal state of a [`SimRng`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RngState {
    /// The user-facing seed the stream was created from.
    pub seed: u64,
    /// The expanded 256-bit ChaCha key.
    pub key: [u8; 32],
    /// The ChaCha stream id.
    pub stream: u64,
    /// High half of the 128-bit word position.
    pub word_pos_hi: u64,
    /// Low half of the 128-bit word position.
    pub word_pos_lo: u64,
    /// Number of uniforms drawn so far.
    pub draws: u64,
}

/// Seeded pseudo-random stream with an explicit draw counter.
///
/// The draw counter is bookkeeping only (the original system kept it as a
/// process global); determinism comes from the ChaCha word position.
#[derive(Clone, Debug)]
pub struct SimRng {
    inner: ChaCha20Rng,
    seed: u64,
    draws: u64,
}

impl SimRng {
    /// Create a stream from a 64-bit seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: ChaCha20Rng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    /// The seed this stream was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of uniforms drawn since creation (or since restore).
    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    /// One uniform variate in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.draws += 1;
        self.inner.random()
    }

    /// One standard-normal variate via the Box-Muller transform.
    ///
    /// Consumes exactly two uniforms.
    pub fn gaussian(&mut self) -> f64 {
        let u1 = self.uniform().max(1e-300); // avoid ln(0)
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    /// One Poisson variate with the given mean.
    ///
    /// Knuth's product method for small means (one uniform per trial);
    /// gaussian approximation for large means where the product method
    /// would underflow into hundreds of draws.
    pub fn poisson(&mut self, mean: f64) -> u64 {
        if mean <= 0.0 {
            return 0;
        }
        if mean > 64.0 {
            let v = mean + self.gaussian() * mean.sqrt();
            return v.round().max(0.0) as u64;
        }
        let limit = (-mean).exp();
        let mut k = 0u64;
        let mut p = 1.0;
        loop {
            p *= self.uniform();
            if p <= limit {
                return k;
            }
            k += 1;
        }
    }

    /// Capture the full internal state for a checkpoint.
    pub fn state(&self) -> RngState {
        let word_pos = self.inner.get_word_pos();
        RngState {
            seed: self.seed,
            key: self.inner.get_seed(),
            stream: self.inner.get_stream(),
            word_pos_hi: (word_pos >> 64) as u64,
            word_pos_lo: word_pos as u64,
            draws: self.draws,
        }
    }

    /// Rebuild a stream from a captured state.
    ///
    /// The restored stream continues the original sequence exactly.
    pub fn restore(state: &RngState) -> Self {
        let mut inner = ChaCha20Rng::from_seed(state.key);
        inner.set_stream(state.stream);
        inner.set_word_pos(((state.word_pos_hi as u128) << 64) | state.word_pos_lo as u128);
        Self {
            inner,
            seed: state.seed,
            draws: state.draws,
        }
    }
}
