//! Irreversible-pair Green's function for diffusion to a reactive sphere.
//!
//! A pair at separation `r0` diffuses with combined coefficient `D` toward
//! a radiation boundary of radius `sigma` and intrinsic rate `ka`. The
//! closed forms below give the probability of reacting within `dt` and the
//! radial density of survivors; both reduce to the classic Smoluchowski
//! absorbing-sphere results as `ka -> inf`.

use nidus_core::math::{erfc, erfcx};

use crate::TableError;

/// Diffusion-limited rate `4 pi sigma D`.
pub fn k_diff(d_tot: f64, sigma: f64) -> f64 {
    4.0 * std::f64::consts::PI * sigma * d_tot
}

/// Boundary parameter `alpha = (1 + ka/kD) sqrt(D) / sigma`.
fn alpha(d_tot: f64, ka: f64, sigma: f64) -> f64 {
    (1.0 + ka / k_diff(d_tot, sigma)) * d_tot.sqrt() / sigma
}

/// `W(a, b) = exp(2ab + b^2) erfc(a + b)`, evaluated without overflow as
/// `exp(-a^2) erfcx(a + b)`.
fn w_term(a: f64, b: f64) -> f64 {
    (-a * a).exp() * erfcx(a + b)
}

/// Probability that a pair starting at separation `r0` reacts within `dt`.
///
/// Separations inside the binding radius are evaluated at contact; the
/// propagator's overlap sweep keeps them rare.
pub fn assoc_prob(r0: f64, dt: f64, d_tot: f64, ka: f64, sigma: f64) -> Result<f64, TableError> {
    if !(r0.is_finite() && r0 > 0.0) {
        return Err(TableError::NonFinite { separation: r0 });
    }
    let r0 = r0.max(sigma);
    let kd = k_diff(d_tot, sigma);
    let sqrt_4dt = (4.0 * d_tot * dt).sqrt();
    let a = (r0 - sigma) / sqrt_4dt;
    let b = alpha(d_tot, ka, sigma) * dt.sqrt();
    Ok((ka / (ka + kd)) * (sigma / r0) * (erfc(a) - w_term(a, b)))
}

/// Radial density `q(r) = 4 pi r^2 p(r, dt | r0)` of a surviving pair.
///
/// Integrating `q` over `r in [sigma, inf)` recovers `1 - assoc_prob`.
pub fn radial_density(r: f64, r0: f64, dt: f64, d_tot: f64, ka: f64, sigma: f64) -> f64 {
    if r < sigma {
        return 0.0;
    }
    let sqrt_4dt = (4.0 * d_tot * dt).sqrt();
    let direct = (r - r0) / sqrt_4dt;
    let image = (r + r0 - 2.0 * sigma) / sqrt_4dt;
    let al = alpha(d_tot, ka, sigma);
    let gauss = ((-direct * direct).exp() + (-image * image).exp())
        / (4.0 * std::f64::consts::PI * d_tot * dt).sqrt();
    let boundary = (al / d_tot.sqrt()) * w_term(image, al * dt.sqrt());
    (r / r0) * (gauss - boundary)
}

/// Upper truncation radius for survivor integrals: the density beyond the
/// start separation plus a few diffusion lengths is negligible.
pub fn truncation_radius(r0: f64, dt: f64, d_tot: f64, sigma: f64) -> f64 {
    r0.max(sigma) + 10.0 * (4.0 * d_tot * dt).sqrt()
}
