//! Quadrature and root-finding used by the table solver.

use crate::gf::k_diff;
use crate::TableError;

/// Composite Simpson quadrature of `f` over `[a, b]` with `panels` even
/// subdivisions.
pub fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, panels: usize) -> f64 {
    debug_assert!(panels >= 2 && panels % 2 == 0, "panels must be even");
    let h = (b - a) / panels as f64;
    let mut sum = f(a) + f(b);
    for i in 1..panels {
        let w = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += w * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

/// Bisection root of `f` on `[lo, hi]`.
///
/// The bracket must straddle the root; the interval is halved until it is
/// narrower than `tol`.
pub fn bisect(
    f: impl Fn(f64) -> f64,
    mut lo: f64,
    mut hi: f64,
    tol: f64,
) -> Result<f64, TableError> {
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if !f_lo.is_finite() || !f_hi.is_finite() || f_lo * f_hi > 0.0 {
        return Err(TableError::BracketFailed { lo, hi });
    }
    while hi - lo > tol {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_lo * f_mid <= 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Effective absorbing radius reproducing the pair's steady-state rate.
///
/// The steady flux to a perfectly absorbing sphere of radius `rho` is
/// `4 pi D / I(rho)` with resistance integral `I(rho) = int_rho^inf dr/r^2`.
/// The radius is the root where that flux equals the radiation-boundary
/// rate `ka kD / (ka + kD)`; it collapses a slow intrinsic rate into a
/// smaller contact sphere for placement after dissociation.
pub fn effective_radius(d_tot: f64, ka: f64, sigma: f64) -> Result<f64, TableError> {
    let kd = k_diff(d_tot, sigma);
    let k_eff = ka * kd / (ka + kd);
    let flux = |rho: f64| {
        // Substituting r = rho e^t turns dr/r^2 into a smooth exponential,
        // integrable accurately on a uniform grid. The tail beyond the cap
        // contributes exactly 1/cap.
        let cap = 1e3 * sigma;
        let span = (cap / rho).ln();
        let resistance = simpson(|t| (-t).exp() / rho, 0.0, span, 512) + 1.0 / cap;
        4.0 * std::f64::consts::PI * d_tot / resistance
    };
    bisect(|rho| flux(rho) - k_eff, 1e-6 * sigma, sigma, 1e-10 * sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simpson_integrates_polynomials_exactly() {
        // Simpson is exact through cubics.
        let got = simpson(|x| x * x * x - 2.0 * x, 0.0, 2.0, 2);
        assert!((got - 0.0).abs() < 1e-12);
    }

    #[test]
    fn bisect_finds_a_root() {
        let root = bisect(|x| x * x - 2.0, 0.0, 2.0, 1e-12).unwrap();
        assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
    }

    #[test]
    fn bisect_rejects_bad_bracket() {
        assert!(matches!(
            bisect(|x| x * x + 1.0, -1.0, 1.0, 1e-9),
            Err(TableError::BracketFailed { .. })
        ));
    }

    #[test]
    fn effective_radius_matches_analytic_form() {
        // For pure diffusion the root is sigma ka / (ka + kD).
        let (d, ka, sigma) = (10.0, 200.0, 1.0);
        let kd = k_diff(d, sigma);
        let expected = sigma * ka / (ka + kd);
        let got = effective_radius(d, ka, sigma).unwrap();
        assert!((got - expected).abs() < 1e-4 * sigma, "{got} vs {expected}");
    }

    #[test]
    fn effective_radius_approaches_sigma_for_fast_rates() {
        let got = effective_radius(10.0, 1e9, 1.0).unwrap();
        assert!(got > 0.999);
    }
}
