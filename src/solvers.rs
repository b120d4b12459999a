//! Root-finding building blocks.
//!
//! This module has two halves:
//! - The staged root search used by the propagator and the Lambert solver:
//!   [`newton`], then [`probe_bracket`], then [`bisect`]. Each stage reports a
//!   [`RootStage`] so the escalation path is visible at the call site.
//! - Solvers for Kepler's equation in each regime, used to turn a time since
//!   periapsis into a true anomaly.

use core::f64::consts::{PI, TAU};

/// The outcome of one stage of a root search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum RootStage {
    /// The stage found a root.
    Converged(f64),
    /// The local method gave up; the caller should bracket the root and bisect.
    NeedsBracket,
    /// The global method ran out of iterations.
    Exhausted,
}

/// An interval over which the residual changes sign.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Bracket {
    pub lower: f64,
    pub upper: f64,
}

/// Newton-Raphson iteration.
///
/// `func` returns the residual and its derivative at a point.
///
/// Converges when a step is at most `abs_tol + rel_tol * |x|`.
/// Reports [`RootStage::NeedsBracket`] if the derivative vanishes, anything
/// becomes non-finite, or the iteration budget runs out.
pub(crate) fn newton<F>(mut func: F, x0: f64, max_iters: u32, abs_tol: f64, rel_tol: f64) -> RootStage
where
    F: FnMut(f64) -> (f64, f64),
{
    let mut x = x0;

    for _ in 0..max_iters {
        let (value, slope) = func(x);

        if value == 0.0 {
            return RootStage::Converged(x);
        }

        if slope == 0.0 || !value.is_finite() || !slope.is_finite() {
            return RootStage::NeedsBracket;
        }

        let step = value / slope;
        x -= step;

        if !x.is_finite() {
            return RootStage::NeedsBracket;
        }

        if step.abs() <= abs_tol + rel_tol * x.abs() {
            return RootStage::Converged(x);
        }
    }

    RootStage::NeedsBracket
}

/// Ceiling on the halvings used to pull a point back from where the residual
/// overflows. Enough to take any finite `f64` under 1.
pub(crate) const BACKOFF_STEPS: u32 = 1100;

/// Finds a sign change of `func` by exponential probing away from `x0`.
///
/// The sign of the residual at `x0` picks the direction: a negative residual
/// probes `x0 + 10^k`, anything else probes `x0 - 10^k`, for `k = 1..=steps`.
/// A probe that lands where `func` isn't finite is pulled back halfway towards
/// the previous probe until it is, so `func` should be monotone with its
/// overflow far past the root.
///
/// Returns `None` if `func(x0)` isn't finite, or if no sign change shows up
/// within the probe budget.
pub(crate) fn probe_bracket<F>(mut func: F, x0: f64, steps: u32) -> Option<Bracket>
where
    F: FnMut(f64) -> f64,
{
    let start = func(x0);
    if !start.is_finite() {
        return None;
    }

    let upward = start < 0.0;
    let mut last = x0;

    for k in 1..=steps {
        let offset = 10f64.powi(k as i32);
        let mut x1 = if upward { x0 + offset } else { x0 - offset };
        let mut value = func(x1);

        for _ in 0..BACKOFF_STEPS {
            if value.is_finite() {
                break;
            }
            x1 = 0.5 * (x1 + last);
            value = func(x1);
        }

        if !value.is_finite() {
            return None;
        }

        if upward && value > 0.0 {
            return Some(Bracket {
                lower: x0,
                upper: x1,
            });
        }
        if !upward && value < 0.0 {
            return Some(Bracket {
                lower: x1,
                upper: x0,
            });
        }

        last = x1;
    }

    None
}

/// Bisection over a bracket.
///
/// Stops when the half-width falls under `abs_tol + rel_tol * |mid|`, or the
/// residual is exactly zero.
/// The side containing the root is chosen by comparing against the sign of the
/// residual at the lower end, so a non-finite residual at the midpoint keeps
/// the lower end fixed.
pub(crate) fn bisect<F>(
    mut func: F,
    bracket: Bracket,
    max_iters: u32,
    abs_tol: f64,
    rel_tol: f64,
) -> RootStage
where
    F: FnMut(f64) -> f64,
{
    let mut lower = bracket.lower;
    let f_lower = func(lower);
    let f_upper = func(bracket.upper);

    if f_lower == 0.0 {
        return RootStage::Converged(lower);
    }
    if f_upper == 0.0 {
        return RootStage::Converged(bracket.upper);
    }
    if f_lower * f_upper > 0.0 {
        return RootStage::Exhausted;
    }

    let mut half_width = bracket.upper - lower;

    for _ in 0..max_iters {
        half_width *= 0.5;
        let mid = lower + half_width;
        let f_mid = func(mid);

        if f_mid * f_lower >= 0.0 {
            lower = mid;
        }

        if f_mid == 0.0 || half_width.abs() < abs_tol + rel_tol * mid.abs() {
            return RootStage::Converged(mid);
        }
    }

    RootStage::Exhausted
}

/// Weight of the rational seed for the elliptic solver.
///
/// Tommasini and Olivieri, "Two fast and accurate routines for solving the
/// elliptic Kepler equation for all values of the eccentricity and mean
/// anomaly", section 2.1.2. Slightly under 1 seeds better than 1 itself.
///
/// <https://doi.org/10.1051/0004-6361/202141423>
const RATIONAL_SEED_WEIGHT: f64 = 0.999999;

/// Laguerre order. Conway reports convergence is insensitive to it near 5.
const LAGUERRE_ORDER: f64 = 5.0;

/// Iteration ceiling shared by the Kepler equation solvers.
const KEPLER_MAX_ITERS: u32 = 1000;

/// sinh(5). Below `e sinh(5) - 5` the hyperbolic seed comes from a cubic.
const SINH_5: f64 = 74.20321057778875;

/// Hyperbolic sine and cosine from a single pair of exponentials.
pub(crate) fn sinhcosh(x: f64) -> (f64, f64) {
    let grow = x.exp();
    let decay = grow.recip();

    (0.5 * (grow - decay), 0.5 * (grow + decay))
}

/// Real root of the depressed cubic `t^3 + p t + q = 0`, by Cardano.
///
/// Only meaningful when `p >= 0`, where the cubic is monotone; otherwise
/// there may be three real roots and NaN is returned.
pub(crate) fn solve_depressed_cubic(p: f64, q: f64) -> f64 {
    let half_q = 0.5 * q;
    let third_p = p / 3.0;
    let discriminant = half_q * half_q + third_p * third_p * third_p;

    if discriminant < 0.0 {
        return f64::NAN;
    }

    let root = discriminant.sqrt();
    (root - half_q).cbrt() - (root + half_q).cbrt()
}

/// Eccentric anomaly `E` from mean anomaly `M` on an ellipse, solving
/// `E - e sin(E) = M` with Laguerre-Conway iteration.
///
/// Does not check `e < 1`.
///
/// Conway, "An improved algorithm due to Laguerre for the solution of
/// Kepler's equation". <https://doi.org/10.1007/bf01230852>
pub(crate) fn get_elliptic_eccentric_anomaly(eccentricity: f64, mean_anomaly: f64) -> f64 {
    // Solve on [0, π] and restore the revolution count and sign afterwards
    let revolutions = (mean_anomaly / TAU).floor();
    let mut reduced = mean_anomaly - revolutions * TAU;
    if reduced > PI {
        reduced -= TAU;
    }
    let sign = reduced.signum();
    let m = reduced.abs();
    let e = eccentricity;

    // E0 = M + 4 b e M (π - M) / (8 e M + 4 e (e - π) + π^2)
    let mut ecc_anom = m
        + (4.0 * e * RATIONAL_SEED_WEIGHT * m * (PI - m))
            / (8.0 * e * m + 4.0 * e * (e - PI) + PI * PI);

    let n = LAGUERRE_ORDER;
    for _ in 0..KEPLER_MAX_ITERS {
        let (sin_e, cos_e) = ecc_anom.sin_cos();
        let f = ecc_anom - e * sin_e - m;
        let fp = 1.0 - e * cos_e;
        let fpp = e * sin_e;

        // The radical takes the sign of f' so the denominator is as large as possible
        let radical = ((n - 1.0) * (n - 1.0) * fp * fp - n * (n - 1.0) * f * fpp)
            .abs()
            .sqrt()
            .copysign(fp);

        let step = n * f / (fp + radical);
        if !step.is_finite() {
            break;
        }

        ecc_anom -= step;
        if step.abs() < 1e-15 {
            break;
        }
    }

    sign * ecc_anom + revolutions * TAU
}

/// Starting point for [`get_hyperbolic_eccentric_anomaly`].
///
/// Follows the finite/infinite interval split of Wu et al., "A new method
/// for solving the hyperbolic Kepler equation". On the finite interval,
/// sinh is replaced by its cubic Taylor polynomial.
fn get_approx_hyperbolic_eccentric_anomaly(eccentricity: f64, mean_anomaly: f64) -> f64 {
    let sign = mean_anomaly.signum();
    let m = mean_anomaly.abs();
    let e = eccentricity;

    if m == 0.0 {
        return 0.0;
    }

    sign * if m < e * SINH_5 - 5.0 {
        // (e/6) F^3 + (e - 1) F - M = 0. Never undershoots since sinh(F) >= F + F^3/6.
        solve_depressed_cubic(6.0 * (e - 1.0) / e, -6.0 * m / e)
    } else {
        // ln(2M/e) alone can be off by over a percent; one Schröder step
        // (Wu et al., equation 15) tightens it
        let rough = (2.0 * m / e).ln();

        let half_ratio = m / e;
        let half_inverse = 0.25 * e / m;
        let cosh_rough = half_ratio + half_inverse;
        let sinh_rough = half_ratio - half_inverse;

        let beta = (e * cosh_rough - 1.0).recip();
        let gamma = (e * e / (4.0 * m) + rough) * beta;
        let gamma_sq = gamma * gamma;
        let es_beta = e * sinh_rough * beta;
        let ec_beta = e * cosh_rough * beta;

        rough
            + (6.0 * gamma + 3.0 * es_beta * gamma_sq)
                / (6.0 + 6.0 * es_beta * gamma + ec_beta * gamma_sq)
    }
}

/// Hyperbolic anomaly `F` from mean anomaly `M`, solving `e sinh(F) - F = M`.
///
/// Does not check `e > 1`.
///
/// Fourth-order Schröder iteration of the second kind, Wu et al., equation 25.
/// <https://doi.org/10.1016/j.cam.2019.02.035>
pub(crate) fn get_hyperbolic_eccentric_anomaly(eccentricity: f64, mean_anomaly: f64) -> f64 {
    let mut ecc_anom = get_approx_hyperbolic_eccentric_anomaly(eccentricity, mean_anomaly);

    // With h and its derivatives h1, h2, h3 at F, and r = 1 / h1:
    // F <- F - (6 h r - 3 h^2 h2 r^3) / (6 - 6 h h2 r^2 + h^2 h3 r^3)
    for _ in 0..KEPLER_MAX_ITERS {
        let (sinh_f, cosh_f) = sinhcosh(ecc_anom);

        let h3 = eccentricity * cosh_f;
        let h2 = eccentricity * sinh_f;
        let h1 = h3 - 1.0;
        let h = h2 - ecc_anom - mean_anomaly;

        let r = h1.recip();
        let r_sq = r * r;
        let h_sq = h * h;

        let denominator = 6.0 - 6.0 * h * h2 * r_sq + h_sq * h3 * r_sq * r;
        if denominator.abs() < 1e-30 || !denominator.is_finite() {
            break;
        }

        let step = (6.0 * h * r - 3.0 * h_sq * h2 * r_sq * r) / denominator;
        ecc_anom -= step;

        if step.abs() < 1e-14 * ecc_anom.abs().max(1.0) {
            break;
        }
    }

    ecc_anom
}

/// Solves Barker's equation `p D + D^3 / 3 = 2 sqrt(mu) dt` for `D`.
///
/// Monotone in `D`, so the root is closed-form.
pub(crate) fn solve_barker(semi_latus_rectum: f64, sqrt_mu_dt: f64) -> f64 {
    solve_depressed_cubic(3.0 * semi_latus_rectum, -6.0 * sqrt_mu_dt)
}
