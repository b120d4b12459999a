//! Stumpff functions C(z) and S(z).
//!
//! These are the functions that let the universal-variable formulation treat
//! elliptic (z > 0), parabolic (z = 0), and hyperbolic (z < 0) trajectories
//! with one set of equations. They're used by both the propagator and the
//! Lambert solver.
//!
//! Learn more: <https://en.wikipedia.org/wiki/Stumpff_function>

/// Below this magnitude of `z`, the closed forms lose precision to
/// cancellation and the Maclaurin series is used instead.
const SERIES_BAND: f64 = 1e-2;

/// Computes the Stumpff function C(z).
///
/// ```text
/// z > 0: (1 - cos(sqrt(z))) / z
/// z < 0: (1 - cosh(sqrt(-z))) / z
/// z = 0: 1/2
/// ```
///
/// # Example
/// ```
/// use twobody_orbit::stumpff;
///
/// assert_eq!(stumpff::c(0.0), 0.5);
/// let z = std::f64::consts::PI.powi(2);
/// assert!((stumpff::c(z) - 2.0 / z).abs() < 1e-15);
/// ```
pub fn c(z: f64) -> f64 {
    if z.abs() < SERIES_BAND {
        // 1/2! - z/4! + z^2/6! - z^3/8! + z^4/10!
        return 0.5 - z * (1.0 / 24.0 - z * (1.0 / 720.0 - z * (1.0 / 40320.0 - z / 3628800.0)));
    }

    if z > 0.0 {
        (1.0 - z.sqrt().cos()) / z
    } else {
        (1.0 - (-z).sqrt().cosh()) / z
    }
}

/// Computes the Stumpff function S(z).
///
/// ```text
/// z > 0: (sqrt(z) - sin(sqrt(z))) / sqrt(z)^3
/// z < 0: (sinh(sqrt(-z)) - sqrt(-z)) / sqrt(-z)^3
/// z = 0: 1/6
/// ```
///
/// # Example
/// ```
/// use twobody_orbit::stumpff;
///
/// assert_eq!(stumpff::s(0.0), 1.0 / 6.0);
/// assert!(stumpff::s(-4.0) > stumpff::s(0.0));
/// ```
pub fn s(z: f64) -> f64 {
    if z.abs() < SERIES_BAND {
        // 1/3! - z/5! + z^2/7! - z^3/9! + z^4/11!
        return 1.0 / 6.0
            - z * (1.0 / 120.0 - z * (1.0 / 5040.0 - z * (1.0 / 362880.0 - z / 39916800.0)));
    }

    if z > 0.0 {
        let sqrt_z = z.sqrt();
        (sqrt_z - sqrt_z.sin()) / (sqrt_z * sqrt_z * sqrt_z)
    } else {
        let sqrt_neg_z = (-z).sqrt();
        (sqrt_neg_z.sinh() - sqrt_neg_z) / (sqrt_neg_z * sqrt_neg_z * sqrt_neg_z)
    }
}

/// Computes both C(z) and S(z).
///
/// Returns a tuple which contains:
/// - 0: C(z)
/// - 1: S(z)
#[inline]
pub fn c_and_s(z: f64) -> (f64, f64) {
    (c(z), s(z))
}
