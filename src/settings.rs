#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Iteration ceilings and tolerances for the root-finders.
///
/// The [`Default`] values are the ones used by
/// [`OrbitalState::posvelatt`][crate::OrbitalState::posvelatt] and
/// [`solve_lambert`][crate::solve_lambert].
/// Every loop in this crate is bounded by one of these ceilings, so the
/// worst-case cost of a call is fixed.
///
/// # Example
/// ```
/// use twobody_orbit::SolverSettings;
///
/// let settings = SolverSettings {
///     bisection_max_iters: 400,
///     ..SolverSettings::default()
/// };
/// assert_eq!(settings.probe_steps, 50);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverSettings {
    /// Maximum Newton-Raphson iterations on the universal Kepler equation
    /// before falling back to bracketing.
    pub newton_max_iters: u32,
    /// Absolute step tolerance for Newton-Raphson, in units of the universal anomaly.
    pub newton_abs_tolerance: f64,
    /// Step tolerance for Newton-Raphson relative to the magnitude of the iterate.
    pub newton_rel_tolerance: f64,
    /// Maximum number of exponential probe steps (`x0 ± 10^k`) when bracketing
    /// the universal anomaly.
    pub probe_steps: u32,
    /// Maximum bisection iterations on the universal anomaly.
    pub bisection_max_iters: u32,
    /// Absolute interval tolerance for bisection on the universal anomaly.
    pub bisection_abs_tolerance: f64,
    /// Relative interval tolerance for bisection on the universal anomaly.
    pub bisection_rel_tolerance: f64,
    /// Maximum steps taken while searching for the lower bound of the Lambert
    /// universal parameter.
    pub lambert_bracket_steps: u32,
    /// Maximum bisection iterations on the Lambert universal parameter.
    pub lambert_bisection_iters: u32,
    /// Absolute interval tolerance for bisection on the Lambert universal parameter.
    pub lambert_abs_tolerance: f64,
    /// Relative interval tolerance for bisection on the Lambert universal parameter.
    pub lambert_rel_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            newton_max_iters: 50,
            newton_abs_tolerance: 1.48e-8,
            newton_rel_tolerance: 1e-13,
            probe_steps: 50,
            bisection_max_iters: 200,
            bisection_abs_tolerance: 2e-12,
            bisection_rel_tolerance: 4.0 * f64::EPSILON,
            lambert_bracket_steps: 100,
            lambert_bisection_iters: 100,
            lambert_abs_tolerance: 1e-14,
            lambert_rel_tolerance: 4.0 * f64::EPSILON,
        }
    }
}
