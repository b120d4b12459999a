//! Lambert's problem, solved with the universal-variable method.
//!
//! Given two positions and a flight time, find the velocities at both ends of
//! the conic that connects them. Only single-revolution transfers are
//! considered.

use core::f64::consts::{PI, TAU};

use glam::DVec3;
use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{ensure_finite, ensure_finite_vec, ensure_mu},
    normalize_angle,
    solvers::{self, Bracket, RootStage},
    stumpff, ConvergenceError, DomainError, OrbitError, SolverSettings,
};

/// Transfer angles closer than this to 0 or 2π are rejected.
const MIN_TRANSFER_ANGLE: f64 = 0.001;

/// Transfer angles closer than this to π are rejected.
const ANTIPODAL_MARGIN: f64 = 1e-5;

/// `(2π)^2`, where `sqrt(z)` completes one revolution.
const ONE_REVOLUTION_Z: f64 = TAU * TAU;

/// How many upper-bound candidates `(2π)^2 - 10^-i` are tried.
const UPPER_BOUND_CANDIDATES: i32 = 10;

/// Direction of motion of the transfer, about the +Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Counterclockwise when viewed from +Z.
    #[default]
    Prograde,
    /// Clockwise when viewed from +Z.
    Retrograde,
}

impl Direction {
    /// Returns +1.0 for prograde, -1.0 for retrograde
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Prograde => 1.0,
            Direction::Retrograde => -1.0,
        }
    }
}

/// Velocities at both ends of a Lambert transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LambertSolution {
    /// Velocity at the departure position.
    pub v1: DVec3,
    /// Velocity at the arrival position.
    pub v2: DVec3,
}

/// The time-of-flight residual as a function of the universal parameter `z`.
struct TransferEquation {
    sqrt_mu: f64,
    flight_time: f64,
    /// r1 + r2
    radius_sum: f64,
    /// sqrt(r1 r2) sin Δν / sqrt(1 - cos Δν)
    a: f64,
}

impl TransferEquation {
    fn y(&self, z: f64) -> f64 {
        let (c, s) = stumpff::c_and_s(z);
        self.radius_sum - self.a * (1.0 - z * s) / c.sqrt()
    }

    /// NaN when `y(z)` is negative.
    fn residual(&self, z: f64) -> f64 {
        let (c, s) = stumpff::c_and_s(z);
        let y = self.radius_sum - self.a * (1.0 - z * s) / c.sqrt();
        let x = (y / c).sqrt();

        (x * x * x * s + self.a * y.sqrt()) / self.sqrt_mu - self.flight_time
    }

    fn upper_bound(&self) -> Option<f64> {
        (0..UPPER_BOUND_CANDIDATES)
            .map(|i| ONE_REVOLUTION_Z - 10f64.powi(-i))
            .find(|&z| {
                let value = self.residual(z);
                value.is_finite() && value > 0.0
            })
    }

    /// Walks `lower` down towards `-(2π)^2` until the residual turns non-positive,
    /// backing off towards the last good point whenever it isn't finite.
    fn lower_bracket(&self, start: f64, upper: f64, steps: u32) -> Option<Bracket> {
        let mut lower = start;
        let mut last = upper;

        for _ in 0..steps {
            let value = self.residual(lower);

            if !value.is_finite() {
                lower = (lower + last) * 0.5;
            } else if value > 0.0 {
                last = lower;
                lower = (lower - ONE_REVOLUTION_Z) * 0.5;
            } else {
                return Some(Bracket {
                    lower,
                    upper: last,
                });
            }
        }

        None
    }
}

/// Solves Lambert's problem with the [default solver settings][SolverSettings::default].
///
/// # Parameters
/// - `r1`: The departure position, relative to the central body.
/// - `r2`: The arrival position, relative to the central body.
/// - `flight_time`: The time of flight from `r1` to `r2`.
/// - `mu`: The gravitational parameter of the central body.
/// - `direction`: Whether the transfer goes counterclockwise or clockwise
///   about +Z.
///
/// # Errors
/// - [`DomainError::GravitationalParameter`], [`DomainError::FlightTime`],
///   [`DomainError::NonFinite`], or [`DomainError::ZeroPosition`] for invalid
///   inputs.
/// - [`DomainError::TransferAngleTooSmall`] if the transfer angle is within
///   0.001 rad of 0 or 2π.
/// - [`DomainError::AntipodalPositions`] if the transfer angle is within
///   1e-5 rad of π.
/// - [`ConvergenceError`] if the universal parameter can't be bracketed.
///
/// # Example
/// ```
/// use glam::DVec3;
/// use twobody_orbit::{solve_lambert, Direction};
///
/// // A quarter of a circular orbit
/// let solution = solve_lambert(
///     DVec3::X,
///     DVec3::Y,
///     std::f64::consts::FRAC_PI_2,
///     1.0,
///     Direction::Prograde,
/// ).unwrap();
///
/// assert!((solution.v1 - DVec3::Y).length() < 1e-6);
/// assert!((solution.v2 + DVec3::X).length() < 1e-6);
/// ```
pub fn solve_lambert(
    r1: DVec3,
    r2: DVec3,
    flight_time: f64,
    mu: f64,
    direction: Direction,
) -> Result<LambertSolution, OrbitError> {
    solve_lambert_with(r1, r2, flight_time, mu, direction, &SolverSettings::default())
}

/// Solves Lambert's problem with custom solver settings.
///
/// See [`solve_lambert`].
pub fn solve_lambert_with(
    r1: DVec3,
    r2: DVec3,
    flight_time: f64,
    mu: f64,
    direction: Direction,
    settings: &SolverSettings,
) -> Result<LambertSolution, OrbitError> {
    let mu = ensure_mu(mu)?;
    let r1 = ensure_finite_vec(r1, "departure position")?;
    let r2 = ensure_finite_vec(r2, "arrival position")?;
    let flight_time = ensure_finite(flight_time, "flight time")?;
    if flight_time <= 0.0 {
        return Err(DomainError::FlightTime(flight_time).into());
    }

    let r1_mag = r1.length();
    let r2_mag = r2.length();
    if r1_mag == 0.0 || r2_mag == 0.0 {
        return Err(DomainError::ZeroPosition.into());
    }

    let cross = r1.cross(r2);
    let mut sin_dnu = cross.length() / r1_mag / r2_mag;
    if cross.z < 0.0 {
        sin_dnu = -sin_dnu;
    }
    sin_dnu *= direction.sign();
    let cos_dnu = r1.dot(r2) / r1_mag / r2_mag;

    let dnu = normalize_angle(sin_dnu.atan2(cos_dnu));

    if !(MIN_TRANSFER_ANGLE..=TAU - MIN_TRANSFER_ANGLE).contains(&dnu) {
        return Err(DomainError::TransferAngleTooSmall(dnu).into());
    }
    if (dnu - PI).abs() < ANTIPODAL_MARGIN {
        return Err(DomainError::AntipodalPositions(dnu).into());
    }

    let equation = TransferEquation {
        sqrt_mu: mu.sqrt(),
        flight_time,
        radius_sum: r1_mag + r2_mag,
        a: (r1_mag * r2_mag).sqrt() * sin_dnu / (1.0 - cos_dnu).sqrt(),
    };

    let upper = equation
        .upper_bound()
        .ok_or(ConvergenceError::LambertUpperBound)?;

    let bracket = equation
        .lower_bracket(-dnu * dnu, upper, settings.lambert_bracket_steps)
        .ok_or(ConvergenceError::LambertLowerBound)?;

    trace!(
        "lambert parameter bracketed in [{}, {}]",
        bracket.lower,
        bracket.upper
    );

    let z = match solvers::bisect(
        |z| equation.residual(z),
        bracket,
        settings.lambert_bisection_iters,
        settings.lambert_abs_tolerance,
        settings.lambert_rel_tolerance,
    ) {
        RootStage::Converged(z) => z,
        _ => {
            debug!("lambert bisection ran out of iterations in {bracket:?}");
            return Err(ConvergenceError::BisectionExhausted {
                iterations: settings.lambert_bisection_iters,
            }
            .into());
        }
    };

    let y = equation.y(z);
    let f = 1.0 - y / r1_mag;
    let g = equation.a * (y / mu).sqrt();
    let g_dot = 1.0 - y / r2_mag;

    Ok(LambertSolution {
        v1: (r2 - f * r1) / g,
        v2: (g_dot * r2 - r1) / g,
    })
}
