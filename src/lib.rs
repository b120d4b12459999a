//! # Two-Body Orbits
//! This library crate computes and propagates two-body (Keplerian) orbits.
//!
//! Given a gravitational parameter and a state (position and velocity, or
//! classical orbital elements), it can:
//! - derive the complementary representation,
//! - predict the position and velocity at any past or future time,
//! - sample points along the trajectory for display,
//! - solve Lambert's problem: find the velocities that connect two known
//!   positions in a given flight time.
//!
//! Two-body orbits ignore perturbations and other bodies entirely. Units are
//! up to you, as long as they're consistent with the gravitational parameter.
//!
//! ## Getting started
//! This crate provides these main items:
//! - [`OrbitalState`]: An immutable orbit around a central body. All derived
//!   elements are computed once, when the state is built.
//! - [`TwoBodyOrbit`]: A named body whose orbit can be defined, redefined, or
//!   cleared. Queries on an undefined orbit fail with [`StateError::Undefined`].
//! - [`solve_lambert`]: A stateless solver for Lambert's problem.
//!
//! The [`central_bodies`] module contains gravitational parameters of some
//! common central bodies.
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec3;
//!
//! use twobody_orbit::{central_bodies::SUN_MU, solve_lambert, Direction, OrbitalState};
//!
//! # fn main() -> Result<(), twobody_orbit::OrbitError> {
//! let r1 = DVec3::new(1.5e11, 0.0, 0.0);
//! let r2 = DVec3::new(0.0, 1.3e11, 2e10);
//! let flight_time = 100.0 * 86400.0;
//!
//! let transfer = solve_lambert(r1, r2, flight_time, SUN_MU, Direction::Prograde)?;
//!
//! let orbit = OrbitalState::from_cartesian(SUN_MU, 0.0, r1, transfer.v1)?;
//! let arrival = orbit.posvelatt(flight_time)?;
//!
//! assert!((arrival.position - r2).length() < 1.0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod central_bodies;
mod elements;
mod error;
mod lambert;
mod orbit;
mod propagator;
mod settings;
mod solvers;
mod state;
pub mod stumpff;
mod trajectory;

use core::f64::consts::TAU;

use glam::{DVec2, DVec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use elements::{EllipticElements, KeplerianElements};
pub use error::{ConvergenceError, DomainError, OrbitError, StateError};
pub use lambert::{solve_lambert, solve_lambert_with, Direction, LambertSolution};
pub use orbit::TwoBodyOrbit;
pub use settings::SolverSettings;
pub use state::{ClassicalElements, EpochAnchor, OrbitalState};
pub use trajectory::TrajectoryPoint;

/// The first two columns of a perifocal-to-inertial rotation.
///
/// A vector in the orbital plane, written as `(x, y)` along the periapsis
/// direction and 90° ahead of it, maps to the reference frame through
/// [`dot_vec`][Self::dot_vec]. The third perifocal axis is the orbit normal,
/// which never enters a position or velocity, so it is not stored.
///
/// Elements are named `eRC`, by row then column.
///
/// # Example
/// ```
/// use core::f64::consts::FRAC_PI_2;
///
/// use glam::DVec2;
///
/// use twobody_orbit::Matrix3x2;
///
/// // Tilted 90° about the X axis: the orbit's Y direction becomes +Z.
/// let tilt = Matrix3x2::from_orientation(FRAC_PI_2, 0.0, 0.0);
/// let lifted = tilt.dot_vec(DVec2::new(0.0, 2.0));
///
/// assert!((lifted.z - 2.0).abs() < 1e-12);
/// assert!(lifted.y.abs() < 1e-12);
/// ```
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix3x2 {
    pub e11: f64,
    pub e12: f64,
    pub e21: f64,
    pub e22: f64,
    pub e31: f64,
    pub e32: f64,
}

impl Matrix3x2 {
    /// Builds the rotation from the perifocal plane into the reference frame.
    ///
    /// The first column is the unit vector towards periapsis (P̂), and the
    /// second column is the unit vector 90° ahead of it in the orbital plane (Q̂).
    ///
    /// # Parameters
    /// - `inclination`: The inclination of the orbit, in radians.
    /// - `long_asc_node`: The longitude of ascending node of the orbit, in radians.
    /// - `arg_pe`: The argument of periapsis of the orbit, in radians.
    pub fn from_orientation(inclination: f64, long_asc_node: f64, arg_pe: f64) -> Self {
        let (sin_inc, cos_inc) = inclination.sin_cos();
        let (sin_arg_pe, cos_arg_pe) = arg_pe.sin_cos();
        let (sin_lan, cos_lan) = long_asc_node.sin_cos();

        // https://downloads.rene-schwarz.com/download/M001-Keplerian_Orbit_Elements_to_Cartesian_State_Vectors.pdf
        Matrix3x2 {
            e11: cos_arg_pe * cos_lan - sin_arg_pe * cos_inc * sin_lan,
            e12: -(sin_arg_pe * cos_lan + cos_arg_pe * cos_inc * sin_lan),

            e21: cos_arg_pe * sin_lan + sin_arg_pe * cos_inc * cos_lan,
            e22: cos_arg_pe * cos_inc * cos_lan - sin_arg_pe * sin_lan,

            e31: sin_arg_pe * sin_inc,
            e32: cos_arg_pe * sin_inc,
        }
    }

    /// Rotates an in-plane perifocal vector into the reference frame.
    pub fn dot_vec(&self, vec: DVec2) -> DVec3 {
        DVec3::new(
            vec.x * self.e11 + vec.y * self.e12,
            vec.x * self.e21 + vec.y * self.e22,
            vec.x * self.e31 + vec.y * self.e32,
        )
    }
}

/// A struct representing a position and velocity at a point in the orbit.
///
/// The position and velocity vectors are three-dimensional, in whatever
/// length and time units the gravitational parameter uses.
///
/// State vectors can be used to form an orbit, see
/// [`to_orbital_state`][Self::to_orbital_state].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateVectors {
    /// The 3D position at a point in the orbit.
    pub position: DVec3,
    /// The 3D velocity at a point in the orbit.
    pub velocity: DVec3,
}

impl StateVectors {
    /// Create a new [`OrbitalState`] from the state vectors, an epoch,
    /// and a given mu value.
    ///
    /// # Mu
    /// Mu is also known as the gravitational parameter, and
    /// is equal to `GM`, where `G` is the gravitational constant,
    /// and `M` is the mass of the parent body.
    ///
    /// Learn more about the gravitational parameter:
    /// <https://en.wikipedia.org/wiki/Standard_gravitational_parameter>
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use twobody_orbit::StateVectors;
    ///
    /// let sv = StateVectors {
    ///     position: DVec3::new(1.0, 0.0, 0.0),
    ///     velocity: DVec3::new(0.0, 1.0, 0.0),
    /// };
    ///
    /// let orbit = sv.to_orbital_state(1.0, 0.0).unwrap();
    /// assert!(orbit.get_eccentricity() < 1e-12);
    /// ```
    pub fn to_orbital_state(self, mu: f64, epoch: f64) -> Result<OrbitalState, OrbitError> {
        OrbitalState::from_cartesian(mu, epoch, self.position, self.velocity)
    }

    /// Gets the specific orbital energy `|v|^2 / 2 - mu / |r|`.
    ///
    /// This is conserved along a two-body trajectory.
    pub fn specific_energy(&self, mu: f64) -> f64 {
        0.5 * self.velocity.length_squared() - mu / self.position.length()
    }
}

/// Wraps an angle into `[0, 2π)`.
#[inline]
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests;
