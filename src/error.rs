//! Error types returned by orbit construction, propagation, and Lambert solving.
//!
//! Errors are split into three families:
//! - [`StateError`]: the orbit was queried before being defined.
//! - [`DomainError`]: the input geometry is degenerate or inconsistent.
//! - [`ConvergenceError`]: a root-finder exhausted its iteration budget.
//!
//! All three convert into [`OrbitError`], which is what the public API returns.

use thiserror::Error;

/// An error caused by querying an orbit that has not been defined yet.
#[derive(Error, PartialEq, Eq, Debug, Clone, Copy)]
pub enum StateError {
    /// ### The orbit has not been defined.
    /// A [`TwoBodyOrbit`][crate::TwoBodyOrbit] starts out undefined and only
    /// becomes usable after one of its setters succeeds.
    #[error("orbit has not been defined")]
    Undefined,
}

/// An error caused by degenerate or inconsistent input geometry.
#[derive(Error, PartialEq, Debug, Clone, Copy)]
pub enum DomainError {
    /// The gravitational parameter must be finite and strictly positive.
    #[error("gravitational parameter must be finite and positive, got {0}")]
    GravitationalParameter(f64),

    /// An input value was NaN or infinite.
    #[error("non-finite input: {0}")]
    NonFinite(&'static str),

    /// The position vector was the zero vector.
    #[error("position vector must not be at the origin")]
    ZeroPosition,

    /// ### The specific angular momentum is zero.
    /// Position and velocity are parallel (or the velocity is zero), so the
    /// trajectory is rectilinear and has no orbital plane.
    #[error("angular momentum is zero; rectilinear trajectories are not supported")]
    ZeroAngularMomentum,

    /// The classical elements don't describe a valid conic.
    #[error("inconsistent classical elements: {0}")]
    InconsistentElements(&'static str),

    /// The epoch anchor can't be combined with the given elements.
    #[error("inconsistent epoch anchor: {0}")]
    InconsistentAnchor(&'static str),

    /// ### The transfer angle is too close to 0 or 2π.
    /// The two positions are nearly collinear on the same side of the central
    /// body, and the transfer direction is ambiguous.
    #[error("difference in true anomaly is too small ({0} rad)")]
    TransferAngleTooSmall(f64),

    /// ### The transfer angle is too close to π.
    /// The transfer plane is undefined and there is an infinite family of
    /// solutions.
    #[error("the two positions are placed opposite each other ({0} rad)")]
    AntipodalPositions(f64),

    /// The flight time must be finite and strictly positive.
    #[error("flight time must be finite and positive, got {0}")]
    FlightTime(f64),
}

/// An error caused by a root-finder running out of its iteration budget.
#[derive(Error, PartialEq, Debug, Clone, Copy)]
pub enum ConvergenceError {
    /// No sign change of the residual was found while probing for a bracket.
    #[error("no sign change found after {steps} probe steps")]
    NoSignChange {
        /// How many probe steps were taken.
        steps: u32,
    },

    /// Bisection did not reach the requested tolerance.
    #[error("bisection did not converge within {iterations} iterations")]
    BisectionExhausted {
        /// How many bisection iterations were taken.
        iterations: u32,
    },

    /// No finite, positive upper bound for the Lambert universal parameter.
    #[error("could not find an upper bound for the Lambert solver")]
    LambertUpperBound,

    /// No lower bound bracketing the Lambert root was found.
    #[error("could not find a lower bound for the Lambert solver")]
    LambertLowerBound,
}

/// The error type returned by the public API of this crate.
#[derive(Error, PartialEq, Debug, Clone, Copy)]
pub enum OrbitError {
    #[allow(missing_docs)]
    #[error(transparent)]
    State(#[from] StateError),
    #[allow(missing_docs)]
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[allow(missing_docs)]
    #[error(transparent)]
    Convergence(#[from] ConvergenceError),
}

pub(crate) fn ensure_finite(value: f64, what: &'static str) -> Result<f64, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NonFinite(what))
    }
}

pub(crate) fn ensure_finite_vec(
    value: glam::DVec3,
    what: &'static str,
) -> Result<glam::DVec3, DomainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NonFinite(what))
    }
}

pub(crate) fn ensure_mu(mu: f64) -> Result<f64, DomainError> {
    if mu.is_finite() && mu > 0.0 {
        Ok(mu)
    } else {
        Err(DomainError::GravitationalParameter(mu))
    }
}
