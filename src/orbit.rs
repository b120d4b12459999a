use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    central_bodies::SUN_MU, ClassicalElements, EpochAnchor, KeplerianElements, OrbitError,
    OrbitalState, StateError, StateVectors, TrajectoryPoint,
};

/// A named body orbiting a central body.
///
/// A `TwoBodyOrbit` starts out undefined. It becomes usable once
/// [`set_cartesian`][Self::set_cartesian] or
/// [`set_classical`][Self::set_classical] succeeds, and it can be redefined or
/// [cleared][Self::clear] at any time. Queries on an undefined orbit fail with
/// [`StateError::Undefined`].
///
/// # Example
/// ```
/// use glam::DVec3;
/// use twobody_orbit::{OrbitError, StateError, TwoBodyOrbit};
///
/// let mut probe = TwoBodyOrbit::with_central_body("Probe", "Earth", 3.986004418e14);
/// assert_eq!(probe.posvelatt(0.0), Err(OrbitError::State(StateError::Undefined)));
///
/// probe.set_cartesian(
///     0.0,
///     DVec3::new(7.0e6, 0.0, 0.0),
///     DVec3::new(0.0, 7.6e3, 0.0),
/// ).unwrap();
/// assert!(probe.is_defined());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwoBodyOrbit {
    /// The name of the orbiting body.
    pub name: String,

    /// The name of the central body.
    central_body: String,

    /// The gravitational parameter of the central body.
    mu: f64,

    /// The orbit, once defined.
    state: Option<OrbitalState>,
}

impl TwoBodyOrbit {
    /// Creates an undefined orbit around the Sun.
    ///
    /// The gravitational parameter is [`SUN_MU`], in m^3/s^2.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_central_body(name, "Sun", SUN_MU)
    }

    /// Creates an undefined orbit around a given central body.
    ///
    /// The gravitational parameter is only checked once the orbit is defined.
    pub fn with_central_body(
        name: impl Into<String>,
        central_body: impl Into<String>,
        mu: f64,
    ) -> Self {
        Self {
            name: name.into(),
            central_body: central_body.into(),
            mu,
            state: None,
        }
    }

    /// Defines the orbit from a position and velocity at `epoch`.
    ///
    /// On failure, the previous orbit (or lack thereof) is kept.
    pub fn set_cartesian(
        &mut self,
        epoch: f64,
        position: DVec3,
        velocity: DVec3,
    ) -> Result<&OrbitalState, OrbitError> {
        let state = OrbitalState::from_cartesian(self.mu, epoch, position, velocity)?;
        Ok(&*self.state.insert(state))
    }

    /// Defines the orbit from classical elements and an epoch anchor.
    ///
    /// On failure, the previous orbit (or lack thereof) is kept.
    pub fn set_classical(
        &mut self,
        elements: ClassicalElements,
        epoch: f64,
        anchor: EpochAnchor,
    ) -> Result<&OrbitalState, OrbitError> {
        let state = OrbitalState::from_classical(self.mu, elements, epoch, anchor)?;
        Ok(&*self.state.insert(state))
    }

    /// Returns the orbit to the undefined state.
    pub fn clear(&mut self) {
        self.state = None;
    }

    /// Whether the orbit has been defined.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.state.is_some()
    }

    /// Gets the orbit, if defined.
    #[inline]
    pub fn state(&self) -> Option<&OrbitalState> {
        self.state.as_ref()
    }

    /// Gets the name of the central body.
    #[inline]
    pub fn get_central_body(&self) -> &str {
        &self.central_body
    }

    /// Gets the gravitational parameter of the central body.
    #[inline]
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.mu
    }

    fn defined(&self) -> Result<&OrbitalState, StateError> {
        self.state.as_ref().ok_or(StateError::Undefined)
    }

    /// See [`OrbitalState::posvelatt`].
    pub fn posvelatt(&self, time: f64) -> Result<StateVectors, OrbitError> {
        self.defined()?.posvelatt(time)
    }

    /// See [`OrbitalState::points`].
    pub fn points(&self, count: usize) -> Result<Vec<TrajectoryPoint>, OrbitError> {
        Ok(self.defined()?.points(count))
    }

    /// See [`OrbitalState::elements`].
    pub fn elements(&self) -> Result<KeplerianElements, OrbitError> {
        Ok(self.defined()?.elements())
    }

    /// See [`OrbitalState::time_since_periapsis`].
    pub fn time_since_periapsis(&self, true_anomaly: f64) -> Result<f64, OrbitError> {
        Ok(self.defined()?.time_since_periapsis(true_anomaly))
    }

    /// See [`OrbitalState::state_at_true_anomaly`].
    pub fn state_at_true_anomaly(&self, true_anomaly: f64) -> Result<StateVectors, OrbitError> {
        Ok(self.defined()?.state_at_true_anomaly(true_anomaly))
    }
}

impl Default for TwoBodyOrbit {
    /// Creates an undefined orbit around the Sun, named "Body".
    fn default() -> Self {
        Self::new("Body")
    }
}
