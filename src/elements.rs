#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::OrbitalState;

/// A read-only snapshot of an orbit's classical elements.
///
/// Angles are in degrees. This is the only place the crate uses degrees;
/// everything else takes and returns radians.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeplerianElements {
    /// The epoch of the state the elements were derived from.
    pub epoch: f64,
    /// The semi-major axis.
    ///
    /// Infinite for parabolic orbits and negative for hyperbolic ones.
    pub semi_major_axis: f64,
    /// The eccentricity.
    pub eccentricity: f64,
    /// The inclination, in degrees.
    pub inclination: f64,
    /// The longitude of ascending node, in degrees.
    pub long_asc_node: f64,
    /// The argument of periapsis, in degrees.
    pub arg_pe: f64,
    /// The true anomaly at epoch, in degrees.
    pub true_anomaly: f64,
    /// The time of periapsis passage.
    pub periapsis_time: f64,
    /// The semi-latus rectum. Finite for every regime.
    pub semi_latus_rectum: f64,
    /// The periapsis distance. Finite for every regime.
    pub periapsis_distance: f64,
    /// Elements that only exist for closed orbits.
    pub elliptic: Option<EllipticElements>,
}

/// The part of [`KeplerianElements`] that only closed orbits have.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EllipticElements {
    /// The mean anomaly at epoch, in degrees.
    pub mean_anomaly: f64,
    /// The mean motion, in degrees per unit time.
    pub mean_motion: f64,
    /// The orbital period.
    pub period: f64,
}

impl OrbitalState {
    /// Gets a snapshot of the classical elements, with angles in degrees.
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use twobody_orbit::OrbitalState;
    ///
    /// let orbit = OrbitalState::from_cartesian(
    ///     1.0, 0.0, DVec3::X, DVec3::new(0.0, 0.0, 1.0),
    /// ).unwrap();
    ///
    /// let elements = orbit.elements();
    /// assert!((elements.inclination - 90.0).abs() < 1e-9);
    /// assert!(elements.elliptic.is_some());
    /// ```
    pub fn elements(&self) -> KeplerianElements {
        let elliptic = self
            .get_orbital_period()
            .zip(self.get_mean_anomaly_at_epoch())
            .zip(self.get_mean_motion())
            .map(|((period, mean_anomaly), mean_motion)| EllipticElements {
                mean_anomaly: mean_anomaly.to_degrees(),
                mean_motion: mean_motion.to_degrees(),
                period,
            });

        KeplerianElements {
            epoch: self.get_epoch(),
            semi_major_axis: self.get_semi_major_axis(),
            eccentricity: self.get_eccentricity(),
            inclination: self.get_inclination().to_degrees(),
            long_asc_node: self.get_long_asc_node().to_degrees(),
            arg_pe: self.get_arg_pe().to_degrees(),
            true_anomaly: self.get_true_anomaly_at_epoch().to_degrees(),
            periapsis_time: self.get_periapsis_time(),
            semi_latus_rectum: self.get_semi_latus_rectum(),
            periapsis_distance: self.get_periapsis(),
            elliptic,
        }
    }
}
