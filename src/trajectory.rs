use core::f64::consts::{PI, TAU};

use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::OrbitalState;

/// A sampled point along a trajectory.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryPoint {
    /// The position at this point.
    pub position: DVec3,
    /// The time at which the body passes through this point.
    pub time: f64,
}

impl OrbitalState {
    /// Gets the limit of the true anomaly for open orbits.
    ///
    /// Parabolas approach ±π; hyperbolas approach ±(π - acos(1/e)).
    /// Returns `None` for closed orbits.
    pub fn get_true_anomaly_limit(&self) -> Option<f64> {
        let e = self.get_eccentricity();

        if e < 1.0 {
            None
        } else if e == 1.0 {
            Some(PI)
        } else {
            Some(PI - e.recip().acos())
        }
    }

    /// Samples `count` points along the trajectory, for display.
    ///
    /// - Closed orbits: true anomalies `2πj / count` for `j` in `0..count`,
    ///   covering one revolution starting at periapsis.
    /// - Open orbits: true anomalies evenly spaced strictly between the
    ///   asymptote limits, endpoints excluded.
    ///
    /// Each point's time is the time of periapsis passage plus the time
    /// since periapsis at that true anomaly.
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use twobody_orbit::OrbitalState;
    ///
    /// let orbit = OrbitalState::from_cartesian(
    ///     1.0, 0.0, DVec3::X, DVec3::new(0.0, 1.2, 0.0),
    /// ).unwrap();
    ///
    /// let points = orbit.points(64);
    /// assert_eq!(points.len(), 64);
    /// assert!(points.windows(2).all(|w| w[0].time < w[1].time));
    /// ```
    pub fn points(&self, count: usize) -> Vec<TrajectoryPoint> {
        if count == 0 {
            return Vec::new();
        }

        let periapsis_time = self.get_periapsis_time();
        let point_at = |true_anomaly: f64| TrajectoryPoint {
            position: self.state_at_true_anomaly(true_anomaly).position,
            time: self.time_since_periapsis(true_anomaly) + periapsis_time,
        };

        match self.get_true_anomaly_limit() {
            None => {
                let step = TAU / count as f64;
                (0..count).map(|j| point_at(j as f64 * step)).collect()
            }
            Some(limit) => {
                let step = 2.0 * limit / (count + 1) as f64;
                (0..count)
                    .map(|j| point_at(-limit + (j + 1) as f64 * step))
                    .collect()
            }
        }
    }
}
