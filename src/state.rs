use core::f64::consts::{PI, TAU};

use glam::{DVec2, DVec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    error::{ensure_finite, ensure_finite_vec, ensure_mu},
    normalize_angle, solvers, DomainError, Matrix3x2, OrbitError, StateVectors,
};

/// Below this ratio, the node vector (relative to the angular momentum) or the
/// eccentricity is treated as zero and the orientation conventions kick in.
const DEGENERATE_EPS: f64 = 1e-11;

/// Classical (Keplerian) orbital elements, with angles in radians.
///
/// Used with [`OrbitalState::from_classical`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassicalElements {
    /// The semi-major axis.
    ///
    /// Positive for ellipses and negative for hyperbolas.
    /// For parabolic orbits (eccentricity exactly 1), the semi-major axis is
    /// infinite, so this field holds the periapsis distance instead.
    pub semi_major_axis: f64,

    /// The eccentricity.
    /// e < 1: ellipse
    /// e = 1: parabola
    /// e > 1: hyperbola
    pub eccentricity: f64,

    /// The inclination, in radians.
    pub inclination: f64,

    /// The longitude of ascending node, in radians.
    pub long_asc_node: f64,

    /// The argument of periapsis, in radians.
    pub arg_pe: f64,
}

/// Pins the body's position along its orbit at the epoch.
///
/// Exactly one anchor is required to go from classical elements to a state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EpochAnchor {
    /// The true anomaly at epoch, in radians.
    TrueAnomaly(f64),
    /// The time of periapsis passage.
    PeriapsisTime(f64),
    /// The mean anomaly at epoch, in radians.
    ///
    /// Only meaningful for elliptic orbits.
    MeanAnomaly(f64),
}

/// Mean anomaly, mean motion, and period; these only exist for closed orbits.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct PeriodicElements {
    pub mean_anomaly: f64,
    pub mean_motion: f64,
    pub period: f64,
}

/// An immutable two-body orbit.
///
/// The inputs (gravitational parameter, epoch, position, and velocity at epoch)
/// and every derived element are fixed when the state is built, either with
/// [`from_cartesian`][Self::from_cartesian] or
/// [`from_classical`][Self::from_classical]. The state never changes afterwards,
/// so it can be shared freely between threads.
///
/// # Example
/// ```
/// use glam::DVec3;
/// use twobody_orbit::OrbitalState;
///
/// let orbit = OrbitalState::from_cartesian(
///     1.0,
///     0.0,
///     DVec3::new(1.0, 0.0, 0.0),
///     DVec3::new(0.0, 1.2, 0.0),
/// ).unwrap();
///
/// assert!(orbit.get_eccentricity() > 0.0 && orbit.get_eccentricity() < 1.0);
/// assert!(orbit.get_orbital_period().is_some());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrbitalState {
    /// The gravitational parameter of the parent body.
    mu: f64,
    /// The epoch at which `position` and `velocity` hold.
    epoch: f64,
    position: DVec3,
    velocity: DVec3,

    eccentricity_vector: DVec3,
    angular_momentum: DVec3,
    semi_latus_rectum: f64,
    eccentricity: f64,
    /// Infinite for parabolic orbits, negative for hyperbolic ones.
    semi_major_axis: f64,
    /// Reciprocal of the semi-major axis; zero for parabolic orbits.
    alpha: f64,

    inclination: f64,
    long_asc_node: f64,
    arg_pe: f64,
    true_anomaly: f64,
    periapsis_time: f64,
    periodic: Option<PeriodicElements>,

    /// Unit vector towards periapsis.
    p_hat: DVec3,
    /// Unit vector 90° ahead of periapsis in the orbital plane.
    q_hat: DVec3,
}

/// Everything the orientation step needs, computed by either constructor.
struct Shape {
    eccentricity_vector: DVec3,
    angular_momentum: DVec3,
    semi_latus_rectum: f64,
    eccentricity: f64,
    semi_major_axis: f64,
    alpha: f64,
}

// Construction
impl OrbitalState {
    /// Builds an orbit from a Cartesian state.
    ///
    /// # Parameters
    /// - `mu`: The gravitational parameter of the parent body.
    /// - `epoch`: The time at which the state holds.
    /// - `position`: The position relative to the parent body.
    /// - `velocity`: The velocity relative to the parent body.
    ///
    /// # Degenerate orientations
    /// - Equatorial orbits have no ascending node. The longitude of ascending
    ///   node is then 0 and the node direction is taken to be +X.
    /// - Circular orbits have no periapsis. The argument of periapsis is then 0,
    ///   periapsis is placed at the node direction, and the true anomaly is
    ///   measured from there.
    ///
    /// # Errors
    /// - [`DomainError::GravitationalParameter`] if `mu` isn't finite and positive.
    /// - [`DomainError::NonFinite`] if any input isn't finite.
    /// - [`DomainError::ZeroPosition`] if the position is the origin.
    /// - [`DomainError::ZeroAngularMomentum`] if the trajectory is rectilinear.
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use twobody_orbit::OrbitalState;
    ///
    /// let orbit = OrbitalState::from_cartesian(
    ///     398600.4418,
    ///     0.0,
    ///     DVec3::new(7000.0, 0.0, 0.0),
    ///     DVec3::new(0.0, 7.5, 1.0),
    /// ).unwrap();
    ///
    /// assert!(orbit.get_inclination() > 0.0);
    /// ```
    pub fn from_cartesian(
        mu: f64,
        epoch: f64,
        position: DVec3,
        velocity: DVec3,
    ) -> Result<Self, OrbitError> {
        let mu = ensure_mu(mu)?;
        let epoch = ensure_finite(epoch, "epoch")?;
        let position = ensure_finite_vec(position, "position")?;
        let velocity = ensure_finite_vec(velocity, "velocity")?;

        let radius = position.length();
        if radius == 0.0 {
            return Err(DomainError::ZeroPosition.into());
        }

        let angular_momentum = position.cross(velocity);
        let h = angular_momentum.length();
        if h <= DEGENERATE_EPS * radius * velocity.length() {
            return Err(DomainError::ZeroAngularMomentum.into());
        }

        let speed_sq = velocity.length_squared();
        let eccentricity_vector =
            ((speed_sq - mu / radius) * position - position.dot(velocity) * velocity) / mu;

        let semi_latus_rectum = h * h / mu;
        let eccentricity = eccentricity_vector.length();
        let semi_major_axis = semi_latus_rectum / (1.0 - eccentricity * eccentricity);

        // Vis-viva; stays finite at e = 1
        let alpha = 2.0 / radius - speed_sq / mu;

        let shape = Shape {
            eccentricity_vector,
            angular_momentum,
            semi_latus_rectum,
            eccentricity,
            semi_major_axis,
            alpha,
        };

        Ok(Self::assemble(mu, epoch, position, velocity, shape))
    }

    /// Builds an orbit from classical elements and one epoch anchor.
    ///
    /// # Parameters
    /// - `mu`: The gravitational parameter of the parent body.
    /// - `elements`: The shape and orientation of the orbit.
    /// - `epoch`: The epoch of the resulting state.
    /// - `anchor`: Where the body is along the orbit at `epoch`.
    ///
    /// The eccentricity and semi-major axis are kept exactly as given, so an
    /// eccentricity of exactly 1 stays parabolic. The angles are re-derived
    /// from the resulting vectors and end up normalized to `[0, 2π)`.
    ///
    /// # Degenerate orientations
    /// The same conventions as [`from_cartesian`][Self::from_cartesian] apply
    /// to the re-derived angles. For a circular orbit the given argument of
    /// periapsis only places the body: periapsis moves to the node direction,
    /// so [`get_arg_pe`][Self::get_arg_pe] is 0 and, with an
    /// [`EpochAnchor::PeriapsisTime`] of `T`,
    /// [`get_periapsis_time`][Self::get_periapsis_time] reports the last node
    /// crossing, `T - arg_pe / n`, rather than `T`.
    ///
    /// # Errors
    /// - [`DomainError::GravitationalParameter`] if `mu` isn't finite and positive.
    /// - [`DomainError::NonFinite`] if any input isn't finite.
    /// - [`DomainError::InconsistentElements`] if the eccentricity is negative or
    ///   the sign of the semi-major axis doesn't match the eccentricity.
    /// - [`DomainError::InconsistentAnchor`] if a mean anomaly is given for an
    ///   open orbit, or a true anomaly lies beyond the asymptotes.
    ///
    /// # Example
    /// ```
    /// use twobody_orbit::{ClassicalElements, EpochAnchor, OrbitalState};
    ///
    /// let elements = ClassicalElements {
    ///     semi_major_axis: 2.0,
    ///     eccentricity: 0.5,
    ///     inclination: 0.3,
    ///     long_asc_node: 1.0,
    ///     arg_pe: 2.0,
    /// };
    ///
    /// let orbit = OrbitalState::from_classical(
    ///     1.0,
    ///     elements,
    ///     0.0,
    ///     EpochAnchor::MeanAnomaly(0.25),
    /// ).unwrap();
    ///
    /// assert!((orbit.get_semi_major_axis() - 2.0).abs() < 1e-12);
    /// assert!((orbit.get_mean_anomaly_at_epoch().unwrap() - 0.25).abs() < 1e-9);
    /// ```
    pub fn from_classical(
        mu: f64,
        elements: ClassicalElements,
        epoch: f64,
        anchor: EpochAnchor,
    ) -> Result<Self, OrbitError> {
        let mu = ensure_mu(mu)?;
        let epoch = ensure_finite(epoch, "epoch")?;
        let a = ensure_finite(elements.semi_major_axis, "semi-major axis")?;
        let e = ensure_finite(elements.eccentricity, "eccentricity")?;
        let inclination = ensure_finite(elements.inclination, "inclination")?;
        let long_asc_node = ensure_finite(elements.long_asc_node, "longitude of ascending node")?;
        let arg_pe = ensure_finite(elements.arg_pe, "argument of periapsis")?;

        if e < 0.0 {
            return Err(DomainError::InconsistentElements("eccentricity is negative").into());
        }

        let parabolic = e == 1.0;
        let (semi_latus_rectum, semi_major_axis, alpha) = if parabolic {
            (2.0 * a, f64::INFINITY, 0.0)
        } else {
            (a * (1.0 - e * e), a, a.recip())
        };

        if !(semi_latus_rectum.is_finite() && semi_latus_rectum > 0.0) {
            return Err(DomainError::InconsistentElements(
                "semi-major axis sign does not match the eccentricity",
            )
            .into());
        }

        let true_anomaly = match anchor {
            EpochAnchor::TrueAnomaly(true_anomaly) => {
                let true_anomaly = ensure_finite(true_anomaly, "true anomaly")?;
                if 1.0 + e * true_anomaly.cos() <= 0.0 {
                    return Err(DomainError::InconsistentAnchor(
                        "true anomaly lies beyond the asymptotes of the trajectory",
                    )
                    .into());
                }
                true_anomaly
            }
            EpochAnchor::PeriapsisTime(periapsis_time) => {
                let periapsis_time = ensure_finite(periapsis_time, "periapsis time")?;
                true_anomaly_after_periapsis(mu, e, semi_latus_rectum, a, epoch - periapsis_time)
            }
            EpochAnchor::MeanAnomaly(mean_anomaly) => {
                let mean_anomaly = ensure_finite(mean_anomaly, "mean anomaly")?;
                if e >= 1.0 {
                    return Err(DomainError::InconsistentAnchor(
                        "mean anomaly is only defined for elliptic orbits",
                    )
                    .into());
                }
                let mean_motion = (mu / (a * a * a)).sqrt();
                true_anomaly_after_periapsis(mu, e, semi_latus_rectum, a, mean_anomaly / mean_motion)
            }
        };

        let matrix = Matrix3x2::from_orientation(inclination, long_asc_node, arg_pe);
        let p_hat = matrix.dot_vec(DVec2::X);
        let q_hat = matrix.dot_vec(DVec2::Y);

        let StateVectors { position, velocity } =
            perifocal_state(mu, e, semi_latus_rectum, p_hat, q_hat, true_anomaly);

        let shape = Shape {
            eccentricity_vector: e * p_hat,
            angular_momentum: (mu * semi_latus_rectum).sqrt() * p_hat.cross(q_hat),
            semi_latus_rectum,
            eccentricity: e,
            semi_major_axis,
            alpha,
        };

        Ok(Self::assemble(mu, epoch, position, velocity, shape))
    }

    /// Derives orientation, anomaly, and timing from the shape and the state at epoch.
    fn assemble(mu: f64, epoch: f64, position: DVec3, velocity: DVec3, shape: Shape) -> Self {
        let h = shape.angular_momentum.length();
        let h_hat = shape.angular_momentum / h;

        // Step 3: Inclination
        let inclination = h_hat.z.clamp(-1.0, 1.0).acos();

        // Step 4: Longitude of ascending node, from n = (0, 0, 1) x h
        let node = DVec3::Z.cross(shape.angular_momentum);
        let node_len = node.length();
        let (node_hat, long_asc_node) = if node_len > DEGENERATE_EPS * h {
            (node / node_len, normalize_angle(node.y.atan2(node.x)))
        } else {
            (DVec3::X, 0.0)
        };
        let node_normal = h_hat.cross(node_hat);

        // Step 5: Argument of periapsis
        let (p_hat, arg_pe) = if shape.eccentricity > DEGENERATE_EPS {
            let ecc = shape.eccentricity_vector;
            (
                ecc / shape.eccentricity,
                normalize_angle(ecc.dot(node_normal).atan2(ecc.dot(node_hat))),
            )
        } else {
            (node_hat, 0.0)
        };
        let q_hat = h_hat.cross(p_hat);

        // Step 6: True anomaly at epoch
        let true_anomaly = normalize_angle(q_hat.dot(position).atan2(p_hat.dot(position)));

        let mut state = OrbitalState {
            mu,
            epoch,
            position,
            velocity,
            eccentricity_vector: shape.eccentricity_vector,
            angular_momentum: shape.angular_momentum,
            semi_latus_rectum: shape.semi_latus_rectum,
            eccentricity: shape.eccentricity,
            semi_major_axis: shape.semi_major_axis,
            alpha: shape.alpha,
            inclination,
            long_asc_node,
            arg_pe,
            true_anomaly,
            periapsis_time: epoch,
            periodic: None,
            p_hat,
            q_hat,
        };

        // Step 7: Periapsis passage, and mean motion for closed orbits
        let since_periapsis = state.time_since_periapsis(true_anomaly);
        state.periapsis_time = epoch - since_periapsis;

        if state.eccentricity < 1.0 {
            let a = state.semi_major_axis;
            let period = TAU * (a * a * a / mu).sqrt();
            state.periodic = Some(PeriodicElements {
                mean_anomaly: since_periapsis / period * TAU,
                mean_motion: TAU / period,
                period,
            });
        }

        state
    }
}

// Queries
impl OrbitalState {
    /// Gets the time elapsed since periapsis passage at a given true anomaly.
    ///
    /// - Elliptic orbits: in `[0, P)`, from Kepler's equation.
    /// - Parabolic orbits: from Barker's equation.
    /// - Hyperbolic orbits: from the hyperbolic Kepler equation; negative before
    ///   periapsis (true anomalies in `(π, 2π)` or negative).
    ///
    /// # Example
    /// ```
    /// use glam::DVec3;
    /// use twobody_orbit::OrbitalState;
    ///
    /// let orbit = OrbitalState::from_cartesian(
    ///     1.0, 0.0, DVec3::X, DVec3::new(0.0, 1.0, 0.0),
    /// ).unwrap();
    ///
    /// let half = orbit.time_since_periapsis(std::f64::consts::PI);
    /// assert!((half - std::f64::consts::PI).abs() < 1e-9);
    /// ```
    pub fn time_since_periapsis(&self, true_anomaly: f64) -> f64 {
        let e = self.eccentricity;
        let p = self.semi_latus_rectum;
        let mu = self.mu;
        let (sin_ta, cos_ta) = true_anomaly.sin_cos();

        if e < 1.0 {
            let a = self.semi_major_axis;
            let radius = p / (1.0 + e * cos_ta);
            let b_over_a = (1.0 - e * e).sqrt();
            let ecc_anom = normalize_angle(
                (radius * sin_ta / b_over_a).atan2(a * e + radius * cos_ta),
            );
            (a * a * a / mu).sqrt() * (ecc_anom - e * ecc_anom.sin())
        } else if e == 1.0 {
            let d = p.sqrt() * (true_anomaly * 0.5).tan();
            (p * d + d * d * d / 3.0) / (2.0 * mu.sqrt())
        } else {
            let a = self.semi_major_axis;
            let s = ((e + cos_ta) / (1.0 + e * cos_ta)).max(1.0);
            let mut ecc_anom = (s + (s * s - 1.0).sqrt()).ln();
            if !(0.0..=PI).contains(&true_anomaly) {
                ecc_anom = -ecc_anom;
            }
            (-(a * a * a) / mu).sqrt() * (e * ecc_anom.sinh() - ecc_anom)
        }
    }

    /// Gets the position and velocity at a given true anomaly, in radians.
    ///
    /// ```text
    /// r = p / (1 + e cos ν)
    /// position = r cos ν P̂ + r sin ν Q̂
    /// velocity = sqrt(mu / p) (-sin ν P̂ + (e + cos ν) Q̂)
    /// ```
    ///
    /// For open orbits, true anomalies beyond the asymptotes give
    /// non-physical (negative-radius) results.
    pub fn state_at_true_anomaly(&self, true_anomaly: f64) -> StateVectors {
        perifocal_state(
            self.mu,
            self.eccentricity,
            self.semi_latus_rectum,
            self.p_hat,
            self.q_hat,
            true_anomaly,
        )
    }

    /// Gets the gravitational parameter of the parent body.
    #[inline]
    pub fn get_gravitational_parameter(&self) -> f64 {
        self.mu
    }

    /// Gets the epoch of the state.
    #[inline]
    pub fn get_epoch(&self) -> f64 {
        self.epoch
    }

    /// Gets the position at epoch.
    #[inline]
    pub fn get_position_at_epoch(&self) -> DVec3 {
        self.position
    }

    /// Gets the velocity at epoch.
    #[inline]
    pub fn get_velocity_at_epoch(&self) -> DVec3 {
        self.velocity
    }

    /// Gets the eccentricity vector, which points towards periapsis.
    #[inline]
    pub fn get_eccentricity_vector(&self) -> DVec3 {
        self.eccentricity_vector
    }

    /// Gets the specific angular momentum vector `r × v`.
    #[inline]
    pub fn get_angular_momentum(&self) -> DVec3 {
        self.angular_momentum
    }

    /// Gets the semi-latus rectum `|h|^2 / mu`.
    #[inline]
    pub fn get_semi_latus_rectum(&self) -> f64 {
        self.semi_latus_rectum
    }

    /// Gets the eccentricity of the orbit.
    /// e < 1: ellipse
    /// e = 1: parabola
    /// e > 1: hyperbola
    #[inline]
    pub fn get_eccentricity(&self) -> f64 {
        self.eccentricity
    }

    /// Gets the semi-major axis.
    ///
    /// This function returns infinity for parabolic orbits,
    /// and negative values for hyperbolic orbits.
    #[inline]
    pub fn get_semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Gets the periapsis distance `p / (1 + e)`.
    #[inline]
    pub fn get_periapsis(&self) -> f64 {
        self.semi_latus_rectum / (1.0 + self.eccentricity)
    }

    /// Gets the inclination, in radians, in `[0, π]`.
    #[inline]
    pub fn get_inclination(&self) -> f64 {
        self.inclination
    }

    /// Gets the longitude of ascending node, in radians, in `[0, 2π)`.
    #[inline]
    pub fn get_long_asc_node(&self) -> f64 {
        self.long_asc_node
    }

    /// Gets the argument of periapsis, in radians, in `[0, 2π)`.
    #[inline]
    pub fn get_arg_pe(&self) -> f64 {
        self.arg_pe
    }

    /// Gets the true anomaly at epoch, in radians, in `[0, 2π)`.
    #[inline]
    pub fn get_true_anomaly_at_epoch(&self) -> f64 {
        self.true_anomaly
    }

    /// Gets the time of periapsis passage.
    ///
    /// For elliptic orbits, this is the most recent passage at or before the epoch.
    #[inline]
    pub fn get_periapsis_time(&self) -> f64 {
        self.periapsis_time
    }

    /// Gets the mean anomaly at epoch, in radians. `None` for open orbits.
    #[inline]
    pub fn get_mean_anomaly_at_epoch(&self) -> Option<f64> {
        self.periodic.map(|p| p.mean_anomaly)
    }

    /// Gets the mean motion, in radians per unit time. `None` for open orbits.
    #[inline]
    pub fn get_mean_motion(&self) -> Option<f64> {
        self.periodic.map(|p| p.mean_motion)
    }

    /// Gets the orbital period. `None` for open orbits.
    #[inline]
    pub fn get_orbital_period(&self) -> Option<f64> {
        self.periodic.map(|p| p.period)
    }

    /// Gets the perifocal basis `(P̂, Q̂)`.
    #[inline]
    pub fn get_perifocal_basis(&self) -> (DVec3, DVec3) {
        (self.p_hat, self.q_hat)
    }

    #[inline]
    pub(crate) fn get_alpha(&self) -> f64 {
        self.alpha
    }
}

fn perifocal_state(
    mu: f64,
    eccentricity: f64,
    semi_latus_rectum: f64,
    p_hat: DVec3,
    q_hat: DVec3,
    true_anomaly: f64,
) -> StateVectors {
    let (sin_ta, cos_ta) = true_anomaly.sin_cos();
    let radius = semi_latus_rectum / (1.0 + eccentricity * cos_ta);
    let speed_scale = (mu / semi_latus_rectum).sqrt();

    StateVectors {
        position: radius * cos_ta * p_hat + radius * sin_ta * q_hat,
        velocity: speed_scale * (-sin_ta * p_hat + (eccentricity + cos_ta) * q_hat),
    }
}

/// Solves the regime's Kepler equation for the true anomaly reached
/// `dt` after periapsis passage.
fn true_anomaly_after_periapsis(
    mu: f64,
    eccentricity: f64,
    semi_latus_rectum: f64,
    semi_major_axis: f64,
    dt: f64,
) -> f64 {
    let e = eccentricity;

    if e < 1.0 {
        let a = semi_major_axis;
        let mean_anomaly = dt * (mu / (a * a * a)).sqrt();
        let ecc_anom = solvers::get_elliptic_eccentric_anomaly(e, mean_anomaly);
        let (sin_half, cos_half) = (ecc_anom * 0.5).sin_cos();
        2.0 * ((1.0 + e).sqrt() * sin_half).atan2((1.0 - e).sqrt() * cos_half)
    } else if e == 1.0 {
        let d = solvers::solve_barker(semi_latus_rectum, mu.sqrt() * dt);
        2.0 * (d / semi_latus_rectum.sqrt()).atan()
    } else {
        let a = semi_major_axis;
        let mean_anomaly = dt * (mu / -(a * a * a)).sqrt();
        let ecc_anom = solvers::get_hyperbolic_eccentric_anomaly(e, mean_anomaly);
        2.0 * (((e + 1.0) / (e - 1.0)).sqrt() * (ecc_anom * 0.5).tanh()).atan()
    }
}
