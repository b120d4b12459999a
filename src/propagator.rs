use log::{debug, trace};

use crate::{
    error::ensure_finite,
    solvers::{self, RootStage},
    stumpff, ConvergenceError, OrbitError, OrbitalState, SolverSettings, StateVectors,
};

/// The universal Kepler equation for one propagation interval, with
/// everything that doesn't depend on the universal anomaly precomputed.
struct UniversalKepler {
    sqrt_mu: f64,
    /// |r0|
    radius: f64,
    /// (r0 · v0) / sqrt(mu)
    radial: f64,
    alpha: f64,
    dt: f64,
}

impl UniversalKepler {
    /// The time-of-flight residual at universal anomaly `x`.
    fn residual(&self, x: f64) -> f64 {
        let x_sq = x * x;
        let (c, s) = stumpff::c_and_s(self.alpha * x_sq);

        (self.radial * x_sq * c + (1.0 - self.radius * self.alpha) * x_sq * x * s + self.radius * x)
            / self.sqrt_mu
            - self.dt
    }

    /// The residual and its derivative with respect to `x`.
    fn residual_and_slope(&self, x: f64) -> (f64, f64) {
        let x_sq = x * x;
        let z = self.alpha * x_sq;
        let (c, s) = stumpff::c_and_s(z);

        let value = (self.radial * x_sq * c
            + (1.0 - self.radius * self.alpha) * x_sq * x * s
            + self.radius * x)
            / self.sqrt_mu
            - self.dt;
        let slope = (x_sq * c + self.radial * x * (1.0 - z * s) + self.radius * (1.0 - z * c))
            / self.sqrt_mu;

        (value, slope)
    }

    /// Pulls `x` towards zero until the residual there is finite.
    ///
    /// On open orbits the Newton seed can sit so far out that the Stumpff
    /// functions overflow. The residual at zero is exactly `-dt`.
    fn finite_start(&self, mut x: f64) -> f64 {
        for _ in 0..solvers::BACKOFF_STEPS {
            if self.residual(x).is_finite() {
                return x;
            }
            x *= 0.5;
        }

        0.0
    }

    /// Runs Newton, then falls back to probing for a bracket and bisecting.
    fn solve(&self, settings: &SolverSettings) -> Result<f64, ConvergenceError> {
        let x0 = self.sqrt_mu * self.dt * self.alpha;

        let stage = solvers::newton(
            |x| self.residual_and_slope(x),
            x0,
            settings.newton_max_iters,
            settings.newton_abs_tolerance,
            settings.newton_rel_tolerance,
        );

        if let RootStage::Converged(x) = stage {
            return Ok(x);
        }

        debug!(
            "newton failed on the universal Kepler equation (dt = {}, x0 = {x0}); bracketing",
            self.dt
        );

        let start = self.finite_start(x0);
        if start != x0 {
            trace!("residual overflows at x0 = {x0}; probing from {start}");
        }

        let bracket = solvers::probe_bracket(|x| self.residual(x), start, settings.probe_steps)
            .ok_or(ConvergenceError::NoSignChange {
                steps: settings.probe_steps,
            })?;

        trace!(
            "universal anomaly bracketed in [{}, {}]",
            bracket.lower,
            bracket.upper
        );

        match solvers::bisect(
            |x| self.residual(x),
            bracket,
            settings.bisection_max_iters,
            settings.bisection_abs_tolerance,
            settings.bisection_rel_tolerance,
        ) {
            RootStage::Converged(x) => Ok(x),
            _ => Err(ConvergenceError::BisectionExhausted {
                iterations: settings.bisection_max_iters,
            }),
        }
    }
}

impl OrbitalState {
    /// Gets the position and velocity at a given time.
    ///
    /// Solves the universal-variable form of Kepler's equation, so the same
    /// code path handles elliptic, parabolic, and hyperbolic orbits, for times
    /// before or after the epoch.
    ///
    /// Uses the [default solver settings][SolverSettings::default].
    ///
    /// # Errors
    /// - [`DomainError::NonFinite`][crate::DomainError::NonFinite] if `time` isn't finite.
    /// - [`ConvergenceError`] if the root search gives up.
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
    /// // A quarter of a circular orbit
    /// let sv = orbit.posvelatt(std::f64::consts::FRAC_PI_2).unwrap();
    /// assert!((sv.position - DVec3::Y).length() < 1e-9);
    /// ```
    pub fn posvelatt(&self, time: f64) -> Result<StateVectors, OrbitError> {
        self.posvelatt_with(time, &SolverSettings::default())
    }

    /// Gets the position and velocity at a given time, with custom solver
    /// iteration ceilings and tolerances.
    ///
    /// See [`posvelatt`][Self::posvelatt].
    pub fn posvelatt_with(
        &self,
        time: f64,
        settings: &SolverSettings,
    ) -> Result<StateVectors, OrbitError> {
        let time = ensure_finite(time, "time")?;

        let position = self.get_position_at_epoch();
        let velocity = self.get_velocity_at_epoch();
        let dt = time - self.get_epoch();

        if dt == 0.0 {
            return Ok(StateVectors { position, velocity });
        }

        let mu = self.get_gravitational_parameter();
        let sqrt_mu = mu.sqrt();
        let radius = position.length();
        let alpha = self.get_alpha();

        let equation = UniversalKepler {
            sqrt_mu,
            radius,
            radial: position.dot(velocity) / sqrt_mu,
            alpha,
            dt,
        };

        let x = equation.solve(settings)?;

        let x_sq = x * x;
        let z = alpha * x_sq;
        let (c, s) = stumpff::c_and_s(z);

        // Lagrange coefficients
        let f = 1.0 - x_sq * c / radius;
        let g = dt - x_sq * x * s / sqrt_mu;

        let new_position = f * position + g * velocity;
        let new_radius = new_position.length();

        let f_dot = sqrt_mu / (radius * new_radius) * x * (z * s - 1.0);
        let g_dot = 1.0 - x_sq * c / new_radius;

        Ok(StateVectors {
            position: new_position,
            velocity: f_dot * position + g_dot * velocity,
        })
    }
}
