#![cfg(test)]

use core::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec3;

use crate::{
    central_bodies::{EARTH_MU, SUN_MU},
    solve_lambert, ClassicalElements, ConvergenceError, Direction,
    DomainError, EpochAnchor, OrbitError, OrbitalState, SolverSettings, StateError,
    TwoBodyOrbit,
};

const RANDOM_ORBITS: usize = 256;


use assertions::*;
use seeders::*;

fn unit_orbit() -> OrbitalState {
    OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::Y).unwrap()
}

fn dvec3_to_bits(v: DVec3) -> (u64, u64, u64) {
    (v.x.to_bits(), v.y.to_bits(), v.z.to_bits())
}

mod conversion {
    use super::*;

    #[test]
    fn unit_orbit_elements() {
        let orbit = unit_orbit();

        assert_almost_eq(orbit.get_eccentricity(), 0.0, "eccentricity");
        assert_almost_eq(orbit.get_semi_major_axis(), 1.0, "semi-major axis");
        assert_almost_eq(orbit.get_inclination(), 0.0, "inclination");
        assert_eq!(orbit.get_long_asc_node(), 0.0);
        assert_eq!(orbit.get_arg_pe(), 0.0);
        assert_almost_eq(orbit.get_true_anomaly_at_epoch(), 0.0, "true anomaly");
        assert_almost_eq(orbit.get_orbital_period().unwrap(), TAU, "period");
        assert_almost_eq(orbit.get_mean_motion().unwrap(), 1.0, "mean motion");
        assert_almost_eq(orbit.get_periapsis_time(), 0.0, "periapsis time");
    }

    #[test]
    fn eccentric_equatorial() {
        // Faster than circular, so this point is periapsis
        let orbit =
            OrbitalState::from_cartesian(1.0, 10.0, DVec3::Y, DVec3::new(-1.2, 0.0, 0.0)).unwrap();

        assert_almost_eq(orbit.get_eccentricity(), 0.44, "eccentricity");
        assert_almost_eq(orbit.get_semi_latus_rectum(), 1.44, "semi-latus rectum");
        assert_almost_eq(orbit.get_periapsis(), 1.0, "periapsis");
        assert_eq!(orbit.get_long_asc_node(), 0.0);
        assert_almost_eq(orbit.get_arg_pe(), FRAC_PI_2, "argument of periapsis");
        assert_almost_eq_angle(orbit.get_true_anomaly_at_epoch(), 0.0, "true anomaly");
        assert_almost_eq(orbit.get_periapsis_time(), 10.0, "periapsis time");
    }

    #[test]
    fn circular_inclined_measures_from_node() {
        let inclination: f64 = 0.7;
        let (sin_i, cos_i) = inclination.sin_cos();

        // A quarter of the way around from the ascending node at +X
        let orbit = OrbitalState::from_cartesian(
            1.0,
            0.0,
            DVec3::new(0.0, cos_i, sin_i),
            DVec3::new(-1.0, 0.0, 0.0),
        )
        .unwrap();

        assert_almost_eq(orbit.get_inclination(), inclination, "inclination");
        assert_almost_eq_angle(orbit.get_long_asc_node(), 0.0, "longitude of ascending node");
        assert_eq!(orbit.get_arg_pe(), 0.0);
        assert_almost_eq(orbit.get_true_anomaly_at_epoch(), FRAC_PI_2, "true anomaly");

        let (p_hat, _) = orbit.get_perifocal_basis();
        assert_almost_eq_vec3(p_hat, DVec3::X, 1.0, "periapsis direction");
    }

    #[test]
    fn circular_equatorial_measures_from_x() {
        let orbit = OrbitalState::from_cartesian(1.0, 0.0, DVec3::Y, -DVec3::X).unwrap();

        assert_eq!(orbit.get_long_asc_node(), 0.0);
        assert_eq!(orbit.get_arg_pe(), 0.0);
        assert_almost_eq(orbit.get_true_anomaly_at_epoch(), FRAC_PI_2, "true longitude");
        assert_eq!(orbit.get_perifocal_basis().0, DVec3::X);
    }

    #[test]
    fn retrograde_equatorial() {
        let orbit = OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, -DVec3::Y).unwrap();

        assert_almost_eq(orbit.get_inclination(), PI, "inclination");
        assert_eq!(orbit.get_long_asc_node(), 0.0);
    }

    #[test]
    fn angles_are_normalized() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();

            for (angle, what) in [
                (orbit.get_long_asc_node(), "longitude of ascending node"),
                (orbit.get_arg_pe(), "argument of periapsis"),
                (orbit.get_true_anomaly_at_epoch(), "true anomaly"),
            ] {
                assert!((0.0..TAU).contains(&angle), "{what} = {angle} out of range");
            }

            assert!((0.0..=PI).contains(&orbit.get_inclination()));
        }
    }

    #[test]
    fn rejects_bad_input() {
        let v = DVec3::Y;

        assert_eq!(
            OrbitalState::from_cartesian(0.0, 0.0, DVec3::X, v),
            Err(OrbitError::Domain(DomainError::GravitationalParameter(0.0)))
        );
        assert_eq!(
            OrbitalState::from_cartesian(1.0, 0.0, DVec3::ZERO, v),
            Err(OrbitError::Domain(DomainError::ZeroPosition))
        );
        assert_eq!(
            OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::X * 2.0),
            Err(OrbitError::Domain(DomainError::ZeroAngularMomentum))
        );
        assert_eq!(
            OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::ZERO),
            Err(OrbitError::Domain(DomainError::ZeroAngularMomentum))
        );
        assert!(matches!(
            OrbitalState::from_cartesian(1.0, f64::INFINITY, DVec3::X, v),
            Err(OrbitError::Domain(DomainError::NonFinite(_)))
        ));
        assert!(matches!(
            OrbitalState::from_cartesian(1.0, 0.0, DVec3::new(f64::NAN, 0.0, 0.0), v),
            Err(OrbitError::Domain(DomainError::NonFinite(_)))
        ));
    }

    #[test]
    fn regime_consistency() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();
            let e = orbit.get_eccentricity();
            let elements = orbit.elements();

            assert_eq!(e < 1.0, orbit.get_orbital_period().is_some());
            assert_eq!(e < 1.0, elements.elliptic.is_some());
            assert_eq!(e < 1.0, orbit.get_true_anomaly_limit().is_none());

            if e < 1.0 {
                assert!(orbit.get_semi_major_axis() > 0.0);
            } else if e == 1.0 {
                assert!(orbit.get_semi_major_axis().is_infinite());
            } else {
                assert!(orbit.get_semi_major_axis() < 0.0);
            }

            assert!(elements.semi_latus_rectum.is_finite());
            assert!(elements.periapsis_distance.is_finite());
        }
    }

    #[test]
    fn escape_speed_boundary() {
        let escape = 2f64.sqrt();

        let bound = OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::Y * escape * 0.99)
            .unwrap();
        let unbound = OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::Y * escape * 1.01)
            .unwrap();

        assert!(bound.get_eccentricity() < 1.0);
        assert!(unbound.get_eccentricity() > 1.0);
        assert!(bound.elements().elliptic.is_some());
        assert!(unbound.elements().elliptic.is_none());
    }

    #[test]
    fn elements_are_in_degrees() {
        let orbit = OrbitalState::from_cartesian(
            1.0,
            0.0,
            DVec3::X,
            DVec3::new(0.0, 0.0, 1.1),
        )
        .unwrap();
        let elements = orbit.elements();

        assert_almost_eq(elements.inclination, 90.0, "inclination");
        assert_almost_eq(
            elements.true_anomaly,
            orbit.get_true_anomaly_at_epoch().to_degrees(),
            "true anomaly",
        );

        let elliptic = elements.elliptic.unwrap();
        assert_almost_eq(
            elliptic.mean_motion,
            orbit.get_mean_motion().unwrap().to_degrees(),
            "mean motion",
        );
        assert_almost_eq(elliptic.mean_motion * elliptic.period, 360.0, "degrees per period");
    }
}

mod classical {
    use super::*;

    fn elements(semi_major_axis: f64, eccentricity: f64) -> ClassicalElements {
        ClassicalElements {
            semi_major_axis,
            eccentricity,
            inclination: 0.4,
            long_asc_node: 5.0,
            arg_pe: 2.5,
        }
    }

    #[test]
    fn keeps_given_elements() {
        let orbit = OrbitalState::from_classical(
            2.0,
            elements(3.0, 0.3),
            0.0,
            EpochAnchor::TrueAnomaly(1.0),
        )
        .unwrap();

        assert_eq!(orbit.get_semi_major_axis(), 3.0);
        assert_eq!(orbit.get_eccentricity(), 0.3);
        assert_almost_eq(orbit.get_inclination(), 0.4, "inclination");
        assert_almost_eq(orbit.get_long_asc_node(), 5.0, "longitude of ascending node");
        assert_almost_eq(orbit.get_arg_pe(), 2.5, "argument of periapsis");
        assert_almost_eq(orbit.get_true_anomaly_at_epoch(), 1.0, "true anomaly");
    }

    #[test]
    fn round_trip_through_cartesian() {
        for _ in 0..RANDOM_ORBITS {
            let expected = random_any();
            let actual = OrbitalState::from_cartesian(
                expected.get_gravitational_parameter(),
                expected.get_epoch(),
                expected.get_position_at_epoch(),
                expected.get_velocity_at_epoch(),
            )
            .unwrap();

            assert_same_orbit(&actual, &expected, "cartesian round trip");

            // Timing near e = 1 is ill-conditioned once the exact parabola is lost
            if expected.get_eccentricity() == 1.0 {
                continue;
            }
            assert_almost_eq_rel(
                actual.get_periapsis_time(),
                expected.get_periapsis_time(),
                time_scale(&expected),
                "periapsis time",
            );
        }
    }

    #[test]
    fn mean_anomaly_anchor() {
        let mu = 3.0;
        let epoch = 7.0;

        for mean_anomaly in [0.01, 0.3, 2.0, PI, 4.5, 6.2] {
            let orbit = OrbitalState::from_classical(
                mu,
                elements(2.0, 0.6),
                epoch,
                EpochAnchor::MeanAnomaly(mean_anomaly),
            )
            .unwrap();

            assert_almost_eq_angle(
                orbit.get_mean_anomaly_at_epoch().unwrap(),
                mean_anomaly,
                "mean anomaly",
            );
            assert_almost_eq(
                orbit.get_periapsis_time(),
                epoch - mean_anomaly / orbit.get_mean_motion().unwrap(),
                "periapsis time",
            );
        }
    }

    #[test]
    fn periapsis_time_anchor() {
        let mu = 1.5;
        let epoch = 20.0;

        // Elliptic: the most recent passage
        let ellipse = OrbitalState::from_classical(
            mu,
            elements(1.5, 0.8),
            epoch,
            EpochAnchor::PeriapsisTime(18.0),
        )
        .unwrap();
        assert_almost_eq(ellipse.get_periapsis_time(), 18.0, "elliptic periapsis time");

        let period = ellipse.get_orbital_period().unwrap();
        let earlier = OrbitalState::from_classical(
            mu,
            elements(1.5, 0.8),
            epoch,
            EpochAnchor::PeriapsisTime(18.0 - 3.0 * period),
        )
        .unwrap();
        assert_almost_eq(earlier.get_periapsis_time(), 18.0, "wrapped periapsis time");

        for (name, orbital_elements) in [
            ("parabolic", elements(0.5, 1.0)),
            ("hyperbolic", elements(-2.0, 1.7)),
        ] {
            for periapsis_time in [epoch - 3.0, epoch - 0.5, epoch + 4.0] {
                let orbit = OrbitalState::from_classical(
                    mu,
                    orbital_elements,
                    epoch,
                    EpochAnchor::PeriapsisTime(periapsis_time),
                )
                .unwrap();

                assert_almost_eq(
                    orbit.get_periapsis_time(),
                    periapsis_time,
                    &format!("{name} periapsis time"),
                );
                assert_eq!(
                    orbit.get_true_anomaly_at_epoch() > PI,
                    periapsis_time > epoch,
                    "{name} orbit should be inbound iff periapsis is ahead"
                );
            }
        }
    }

    #[test]
    fn circular_periapsis_time_moves_to_node() {
        let given = ClassicalElements {
            semi_major_axis: 1.0,
            eccentricity: 0.0,
            inclination: 0.5,
            long_asc_node: 0.3,
            arg_pe: 1.0,
        };

        // n = 1, so the body is 1.5 rad past the node at the epoch
        let orbit =
            OrbitalState::from_classical(1.0, given, 0.5, EpochAnchor::PeriapsisTime(0.0)).unwrap();

        assert_eq!(orbit.get_arg_pe(), 0.0);
        assert_almost_eq(orbit.get_true_anomaly_at_epoch(), 1.5, "argument of latitude");
        assert_almost_eq(orbit.get_periapsis_time(), -1.0, "node crossing time");

        let from_node = OrbitalState::from_classical(
            1.0,
            ClassicalElements { arg_pe: 0.0, ..given },
            0.5,
            EpochAnchor::TrueAnomaly(1.5),
        )
        .unwrap();
        assert_almost_eq_vec3(
            orbit.get_position_at_epoch(),
            from_node.get_position_at_epoch(),
            1.0,
            "position at epoch",
        );
    }

    #[test]
    fn anchors_agree() {
        let mu = 4.0;
        let base = elements(5.0, 0.4);

        let by_true = OrbitalState::from_classical(mu, base, 0.0, EpochAnchor::TrueAnomaly(2.0))
            .unwrap();
        let by_time = OrbitalState::from_classical(
            mu,
            base,
            0.0,
            EpochAnchor::PeriapsisTime(by_true.get_periapsis_time()),
        )
        .unwrap();
        let by_mean = OrbitalState::from_classical(
            mu,
            base,
            0.0,
            EpochAnchor::MeanAnomaly(by_true.get_mean_anomaly_at_epoch().unwrap()),
        )
        .unwrap();

        for other in [&by_time, &by_mean] {
            assert_almost_eq_vec3(
                other.get_position_at_epoch(),
                by_true.get_position_at_epoch(),
                5.0,
                "position",
            );
            assert_almost_eq_vec3(
                other.get_velocity_at_epoch(),
                by_true.get_velocity_at_epoch(),
                1.0,
                "velocity",
            );
        }
    }

    #[test]
    fn exact_parabola_stays_parabolic() {
        let orbit = OrbitalState::from_classical(
            2.0,
            elements(0.75, 1.0),
            0.0,
            EpochAnchor::TrueAnomaly(0.5),
        )
        .unwrap();

        assert_eq!(orbit.get_eccentricity(), 1.0);
        assert_eq!(orbit.get_semi_latus_rectum(), 1.5);
        assert_eq!(orbit.get_periapsis(), 0.75);
        assert!(orbit.get_semi_major_axis().is_infinite());
        assert!(orbit.elements().elliptic.is_none());

        let sv = orbit.state_at_true_anomaly(0.5);
        assert_almost_eq(sv.specific_energy(2.0), 0.0, "parabolic energy");
    }

    #[test]
    fn rejects_inconsistent_elements() {
        let inconsistent = |a, e| {
            matches!(
                OrbitalState::from_classical(1.0, elements(a, e), 0.0, EpochAnchor::TrueAnomaly(0.0)),
                Err(OrbitError::Domain(DomainError::InconsistentElements(_)))
            )
        };

        assert!(inconsistent(1.0, -0.1));
        assert!(inconsistent(-1.0, 0.5));
        assert!(inconsistent(1.0, 1.5));
        assert!(inconsistent(0.0, 1.0));
        assert!(inconsistent(0.0, 0.5));
    }

    #[test]
    fn rejects_inconsistent_anchor() {
        let inconsistent = |a, e, anchor| {
            matches!(
                OrbitalState::from_classical(1.0, elements(a, e), 0.0, anchor),
                Err(OrbitError::Domain(DomainError::InconsistentAnchor(_)))
            )
        };

        assert!(inconsistent(-1.0, 2.0, EpochAnchor::MeanAnomaly(0.1)));
        assert!(inconsistent(1.0, 1.0, EpochAnchor::MeanAnomaly(0.1)));
        assert!(inconsistent(1.0, 1.0, EpochAnchor::TrueAnomaly(PI)));

        // Asymptotes of an e = 2 hyperbola are at ±2π/3
        assert!(inconsistent(-1.0, 2.0, EpochAnchor::TrueAnomaly(2.2)));
        assert!(!inconsistent(-1.0, 2.0, EpochAnchor::TrueAnomaly(2.0)));
        assert!(!inconsistent(1.0, 0.5, EpochAnchor::MeanAnomaly(0.1)));
    }
}

mod timing {
    use super::*;

    #[test]
    fn circular_time_since_periapsis() {
        let orbit = unit_orbit();

        assert_eq!(orbit.time_since_periapsis(0.0), 0.0);
        assert_almost_eq(orbit.time_since_periapsis(FRAC_PI_2), FRAC_PI_2, "quarter");
        assert_almost_eq(orbit.time_since_periapsis(PI), PI, "half");
        assert_almost_eq(orbit.time_since_periapsis(1.5 * PI), 1.5 * PI, "three quarters");
    }

    #[test]
    fn parabolic_time_since_periapsis() {
        let orbit = OrbitalState::from_classical(
            1.0,
            ClassicalElements {
                semi_major_axis: 1.0,
                eccentricity: 1.0,
                inclination: 0.0,
                long_asc_node: 0.0,
                arg_pe: 0.0,
            },
            0.0,
            EpochAnchor::TrueAnomaly(0.0),
        )
        .unwrap();

        // p = 2, D = sqrt(2): (2 sqrt(2) + 2 sqrt(2) / 3) / 2
        let expected = 4.0 * 2f64.sqrt() / 3.0;
        assert_almost_eq(orbit.time_since_periapsis(FRAC_PI_2), expected, "quarter");
        assert_almost_eq(orbit.time_since_periapsis(-FRAC_PI_2), -expected, "before periapsis");
    }

    #[test]
    fn hyperbolic_time_is_antisymmetric() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_hyperbolic();
            let limit = orbit.get_true_anomaly_limit().unwrap();
            let scale = time_scale(&orbit);

            for fraction in [0.1, 0.5, 0.9] {
                let true_anomaly = fraction * limit;
                let after = orbit.time_since_periapsis(true_anomaly);
                let before = orbit.time_since_periapsis(TAU - true_anomaly);

                assert!(after > 0.0);
                assert_almost_eq_rel(before, -after, scale, "time before periapsis");
            }
        }
    }

    #[test]
    fn elliptic_time_is_in_one_period() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_elliptic();
            let period = orbit.get_orbital_period().unwrap();

            for true_anomaly in [0.0, 1.0, 3.0, 5.0, 6.28] {
                let t = orbit.time_since_periapsis(true_anomaly);
                assert!((0.0..period).contains(&t), "{t} not in [0, {period})");
            }
        }
    }
}

mod propagation {
    use super::*;

    #[test]
    fn zero_time_identity() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();
            let sv = orbit.posvelatt(orbit.get_epoch()).unwrap();

            assert_eq!(
                dvec3_to_bits(sv.position),
                dvec3_to_bits(orbit.get_position_at_epoch())
            );
            assert_eq!(
                dvec3_to_bits(sv.velocity),
                dvec3_to_bits(orbit.get_velocity_at_epoch())
            );
        }
    }

    #[test]
    fn unit_orbit_positions() {
        let orbit = unit_orbit();

        let tests = [
            (0.5 * PI, DVec3::new(0.0, 1.0, 0.0)),
            (1.0 * PI, DVec3::new(-1.0, 0.0, 0.0)),
            (1.5 * PI, DVec3::new(0.0, -1.0, 0.0)),
            (-0.5 * PI, DVec3::new(0.0, -1.0, 0.0)),
            (2.0 * PI, DVec3::new(1.0, 0.0, 0.0)),
        ];

        for (time, expected) in tests {
            let sv = orbit.posvelatt(time).unwrap();
            assert_almost_eq_vec3(sv.position, expected, 1.0, &format!("position at t = {time}"));
            assert_almost_eq(sv.velocity.length(), 1.0, "circular speed");
        }
    }

    #[test]
    fn periodicity() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = if rand::random_bool(0.5) {
                random_elliptic()
            } else {
                random_circular()
            };
            let period = orbit.get_orbital_period().unwrap();
            let r0 = orbit.get_position_at_epoch();
            let v0 = orbit.get_velocity_at_epoch();

            for revolutions in [1.0, -1.0, 3.0] {
                let sv = orbit
                    .posvelatt(orbit.get_epoch() + revolutions * period)
                    .unwrap();

                assert_almost_eq_vec3(sv.position, r0, r0.length(), "position after revolutions");
                assert_almost_eq_vec3(sv.velocity, v0, v0.length(), "velocity after revolutions");
            }
        }
    }

    #[test]
    fn conserves_energy_and_momentum() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();
            let mu = orbit.get_gravitational_parameter();
            let scale = time_scale(&orbit);
            let r0 = orbit.get_position_at_epoch();
            let v0 = orbit.get_velocity_at_epoch();

            let energy = 0.5 * v0.length_squared() - mu / r0.length();
            let energy_scale = mu / orbit.get_periapsis();
            let momentum = orbit.get_angular_momentum();

            for fraction in [-2.3, -0.4, 0.05, 0.7, 4.2] {
                let sv = orbit.posvelatt(orbit.get_epoch() + fraction * scale).unwrap();

                assert_almost_eq_rel(
                    sv.specific_energy(mu),
                    energy,
                    energy_scale,
                    "specific energy",
                );
                assert_almost_eq_vec3(
                    sv.position.cross(sv.velocity),
                    momentum,
                    momentum.length(),
                    "angular momentum",
                );
            }
        }
    }

    fn assert_conserved(orbit: &OrbitalState, time: f64) {
        let mu = orbit.get_gravitational_parameter();
        let r0 = orbit.get_position_at_epoch();
        let v0 = orbit.get_velocity_at_epoch();
        let energy = 0.5 * v0.length_squared() - mu / r0.length();
        let momentum = orbit.get_angular_momentum();

        let sv = orbit
            .posvelatt(time)
            .unwrap_or_else(|err| panic!("propagating to t = {time} failed: {err}"));

        assert_almost_eq_rel(
            sv.specific_energy(mu),
            energy,
            mu / orbit.get_periapsis(),
            &format!("specific energy at t = {time}"),
        );
        assert_almost_eq_vec3(
            sv.position.cross(sv.velocity),
            momentum,
            momentum.length(),
            &format!("angular momentum at t = {time}"),
        );
    }

    #[test]
    fn earth_departure_hyperbola() {
        let orbit = OrbitalState::from_cartesian(
            EARTH_MU,
            0.0,
            DVec3::new(7.0e6, 0.0, 0.0),
            DVec3::new(0.0, 12.0e3, 0.0),
        )
        .unwrap();
        assert!(orbit.get_eccentricity() > 1.4);

        for days in [0.1, 1.0, 10.0, 30.0, 100.0, 365.0] {
            for sign in [1.0, -1.0] {
                assert_conserved(&orbit, sign * days * 86400.0);
            }
        }

        // Escaping: farther out every time, and symmetric about periapsis
        let year = orbit.posvelatt(365.0 * 86400.0).unwrap();
        let hundred_days = orbit.posvelatt(100.0 * 86400.0).unwrap();
        assert!(year.position.length() > hundred_days.position.length());

        let year_ago = orbit.posvelatt(-365.0 * 86400.0).unwrap();
        assert_almost_eq_rel(
            year_ago.position.length(),
            year.position.length(),
            year.position.length(),
            "distance a year either side of periapsis",
        );
    }

    #[test]
    fn open_orbits_over_long_spans() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = if rand::random_bool(0.8) {
                random_hyperbolic()
            } else {
                random_parabolic()
            };
            let scale = time_scale(&orbit);

            for multiple in [-1e4, -350.0, -25.0, 60.0, 900.0, 1e4] {
                assert_conserved(&orbit, orbit.get_epoch() + multiple * scale);
            }
        }
    }

    #[test]
    fn matches_true_anomaly_state() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();

            for point in orbit.points(7) {
                let sv = orbit.posvelatt(point.time).unwrap();
                assert_almost_eq_vec3(
                    sv.position,
                    point.position,
                    point.position.length(),
                    "propagated position",
                );
            }
        }
    }

    #[test]
    fn bracketing_fallback_agrees_with_newton() {
        let bracketing_only = SolverSettings {
            newton_max_iters: 0,
            ..SolverSettings::default()
        };

        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();
            let time = orbit.get_epoch() + rand::random_range(-2.0..2.0) * time_scale(&orbit);

            let newton = orbit.posvelatt(time).unwrap();
            let bisected = orbit.posvelatt_with(time, &bracketing_only).unwrap();

            assert_almost_eq_vec3(
                bisected.position,
                newton.position,
                newton.position.length(),
                "bisected position",
            );
        }
    }

    #[test]
    fn exhausted_budgets() {
        let orbit =
            OrbitalState::from_cartesian(1.0, 0.0, DVec3::X, DVec3::new(0.0, 1.2, 0.0)).unwrap();

        let no_probe = SolverSettings {
            newton_max_iters: 0,
            probe_steps: 0,
            ..SolverSettings::default()
        };
        assert_eq!(
            orbit.posvelatt_with(1.0, &no_probe),
            Err(OrbitError::Convergence(ConvergenceError::NoSignChange {
                steps: 0
            }))
        );

        let one_bisection = SolverSettings {
            newton_max_iters: 0,
            bisection_max_iters: 1,
            ..SolverSettings::default()
        };
        assert_eq!(
            orbit.posvelatt_with(1.0, &one_bisection),
            Err(OrbitError::Convergence(ConvergenceError::BisectionExhausted {
                iterations: 1
            }))
        );
    }

    #[test]
    fn rejects_non_finite_time() {
        assert!(matches!(
            unit_orbit().posvelatt(f64::NAN),
            Err(OrbitError::Domain(DomainError::NonFinite(_)))
        ));
    }
}

mod trajectory {
    use super::*;

    #[test]
    fn empty() {
        assert!(random_any().points(0).is_empty());
    }

    #[test]
    fn counts_and_monotonic_times() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_any();
            let count = rand::random_range(1..200);
            let points = orbit.points(count);

            assert_eq!(points.len(), count);
            assert!(points.windows(2).all(|w| w[0].time < w[1].time));
            assert!(points
                .iter()
                .all(|p| p.position.is_finite() && p.time.is_finite()));
        }
    }

    #[test]
    fn closed_orbit_starts_at_periapsis() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_elliptic();
            let points = orbit.points(16);
            let (p_hat, _) = orbit.get_perifocal_basis();
            let q = orbit.get_periapsis();

            assert_almost_eq_vec3(points[0].position, q * p_hat, q, "first point");
            assert_eq!(points[0].time, orbit.get_periapsis_time());

            let span = points[15].time - points[0].time;
            assert!(span < orbit.get_orbital_period().unwrap());
        }
    }

    #[test]
    fn open_orbit_is_symmetric() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = if rand::random_bool(0.5) {
                random_hyperbolic()
            } else {
                random_parabolic()
            };
            let points = orbit.points(9);
            let periapsis_time = orbit.get_periapsis_time();
            let span = points[8].time - points[0].time;

            // The middle point is periapsis, and the ends mirror each other
            assert_almost_eq_rel(points[4].time, periapsis_time, span, "middle point");
            assert_almost_eq_rel(
                points[0].time - periapsis_time,
                periapsis_time - points[8].time,
                points[8].time - periapsis_time,
                "mirrored ends",
            );
            assert_almost_eq_rel(
                points[0].position.length(),
                points[8].position.length(),
                points[8].position.length(),
                "mirrored radii",
            );
        }
    }
}

mod lambert {
    use super::*;

    #[test]
    fn reciprocity_with_propagation() {
        for _ in 0..RANDOM_ORBITS {
            let orbit = random_elliptic();
            let period = orbit.get_orbital_period().unwrap();
            let h = orbit.get_angular_momentum();

            // Skip orbits where the direction about +Z is ambiguous
            if h.z.abs() < 0.1 * h.length() {
                continue;
            }
            let direction = if h.z > 0.0 {
                Direction::Prograde
            } else {
                Direction::Retrograde
            };

            let flight_time = rand::random_range(0.05..0.95) * period;
            let arrival = orbit.posvelatt(orbit.get_epoch() + flight_time).unwrap();
            let r1 = orbit.get_position_at_epoch();

            let angle = r1.angle_between(arrival.position);
            if angle < 0.01 || (angle - PI).abs() < 0.01 {
                continue;
            }

            let solution = solve_lambert(
                r1,
                arrival.position,
                flight_time,
                orbit.get_gravitational_parameter(),
                direction,
            )
            .unwrap();

            let v0 = orbit.get_velocity_at_epoch();
            assert_almost_eq_vec3(solution.v1, v0, v0.length(), "departure velocity");
            assert_almost_eq_vec3(
                solution.v2,
                arrival.velocity,
                arrival.velocity.length(),
                "arrival velocity",
            );
        }
    }

    #[test]
    fn solar_transfer() {
        let r1 = DVec3::new(1.5e11, 0.0, 0.0);
        let r2 = DVec3::new(0.0, 1.3e11, 2e10);
        let flight_time = 100.0 * 86400.0;

        let solution = solve_lambert(r1, r2, flight_time, SUN_MU, Direction::Prograde).unwrap();

        let orbit = OrbitalState::from_cartesian(SUN_MU, 0.0, r1, solution.v1).unwrap();
        let arrival = orbit.posvelatt(flight_time).unwrap();

        assert!((arrival.position - r2).length() < 1.0);
        assert!((arrival.velocity - solution.v2).length() < 0.01);
    }

    #[test]
    fn fast_hyperbolic_solar_transfer() {
        let r1 = DVec3::new(1.5e11, 0.0, 0.0);
        let r2 = DVec3::new(0.0, 1.3e11, 2e10);

        for days in [1.0, 2.0, 5.0] {
            let flight_time = days * 86400.0;
            let solution = solve_lambert(r1, r2, flight_time, SUN_MU, Direction::Prograde).unwrap();

            let orbit = OrbitalState::from_cartesian(SUN_MU, 0.0, r1, solution.v1).unwrap();
            assert!(orbit.get_eccentricity() > 10.0, "{days} days isn't strongly hyperbolic");

            let arrival = orbit.posvelatt(flight_time).unwrap();
            assert_almost_eq_vec3(
                arrival.position,
                r2,
                0.1 * r2.length(),
                &format!("arrival after {days} days"),
            );
            assert_almost_eq_vec3(
                arrival.velocity,
                solution.v2,
                solution.v2.length(),
                &format!("arrival velocity after {days} days"),
            );
        }
    }

    #[test]
    fn parallel_flight_time_scan() {
        let r1 = DVec3::new(1.5e11, 0.0, 0.0);
        let r2 = DVec3::new(0.0, 1.3e11, 2e10);
        let days: Vec<f64> = (1..=16).map(|i| 20.0 * i as f64).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = days
                .iter()
                .map(|&d| {
                    scope.spawn(move || {
                        let flight_time = d * 86400.0;
                        let solution =
                            solve_lambert(r1, r2, flight_time, SUN_MU, Direction::Prograde)?;
                        let orbit = OrbitalState::from_cartesian(SUN_MU, 0.0, r1, solution.v1)?;
                        let arrival = orbit.posvelatt(flight_time)?;
                        Ok::<_, OrbitError>((arrival.position - r2).length())
                    })
                })
                .collect();

            for (handle, d) in handles.into_iter().zip(&days) {
                let miss = handle.join().unwrap().unwrap();
                assert!(miss < 10.0, "missed by {miss} m after {d} days");
            }
        });
    }
}

mod lifecycle {
    use super::*;

    fn circular() -> (DVec3, DVec3) {
        (DVec3::new(1.5e11, 0.0, 0.0), DVec3::new(0.0, 29.7e3, 0.0))
    }

    #[test]
    fn undefined_queries_fail() {
        let orbit = TwoBodyOrbit::new("Probe");
        let undefined = OrbitError::State(StateError::Undefined);

        assert!(!orbit.is_defined());
        assert!(orbit.state().is_none());
        assert_eq!(orbit.posvelatt(0.0).unwrap_err(), undefined);
        assert_eq!(orbit.points(10).unwrap_err(), undefined);
        assert_eq!(orbit.elements().unwrap_err(), undefined);
        assert_eq!(orbit.time_since_periapsis(0.0).unwrap_err(), undefined);
        assert_eq!(orbit.state_at_true_anomaly(0.0).unwrap_err(), undefined);
    }

    #[test]
    fn defaults_to_the_sun() {
        let orbit = TwoBodyOrbit::new("Probe");

        assert_eq!(orbit.get_central_body(), "Sun");
        assert_eq!(orbit.get_gravitational_parameter(), SUN_MU);
        assert_eq!(TwoBodyOrbit::default().get_gravitational_parameter(), SUN_MU);
    }

    #[test]
    fn set_clear_and_redefine() {
        let mut orbit = TwoBodyOrbit::new("Probe");
        let (r, v) = circular();

        orbit.set_cartesian(0.0, r, v).unwrap();
        assert!(orbit.is_defined());
        assert!(orbit.posvelatt(86400.0).is_ok());

        orbit.clear();
        assert!(!orbit.is_defined());
        assert_eq!(orbit.points(3), Err(OrbitError::State(StateError::Undefined)));

        let elements = ClassicalElements {
            semi_major_axis: 1.5e11,
            eccentricity: 0.1,
            inclination: 0.1,
            long_asc_node: 0.2,
            arg_pe: 0.3,
        };
        orbit
            .set_classical(elements, 0.0, EpochAnchor::MeanAnomaly(1.0))
            .unwrap();
        assert_eq!(orbit.elements().unwrap().eccentricity, 0.1);
    }

    #[test]
    fn failed_set_keeps_previous_state() {
        let mut orbit = TwoBodyOrbit::new("Probe");
        let (r, v) = circular();
        orbit.set_cartesian(0.0, r, v).unwrap();
        let before = orbit.state().cloned();

        assert!(orbit.set_cartesian(0.0, DVec3::ZERO, v).is_err());
        assert_eq!(orbit.state().cloned(), before);

        let bad = ClassicalElements {
            semi_major_axis: -1.0,
            eccentricity: 0.5,
            inclination: 0.0,
            long_asc_node: 0.0,
            arg_pe: 0.0,
        };
        assert!(orbit
            .set_classical(bad, 0.0, EpochAnchor::TrueAnomaly(0.0))
            .is_err());
        assert_eq!(orbit.state().cloned(), before);
    }

    #[test]
    fn invalid_central_body_fails_on_set() {
        let mut orbit = TwoBodyOrbit::with_central_body("Probe", "Nothing", 0.0);
        let (r, v) = circular();

        assert_eq!(
            orbit.set_cartesian(0.0, r, v).map(|_| ()),
            Err(OrbitError::Domain(DomainError::GravitationalParameter(0.0)))
        );
        assert!(!orbit.is_defined());
    }
}
