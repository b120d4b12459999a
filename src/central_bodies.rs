//! Gravitational parameters of common central bodies.
//!
//! All values are in SI units (m^3/s^2).
//!
//! "The standard gravitational parameter μ of a celestial body is the product
//! of the gravitational constant G and the mass M of that body."
//!
//! \- [Wikipedia](https://en.wikipedia.org/wiki/Standard_gravitational_parameter)

/// The Sun. This is the default central body of
/// [`TwoBodyOrbit::new`][crate::TwoBodyOrbit::new].
pub const SUN_MU: f64 = 1.32712440041e20;

/// Mercury.
pub const MERCURY_MU: f64 = 2.2032e13;

/// Venus.
pub const VENUS_MU: f64 = 3.24859e14;

/// The Earth.
pub const EARTH_MU: f64 = 3.986004418e14;

/// The Moon.
pub const MOON_MU: f64 = 4.9048695e12;

/// Mars.
pub const MARS_MU: f64 = 4.282837e13;

/// Jupiter.
pub const JUPITER_MU: f64 = 1.26686534e17;

/// Saturn.
pub const SATURN_MU: f64 = 3.7931187e16;

/// Uranus.
pub const URANUS_MU: f64 = 5.793939e15;

/// Neptune.
pub const NEPTUNE_MU: f64 = 6.836529e15;
