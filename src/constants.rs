/// Planetary radius (m)
pub const RE: f64 = 6_378_100.0;
/// Planetary rotation rate (s^-1)
pub const OMEGA: f64 = 7.292E-5;
/// Gravitational acceleration (m s^-2)
pub const GRAVITY: f64 = 9.81;
/// Reference fluid depth used to scale topographic vortex stretching (m)
pub const FLUID_HEIGHT: f64 = 10_000.0;

/// Rows with |cos(latitude)| below this are treated as poles.
pub const POLE_TOLERANCE: f64 = 1.0E-10;

pub const SECONDS_PER_HOUR: f64 = 3600.0;
