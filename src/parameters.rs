use {
    crate::{
        constants::{FLUID_HEIGHT, GRAVITY, OMEGA, RE},
        diffusion::Hyperdiffusion,
        initial::InitialParameters,
        snapshot::FieldSelection,
        stepper::Scheme,
        topography::TopographyParameters,
    },
    serde::{Deserialize, Serialize},
};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub numerical: Numerical,
    /// Hyperdiffusion: `off`, `del4` or `des`
    pub diffusion: Hyperdiffusion,
    pub physical: Physical,
    pub topography: TopographyParameters,
    pub initial: InitialParameters,
    pub output: FieldSelection,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Numerical {
    /// Spacing of the regular latitude/longitude grid in degrees
    pub grid_spacing: f64,
    /// Time step (s)
    pub time_step: f64,
    /// Number of time steps to integrate
    pub steps: usize,
    /// Interval between snapshots in hours, 0 disables them
    pub snapshot_interval: f64,
    /// Spectral truncation, at most min((nlat - 1) / 2, (nlon - 1) / 2).
    /// Without one the number of latitudes is requested and clamped.
    pub truncation: Option<usize>,
    /// Coefficient of the Robert-Asselin filter (leapfrog only)
    pub robert_coefficient: f64,
    /// Integration scheme, `leapfrog` or `rk4`
    pub scheme: Scheme,
}

impl Default for Numerical {
    fn default() -> Self {
        Numerical {
            grid_spacing: 2.5,
            time_step: 200.0,
            steps: 1060,
            snapshot_interval: 6.0,
            truncation: None,
            robert_coefficient: 0.2,
            scheme: Scheme::Rk4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physical {
    /// Planetary radius (m)
    pub radius: f64,
    /// Planetary rotation rate (s^-1)
    pub rotation_rate: f64,
    /// Gravitational acceleration (m s^-2)
    pub gravity: f64,
    /// Reference fluid depth scaling the topographic forcing (m)
    pub fluid_height: f64,
}

impl Default for Physical {
    fn default() -> Self {
        Physical {
            radius: RE,
            rotation_rate: OMEGA,
            gravity: GRAVITY,
            fluid_height: FLUID_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Directory receiving snapshots and the monitor file
    pub output_directory: String,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            output_directory: "output".to_string(),
        }
    }
}
