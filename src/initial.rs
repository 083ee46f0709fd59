//! Idealized initial conditions and forcing

use {
    crate::{grid::Grid, spectral::SpectralTransform, tendency::Forcing},
    chrono::{NaiveDate, NaiveDateTime},
    ndarray::Array2,
    serde::{Deserialize, Serialize},
};

/// Zonal mean flow (m s^-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanFlow {
    Rest,
    /// u = speed cos(theta)
    SolidBody { speed: f64 },
    /// Extratropical jets,
    /// u = speed cos(theta) - 30 cos^3(theta) + 300 sin^2(theta) cos^6(theta)
    Jets { speed: f64 },
}

/// Initial perturbation vorticity (s^-1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perturbation {
    #[serde(rename = "none")]
    Unperturbed,
    /// 0.5 A cos(theta) exp(-((theta - theta0) / width)^2) cos(m lambda), with
    /// latitudes in degrees
    Sinusoidal {
        amplitude: f64,
        wavenumber: u32,
        latitude: f64,
        width: f64,
    },
    /// A exp(-(d / width)^2) for great circle distance d in degrees
    Gaussian {
        amplitude: f64,
        latitude: f64,
        longitude: f64,
        width: f64,
    },
}

/// Gaussian Rossby wave source (s^-2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForcingProfile {
    pub amplitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// e-folding great circle distance in degrees
    pub width: f64,
    /// Seconds during which the forcing is applied, always if absent
    pub duration: Option<f64>,
}

impl ForcingProfile {
    pub fn build(&self, grid: &Grid) -> Forcing {
        let amplitude = self.amplitude;
        let width = self.width;
        Forcing {
            field: grid
                .distance_from(self.latitude, self.longitude)
                .mapv(|d| amplitude * (-(d / width).powi(2)).exp()),
            duration: self.duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialParameters {
    /// Time stamp of the initial conditions
    pub start_time: NaiveDateTime,
    pub mean_flow: MeanFlow,
    pub perturbation: Perturbation,
    pub forcing: Option<ForcingProfile>,
}

impl Default for InitialParameters {
    fn default() -> Self {
        Self {
            start_time: NaiveDate::from_ymd_opt(2017, 1, 1)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            mean_flow: MeanFlow::Jets { speed: 0.0 },
            perturbation: Perturbation::Sinusoidal {
                amplitude: 1.2E-4,
                wavenumber: 1,
                latitude: 45.0,
                width: 15.0,
            },
            forcing: None,
        }
    }
}

/// Winds the model is started from
#[derive(Debug, Clone, PartialEq)]
pub struct InitialConditions {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub u_bar: Array2<f64>,
    pub v_bar: Array2<f64>,
    pub u_prime: Array2<f64>,
    pub v_prime: Array2<f64>,
    pub start_time: NaiveDateTime,
}

impl InitialConditions {
    pub fn from_parameters<S: SpectralTransform + ?Sized>(
        params: &InitialParameters,
        grid: &Grid,
        spectral: &S,
    ) -> Self {
        let vort_prime = perturbation_vorticity(&params.perturbation, grid);
        let vort_spec = spectral.grid_to_spectral(vort_prime.view());
        let (u_prime, v_prime) =
            spectral.winds_from_spectra(vort_spec.view(), spectral.zero_spectrum().view());

        Self {
            lats: grid.lats.clone(),
            lons: grid.lons.clone(),
            u_bar: mean_zonal_wind(&params.mean_flow, grid),
            v_bar: Array2::zeros(grid.shape()),
            u_prime,
            v_prime,
            start_time: params.start_time,
        }
    }
}

pub fn mean_zonal_wind(mean_flow: &MeanFlow, grid: &Grid) -> Array2<f64> {
    match *mean_flow {
        MeanFlow::Rest => Array2::zeros(grid.shape()),
        MeanFlow::SolidBody { speed } => grid.theta.mapv(|theta| speed * theta.cos()),
        MeanFlow::Jets { speed } => grid.theta.mapv(|theta| {
            let (s, c) = theta.sin_cos();
            speed * c - 30.0 * c.powi(3) + 300.0 * s.powi(2) * c.powi(6)
        }),
    }
}

pub fn perturbation_vorticity(perturbation: &Perturbation, grid: &Grid) -> Array2<f64> {
    match *perturbation {
        Perturbation::Unperturbed => Array2::zeros(grid.shape()),
        Perturbation::Sinusoidal {
            amplitude,
            wavenumber,
            latitude,
            width,
        } => {
            let (theta0, width) = (latitude.to_radians(), width.to_radians());
            Array2::from_shape_fn(grid.shape(), |(j, i)| {
                let theta = grid.theta[[j, i]];
                let lambda = grid.lambda[[j, i]];
                0.5 * amplitude
                    * theta.cos()
                    * (-((theta - theta0) / width).powi(2)).exp()
                    * (wavenumber as f64 * lambda).cos()
            })
        }
        Perturbation::Gaussian {
            amplitude,
            latitude,
            longitude,
            width,
        } => grid
            .distance_from(latitude, longitude)
            .mapv(|d| amplitude * (-(d / width).powi(2)).exp()),
    }
}
