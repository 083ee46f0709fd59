//! Hyperdiffusion filters damping small scale perturbation vorticity
//!
//! `Del4` works in grid space and returns a term the tendency evaluator
//! subtracts. `Des` (dampening eddy sponge) works on the spectral coefficients
//! of the whole tendency and replaces it.

use {
    crate::{
        error::{Error, Result},
        grid::Grid,
        operators::laplacian,
        spectral::SpectralTransform,
    },
    log::trace,
    ndarray::{Array2, ArrayView2},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hyperdiffusion {
    Off,
    /// del^4 hyperdiffusion with coefficient `k` (m^4 s^-1)
    Del4 { coefficient: f64 },
    /// Spectral eddy sponge with damping rate `nu` (s^-1) at the truncation
    Des {
        coefficient: f64,
        fourier_increment: usize,
    },
}

impl Default for Hyperdiffusion {
    fn default() -> Self {
        Self::Des {
            coefficient: 1.0E-4,
            fourier_increment: 1,
        }
    }
}

impl Hyperdiffusion {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Off => Ok(()),
            Self::Del4 { coefficient } => {
                if coefficient < 0.0 || !coefficient.is_finite() {
                    Err(Error::Config(format!(
                        "del4 coefficient {} must be finite and non-negative",
                        coefficient
                    )))
                } else {
                    Ok(())
                }
            }
            Self::Des {
                coefficient,
                fourier_increment,
            } => {
                if coefficient < 0.0 || !coefficient.is_finite() {
                    Err(Error::Config(format!(
                        "des coefficient {} must be finite and non-negative",
                        coefficient
                    )))
                } else if fourier_increment == 0 {
                    Err(Error::Config("des fourier_increment must be at least 1".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Applies the filter to an undamped `tendency` of perturbation vorticity
    /// `vort`.
    pub fn apply<S: SpectralTransform + ?Sized>(
        &self,
        tendency: Array2<f64>,
        vort: ArrayView2<f64>,
        time: f64,
        grid: &Grid,
        radius: f64,
        spectral: &S,
    ) -> Array2<f64> {
        match *self {
            Self::Off => tendency,
            Self::Del4 { coefficient } => tendency - del4(vort, grid, radius, coefficient),
            Self::Des {
                coefficient,
                fourier_increment,
            } => des_filter(
                spectral,
                vort,
                tendency.view(),
                time,
                coefficient,
                fourier_increment,
            ),
        }
    }
}

/// `k * lap(lap(vort))`
pub fn del4(vort: ArrayView2<f64>, grid: &Grid, radius: f64, coefficient: f64) -> Array2<f64> {
    let lap = laplacian(vort, grid, radius);
    laplacian(lap.view(), grid, radius) * coefficient
}

/// Damping rate for every total wavenumber `0..=ntrunc`
///
/// rate(n) = nu * (nb (nb + 1) / (N (N + 1)))^2 with nb = n rounded down to a
/// multiple of `fourier_increment`.
pub fn des_damping(ntrunc: usize, coefficient: f64, fourier_increment: usize) -> Vec<f64> {
    let top = (ntrunc * (ntrunc + 1)) as f64;
    (0..=ntrunc)
        .map(|n| {
            let nb = (n / fourier_increment) * fourier_increment;
            coefficient * ((nb * (nb + 1)) as f64 / top).powi(2)
        })
        .collect()
}

/// Spectral eddy sponge: returns `tend(n) - rate(n) vort(n)` in grid space
pub fn des_filter<S: SpectralTransform + ?Sized>(
    spectral: &S,
    vort: ArrayView2<f64>,
    tendency: ArrayView2<f64>,
    time: f64,
    coefficient: f64,
    fourier_increment: usize,
) -> Array2<f64> {
    trace!("DES filter at t = {} s", time);

    let rate = des_damping(spectral.truncation(), coefficient, fourier_increment);
    let vort_spec = spectral.grid_to_spectral(vort);
    let mut tend_spec = spectral.grid_to_spectral(tendency);

    tend_spec
        .indexed_iter_mut()
        .for_each(|((m, n), c)| *c -= vort_spec[[m, n]] * rate[n]);

    spectral.spectral_to_grid(tend_spec.view())
}
