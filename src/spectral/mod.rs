//! Spherical harmonic transforms on a regular latitude/longitude grid
//!
//! Grid fields are indexed `[[lat, lon]]`. Spectral coefficients are indexed
//! `[[m, n]]` for zonal wavenumber `m` and total wavenumber `n >= m`, for
//! fully normalised associated Legendre functions (entries with `n < m` are
//! zero). Only `m >= 0` is stored; fields are real so negative `m` follow by
//! conjugate symmetry.
//!
//! Longitude analysis is a discrete Fourier transform. Latitude analysis uses
//! interpolatory quadrature in `x = sin(latitude)` at the grid latitudes,
//! which is exact for band-limited fields up to degree `(nlat - 1) / 2`.

#[cfg(test)]
mod test;

pub mod legendre;

use {
    crate::{
        error::{Error, Result},
        grid::Grid,
    },
    legendre::{quadrature_weights, LegendreTables},
    log::warn,
    ndarray::{Array2, ArrayView2, ArrayView3, Axis, Zip},
    num_complex::Complex64,
    rayon::prelude::*,
};

/// Upper bound on the memory held by the Legendre tables
pub const MAX_TABLE_BYTES: usize = 1 << 30;

/// Capabilities the model needs from a spherical harmonic transform.
pub trait SpectralTransform {
    /// Grid shape `(nlat, nlon)` the transform operates on
    fn shape(&self) -> (usize, usize);

    /// Effective triangular truncation
    fn truncation(&self) -> usize;

    fn grid_to_spectral(&self, field: ArrayView2<f64>) -> Array2<Complex64>;

    fn spectral_to_grid(&self, spec: ArrayView2<Complex64>) -> Array2<f64>;

    /// Spectral relative vorticity and divergence of the wind `(u, v)`
    fn vorticity_divergence_spectra(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
    ) -> (Array2<Complex64>, Array2<Complex64>);

    /// Grid winds with the given vorticity and divergence
    fn winds_from_spectra(
        &self,
        vort: ArrayView2<Complex64>,
        div: ArrayView2<Complex64>,
    ) -> (Array2<f64>, Array2<f64>);

    /// Streamfunction and velocity potential of the wind `(u, v)`
    fn streamfunction_potential_from_winds(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
    ) -> (Array2<f64>, Array2<f64>);

    fn zero_spectrum(&self) -> Array2<Complex64> {
        let size = self.truncation() + 1;
        Array2::zeros((size, size))
    }

    /// Streamfunction of a non-divergent flow with vorticity `vort`
    fn streamfunction_from_vorticity(&self, vort: ArrayView2<Complex64>) -> Array2<f64> {
        let div = self.zero_spectrum();
        let (u, v) = self.winds_from_spectra(vort, div.view());
        self.streamfunction_potential_from_winds(u.view(), v.view()).0
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Spectral {
    pub nlat: usize,
    pub nlon: usize,
    pub ntrunc: usize,
    pub radius: f64,

    // Latitude quadrature weights in x = sin(latitude)
    pub weights: Vec<f64>,
    pub legendre: LegendreTables,

    // Fourier tables, [[m, lon]]
    pub cosm: Array2<f64>,
    pub sinm: Array2<f64>,
}

impl Spectral {
    /// Creates the transform for `grid` on a sphere of `radius`.
    ///
    /// The largest degree the grid resolves exactly is
    /// `min((nlat - 1) / 2, (nlon - 1) / 2)`. Without a `truncation` the number
    /// of latitudes is requested and clamped to that limit; an explicit
    /// `truncation` beyond it is an error.
    pub fn new(grid: &Grid, radius: f64, truncation: Option<usize>) -> Result<Self> {
        let nlat = grid.nlat();
        let nlon = grid.nlon();

        if !(radius > 0.0) {
            return Err(Error::Config(format!("radius {} is not positive", radius)));
        }

        let limit = ((nlat - 1) / 2).min((nlon - 1) / 2);
        if limit == 0 {
            return Err(Error::Grid(format!(
                "a {} x {} grid cannot resolve any spherical harmonics",
                nlat, nlon
            )));
        }

        let ntrunc = match truncation {
            Some(0) => {
                return Err(Error::Config("truncation must be at least 1".to_string()));
            }
            Some(requested) if requested > limit => {
                return Err(Error::Config(format!(
                    "truncation T{} is beyond T{}, the largest degree a {} x {} grid resolves",
                    requested, limit, nlat, nlon
                )));
            }
            Some(requested) => requested,
            None if nlat > limit => {
                warn!(
                    "Default truncation T{} is beyond what a {} x {} grid resolves, using T{}",
                    nlat, nlat, nlon, limit
                );
                limit
            }
            None => nlat,
        };

        let table_bytes = 3 * nlat * (ntrunc + 1).pow(2) * std::mem::size_of::<f64>();
        if table_bytes > MAX_TABLE_BYTES {
            return Err(Error::Config(format!(
                "Legendre tables for T{} on {} latitudes need {} MiB, more than the {} MiB limit",
                ntrunc,
                nlat,
                table_bytes >> 20,
                MAX_TABLE_BYTES >> 20
            )));
        }

        let x = grid
            .lats
            .iter()
            .map(|lat| lat.to_radians().sin())
            .collect::<Vec<f64>>();
        let weights = quadrature_weights(&x)?;
        let legendre = LegendreTables::new(&x, ntrunc);

        let cosm = Array2::from_shape_fn((ntrunc + 1, nlon), |(m, i)| {
            (m as f64 * grid.lons[i].to_radians()).cos()
        });
        let sinm = Array2::from_shape_fn((ntrunc + 1, nlon), |(m, i)| {
            (m as f64 * grid.lons[i].to_radians()).sin()
        });

        Ok(Self {
            nlat,
            nlon,
            ntrunc,
            radius,
            weights,
            legendre,
            cosm,
            sinm,
        })
    }

    /// Fourier coefficients `(1 / nlon) sum_i f e^{-i m lambda_i}` of every
    /// latitude row, `[[lat, m]]`.
    pub fn fourier_analysis(&self, field: ArrayView2<f64>) -> Array2<Complex64> {
        let norm = 1.0 / self.nlon as f64;
        let mut out = Array2::<Complex64>::zeros((self.nlat, self.ntrunc + 1));

        Zip::from(out.rows_mut())
            .and(field.rows())
            .par_for_each(|mut coeffs, row| {
                for (m, c) in coeffs.iter_mut().enumerate() {
                    let mut re = 0.0;
                    let mut im = 0.0;
                    Zip::from(&row)
                        .and(self.cosm.row(m))
                        .and(self.sinm.row(m))
                        .for_each(|f, cos, sin| {
                            re += f * cos;
                            im -= f * sin;
                        });
                    *c = Complex64::new(re * norm, im * norm);
                }
            });

        out
    }

    /// Real grid field from Fourier coefficients `[[lat, m]]`.
    pub fn fourier_synthesis(&self, coeffs: ArrayView2<Complex64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((self.nlat, self.nlon));

        Zip::from(out.rows_mut())
            .and(coeffs.rows())
            .par_for_each(|mut row, coeffs| {
                for (i, f) in row.iter_mut().enumerate() {
                    let mut sum = coeffs[0].re;
                    for m in 1..=self.ntrunc {
                        let c = coeffs[m];
                        sum += 2.0 * (c.re * self.cosm[[m, i]] - c.im * self.sinm[[m, i]]);
                    }
                    *f = sum;
                }
            });

        out
    }

    /// `a[m, n] = sum_j w_j F[j, m] table[j, m, n]`
    fn legendre_analysis(
        &self,
        fourier: ArrayView2<Complex64>,
        table: ArrayView3<f64>,
    ) -> Array2<Complex64> {
        let mut out = self.zero_spectrum();

        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(m, mut row)| {
                for (j, w) in self.weights.iter().enumerate() {
                    let f = fourier[[j, m]] * *w;
                    for n in m..=self.ntrunc {
                        row[n] += f * table[[j, m, n]];
                    }
                }
            });

        out
    }

    /// `G[j, m] = sum_n a[m, n] table[j, m, n]`
    fn legendre_synthesis(
        &self,
        spec: ArrayView2<Complex64>,
        table: ArrayView3<f64>,
    ) -> Array2<Complex64> {
        let mut out = Array2::<Complex64>::zeros((self.nlat, self.ntrunc + 1));

        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(j, mut row)| {
                for m in 0..=self.ntrunc {
                    row[m] = (m..=self.ntrunc)
                        .map(|n| spec[[m, n]] * table[[j, m, n]])
                        .sum();
                }
            });

        out
    }

    /// Multiplies each zonal wavenumber `m` by `i m` (longitude derivative)
    fn i_m(coeffs: ArrayView2<Complex64>, m_axis: Axis) -> Array2<Complex64> {
        let mut out = coeffs.to_owned();
        for (m, mut lane) in out.axis_iter_mut(m_axis).enumerate() {
            let factor = Complex64::new(0.0, m as f64);
            lane.mapv_inplace(|c| c * factor);
        }
        out
    }

    /// Inverse Laplacian: `-a^2 / (n (n + 1))`, with the global mean set to 0
    pub fn inverse_laplacian(&self, spec: ArrayView2<Complex64>) -> Array2<Complex64> {
        let rsq = self.radius * self.radius;
        let mut out = spec.to_owned();
        out.indexed_iter_mut().for_each(|((_, n), c)| {
            *c = if n == 0 {
                Complex64::new(0.0, 0.0)
            } else {
                *c * (-rsq / (n * (n + 1)) as f64)
            };
        });
        out
    }

    /// Laplacian: `-n (n + 1) / a^2`
    pub fn laplacian(&self, spec: ArrayView2<Complex64>) -> Array2<Complex64> {
        let rsq = self.radius * self.radius;
        let mut out = spec.to_owned();
        out.indexed_iter_mut()
            .for_each(|((_, n), c)| *c *= -((n * (n + 1)) as f64) / rsq);
        out
    }

    fn check_shape(&self, field: &ArrayView2<f64>) {
        debug_assert_eq!(
            (self.nlat, self.nlon),
            field.dim(),
            "grid field does not match the transform"
        );
    }
}

impl SpectralTransform for Spectral {
    fn shape(&self) -> (usize, usize) {
        (self.nlat, self.nlon)
    }

    fn truncation(&self) -> usize {
        self.ntrunc
    }

    fn grid_to_spectral(&self, field: ArrayView2<f64>) -> Array2<Complex64> {
        self.check_shape(&field);
        let fourier = self.fourier_analysis(field);
        self.legendre_analysis(fourier.view(), self.legendre.p.view())
    }

    fn spectral_to_grid(&self, spec: ArrayView2<Complex64>) -> Array2<f64> {
        let fourier = self.legendre_synthesis(spec, self.legendre.p.view());
        self.fourier_synthesis(fourier.view())
    }

    fn vorticity_divergence_spectra(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
    ) -> (Array2<Complex64>, Array2<Complex64>) {
        self.check_shape(&u);
        self.check_shape(&v);

        let uf = self.fourier_analysis(u);
        let vf = self.fourier_analysis(v);
        let imu = Self::i_m(uf.view(), Axis(1));
        let imv = Self::i_m(vf.view(), Axis(1));

        let q = self.legendre.q.view();
        let dp = self.legendre.dp.view();
        let rinv = 1.0 / self.radius;

        let vort = (self.legendre_analysis(imv.view(), q)
            + self.legendre_analysis(uf.view(), dp))
            * Complex64::new(rinv, 0.0);
        let div = (self.legendre_analysis(imu.view(), q)
            - self.legendre_analysis(vf.view(), dp))
            * Complex64::new(rinv, 0.0);

        (vort, div)
    }

    fn winds_from_spectra(
        &self,
        vort: ArrayView2<Complex64>,
        div: ArrayView2<Complex64>,
    ) -> (Array2<f64>, Array2<f64>) {
        let psi = self.inverse_laplacian(vort);
        let chi = self.inverse_laplacian(div);
        let impsi = Self::i_m(psi.view(), Axis(0));
        let imchi = Self::i_m(chi.view(), Axis(0));

        let q = self.legendre.q.view();
        let dp = self.legendre.dp.view();
        let rinv = Complex64::new(1.0 / self.radius, 0.0);

        let uf = (self.legendre_synthesis(imchi.view(), q)
            - self.legendre_synthesis(psi.view(), dp))
            * rinv;
        let vf = (self.legendre_synthesis(impsi.view(), q)
            + self.legendre_synthesis(chi.view(), dp))
            * rinv;

        (
            self.fourier_synthesis(uf.view()),
            self.fourier_synthesis(vf.view()),
        )
    }

    fn streamfunction_potential_from_winds(
        &self,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
    ) -> (Array2<f64>, Array2<f64>) {
        let (vort, div) = self.vorticity_divergence_spectra(u, v);
        (
            self.spectral_to_grid(self.inverse_laplacian(vort.view()).view()),
            self.spectral_to_grid(self.inverse_laplacian(div.view()).view()),
        )
    }

    fn streamfunction_from_vorticity(&self, vort: ArrayView2<Complex64>) -> Array2<f64> {
        self.spectral_to_grid(self.inverse_laplacian(vort).view())
    }
}
