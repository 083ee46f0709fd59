//! Static surface elevation on the model grid

use {
    crate::{
        error::{Error, Result},
        grid::Grid,
        utils::array2_from_r8,
    },
    log::info,
    ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip},
    serde::{Deserialize, Serialize},
    std::fs,
};

/// Elevation profile (m)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    Flat,
    /// Gaussian mountain, `width` is the e-folding great circle distance in
    /// degrees
    IsolatedMountain {
        height: f64,
        latitude: f64,
        longitude: f64,
        width: f64,
    },
    /// Plateau of uniform height, longitudes may wrap through 0
    Block {
        height: f64,
        south: f64,
        north: f64,
        west: f64,
        east: f64,
    },
    /// Row-major little-endian f64 elevations on the model grid
    File { path: String, mask_ocean: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopographyParameters {
    pub profile: Profile,
    /// Standard deviation of the smoothing filter in grid points, 0 disables
    pub smoothing: f64,
}

impl Default for TopographyParameters {
    fn default() -> Self {
        Self {
            profile: Profile::IsolatedMountain {
                height: 4000.0,
                latitude: 45.0,
                longitude: 90.0,
                width: 10.0,
            },
            smoothing: 1.0,
        }
    }
}

/// Builds the (smoothed) elevation field for `grid`
pub fn topography(params: &TopographyParameters, grid: &Grid) -> Result<Array2<f64>> {
    if params.smoothing < 0.0 || !params.smoothing.is_finite() {
        return Err(Error::Config(format!(
            "topography smoothing {} must be finite and non-negative",
            params.smoothing
        )));
    }

    let elevation = profile(&params.profile, grid)?;
    let elevation = gaussian_filter(elevation.view(), params.smoothing);

    info!(
        "Topography ranges from {:.1} m to {:.1} m",
        elevation.iter().cloned().fold(f64::INFINITY, f64::min),
        elevation.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    );

    Ok(elevation)
}

pub fn profile(profile: &Profile, grid: &Grid) -> Result<Array2<f64>> {
    let (nlat, nlon) = grid.shape();

    Ok(match profile {
        Profile::Flat => Array2::zeros((nlat, nlon)),

        Profile::IsolatedMountain {
            height,
            latitude,
            longitude,
            width,
        } => {
            if !(*width > 0.0) {
                return Err(Error::Config(format!(
                    "mountain width {} is not positive",
                    width
                )));
            }
            grid.distance_from(*latitude, *longitude)
                .mapv(|distance| height * (-(distance / width).powi(2)).exp())
        }

        Profile::Block {
            height,
            south,
            north,
            west,
            east,
        } => {
            let west = west.rem_euclid(360.0);
            let east = east.rem_euclid(360.0);
            Array2::from_shape_fn((nlat, nlon), |(j, i)| {
                let lat = grid.lats[j];
                let lon = grid.lons[i].rem_euclid(360.0);
                let in_lon = if west <= east {
                    lon >= west && lon <= east
                } else {
                    lon >= west || lon <= east
                };
                if lat >= *south && lat <= *north && in_lon {
                    *height
                } else {
                    0.0
                }
            })
        }

        Profile::File { path, mask_ocean } => {
            let bytes = fs::read(path)?;
            let mut elevation = array2_from_r8(&bytes, nlat, nlon).ok_or_else(|| {
                Error::Config(format!(
                    "{} holds {} bytes, expected {} x {} f64 values",
                    path,
                    bytes.len(),
                    nlat,
                    nlon
                ))
            })?;
            if *mask_ocean {
                elevation.mapv_inplace(|h| h.max(0.0));
            }
            elevation
        }
    })
}

/// Gaussian filter with standard deviation `sigma` grid points, reflecting at
/// the first and last latitudes and periodic in longitude. The kernel is
/// truncated at 4 standard deviations.
pub fn gaussian_filter(field: ArrayView2<f64>, sigma: f64) -> Array2<f64> {
    if sigma == 0.0 {
        return field.to_owned();
    }

    let radius = (4.0 * sigma + 0.5) as isize;
    let mut kernel = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect::<Vec<f64>>();
    let total = kernel.iter().sum::<f64>();
    kernel.iter_mut().for_each(|w| *w /= total);

    let mut zonal = Array2::<f64>::zeros(field.raw_dim());
    Zip::from(zonal.rows_mut())
        .and(field.rows())
        .par_for_each(|out, row| convolve(row, out, &kernel, true));

    let mut out = Array2::<f64>::zeros(field.raw_dim());
    Zip::from(out.columns_mut())
        .and(zonal.columns())
        .par_for_each(|out, column| convolve(column, out, &kernel, false));

    out
}

fn convolve(line: ArrayView1<f64>, mut out: ArrayViewMut1<f64>, kernel: &[f64], periodic: bool) {
    let n = line.len() as isize;
    let radius = (kernel.len() / 2) as isize;

    for (i, o) in out.iter_mut().enumerate() {
        *o = kernel
            .iter()
            .zip(-radius..=radius)
            .map(|(w, k)| {
                let idx = i as isize + k;
                let idx = if periodic {
                    idx.rem_euclid(n)
                } else {
                    reflect(idx, n)
                };
                w * line[idx as usize]
            })
            .sum();
    }
}

/// Half-sample symmetric reflection of `idx` into `0..n`
fn reflect(mut idx: isize, n: isize) -> isize {
    loop {
        if idx < 0 {
            idx = -idx - 1;
        } else if idx >= n {
            idx = 2 * n - idx - 1;
        } else {
            return idx;
        }
    }
}
