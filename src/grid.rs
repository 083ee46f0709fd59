//! Latitude/longitude grid shared by every field of the model.

use {
    crate::{
        constants::POLE_TOLERANCE,
        error::{Error, Result},
        operators::gradient,
    },
    ndarray::{Array2, Axis},
    serde::{Deserialize, Serialize},
    std::f64::consts::PI,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Latitudes in degrees, strictly monotonic
    pub lats: Vec<f64>,
    /// Longitudes in degrees, uniformly spaced around the full circle
    pub lons: Vec<f64>,

    /// Latitude (radians) at every grid point
    pub theta: Array2<f64>,
    /// Longitude (radians) at every grid point
    pub lambda: Array2<f64>,

    // Finite difference increments
    pub dtheta: Array2<f64>,
    pub dlambda: Array2<f64>,
}

impl Grid {
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self> {
        let nlat = lats.len();
        let nlon = lons.len();

        if nlat < 3 || nlon < 3 {
            return Err(Error::Grid(format!(
                "at least 3 latitudes and 3 longitudes are required, got {} x {}",
                nlat, nlon
            )));
        }

        if let Some(lat) = lats.iter().find(|lat| !(-90.0..=90.0).contains(*lat)) {
            return Err(Error::Grid(format!("latitude {} is out of range", lat)));
        }

        let increasing = lats.windows(2).all(|w| w[1] > w[0]);
        let decreasing = lats.windows(2).all(|w| w[1] < w[0]);
        if !(increasing || decreasing) {
            return Err(Error::Grid(
                "latitudes must be strictly monotonic".to_string(),
            ));
        }

        let spacing = 360.0 / nlon as f64;
        for (i, lon) in lons.iter().enumerate() {
            if (lon - lons[0] - spacing * i as f64).abs() > 1.0E-6 {
                return Err(Error::Grid(format!(
                    "longitudes must be uniformly spaced by {} degrees around the circle, \
                     found {} at index {}",
                    spacing, lon, i
                )));
            }
        }

        let theta = Array2::from_shape_fn((nlat, nlon), |(j, _)| lats[j].to_radians());
        let lambda = Array2::from_shape_fn((nlat, nlon), |(_, i)| lons[i].to_radians());

        let dtheta = gradient(theta.view(), Axis(0), false);
        let dlambda = Array2::from_elem((nlat, nlon), spacing.to_radians());

        Ok(Self {
            lats,
            lons,
            theta,
            lambda,
            dtheta,
            dlambda,
        })
    }

    /// Regular grid running from the north pole to the south pole, and
    /// eastwards from the prime meridian, with `spacing` degrees between
    /// points in both directions.
    pub fn regular(spacing: f64) -> Result<Self> {
        if !(spacing > 0.0) {
            return Err(Error::Grid(format!("grid spacing {} is not positive", spacing)));
        }

        let nlat = (180.0 / spacing).round() as usize + 1;
        let nlon = (360.0 / spacing).round() as usize;

        if ((nlat - 1) as f64 * spacing - 180.0).abs() > 1.0E-9
            || (nlon as f64 * spacing - 360.0).abs() > 1.0E-9
        {
            return Err(Error::Grid(format!(
                "grid spacing {} does not divide the sphere evenly",
                spacing
            )));
        }

        let lats = (0..nlat).map(|j| 90.0 - spacing * j as f64).collect();
        let lons = (0..nlon).map(|i| spacing * i as f64).collect();

        Self::new(lats, lons)
    }

    pub fn nlat(&self) -> usize {
        self.lats.len()
    }

    pub fn nlon(&self) -> usize {
        self.lons.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nlat(), self.nlon())
    }

    /// Longitude spacing in radians
    pub fn delta_lambda(&self) -> f64 {
        2.0 * PI / self.nlon() as f64
    }

    pub fn is_pole(&self, j: usize) -> bool {
        self.lats[j].to_radians().cos().abs() < POLE_TOLERANCE
    }

    pub fn pole_rows(&self) -> Vec<usize> {
        (0..self.nlat()).filter(|&j| self.is_pole(j)).collect()
    }

    /// Great circle distance (degrees) of every grid point from `(lat, lon)`
    pub fn distance_from(&self, lat: f64, lon: f64) -> Array2<f64> {
        let (phi0, lambda0) = (lat.to_radians(), lon.to_radians());
        Array2::from_shape_fn(self.shape(), |(j, i)| {
            let phi = self.theta[[j, i]];
            let cosd = phi.sin() * phi0.sin()
                + phi.cos() * phi0.cos() * (self.lambda[[j, i]] - lambda0).cos();
            cosd.max(-1.0).min(1.0).acos().to_degrees()
        })
    }

    /// Coriolis parameter f = 2 omega sin(theta)
    pub fn coriolis(&self, omega: f64) -> Array2<f64> {
        self.theta.mapv(|theta| 2.0 * omega * theta.sin())
    }
}
