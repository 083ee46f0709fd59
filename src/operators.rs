//! Grid-space finite difference operators on the sphere.
//!
//! Fields are indexed `[[lat, lon]]`. Longitude derivatives wrap around the
//! circle, latitude derivatives are one-sided on the first and last rows.
//!
//! The spherical Jacobian carries a `1 / cos(theta)` factor and is therefore
//! numerically singular on pole rows, where it returns very large (or
//! non-finite) values. It is left unmasked here; the tendency evaluator zeroes
//! pole rows of the advective terms and of the final tendency.

use {
    crate::grid::Grid,
    ndarray::{Array2, ArrayView2, Axis, Slice, Zip},
    rayon::prelude::*,
};

/// Centred difference `(f[i+1] - f[i-1]) / 2` along `axis`, without dividing
/// by any increment.
pub fn gradient(field: ArrayView2<f64>, axis: Axis, periodic: bool) -> Array2<f64> {
    let n = field.len_of(axis);
    assert!(n >= 3, "gradient requires at least 3 points along the axis");

    let mut out = Array2::<f64>::zeros(field.raw_dim());

    Zip::from(out.slice_axis_mut(axis, Slice::from(1..n - 1)))
        .and(field.slice_axis(axis, Slice::from(2..n)))
        .and(field.slice_axis(axis, Slice::from(0..n - 2)))
        .for_each(|out, &hi, &lo| *out = 0.5 * (hi - lo));

    if periodic {
        Zip::from(out.index_axis_mut(axis, 0))
            .and(field.index_axis(axis, 1))
            .and(field.index_axis(axis, n - 1))
            .for_each(|out, &hi, &lo| *out = 0.5 * (hi - lo));
        Zip::from(out.index_axis_mut(axis, n - 1))
            .and(field.index_axis(axis, 0))
            .and(field.index_axis(axis, n - 2))
            .for_each(|out, &hi, &lo| *out = 0.5 * (hi - lo));
    } else {
        Zip::from(out.index_axis_mut(axis, 0))
            .and(field.index_axis(axis, 1))
            .and(field.index_axis(axis, 0))
            .for_each(|out, &hi, &lo| *out = hi - lo);
        Zip::from(out.index_axis_mut(axis, n - 1))
            .and(field.index_axis(axis, n - 1))
            .and(field.index_axis(axis, n - 2))
            .for_each(|out, &hi, &lo| *out = hi - lo);
    }

    out
}

/// Finite difference approximation to d/dlambda (longitude direction)
pub fn d_dlambda(field: ArrayView2<f64>, dlambda: ArrayView2<f64>) -> Array2<f64> {
    gradient(field, Axis(1), true) / &dlambda
}

/// Finite difference approximation to d/dtheta (latitude direction)
pub fn d_dtheta(field: ArrayView2<f64>, dtheta: ArrayView2<f64>) -> Array2<f64> {
    gradient(field, Axis(0), false) / &dtheta
}

/// Spherical Jacobian
///
/// J(A,B) = 1 / (Re^2 cos(theta)) * (dA/dlambda dB/dtheta - dB/dlambda dA/dtheta)
pub fn jacobian(
    a: ArrayView2<f64>,
    b: ArrayView2<f64>,
    theta: ArrayView2<f64>,
    dtheta: ArrayView2<f64>,
    dlambda: ArrayView2<f64>,
    radius: f64,
) -> Array2<f64> {
    let ax = d_dlambda(a, dlambda);
    let ay = d_dtheta(a, dtheta);
    let bx = d_dlambda(b, dlambda);
    let by = d_dtheta(b, dtheta);

    let rsq = radius * radius;
    let mut out = Array2::<f64>::zeros(a.raw_dim());

    Zip::from(&mut out)
        .and(&ax)
        .and(&by)
        .and(&bx)
        .and(&ay)
        .and(theta)
        .par_for_each(|out, ax, by, bx, ay, theta| {
            *out = (ax * by - bx * ay) / (rsq * theta.cos());
        });

    out
}

/// Spherical Laplacian in flux form
///
/// Latitude fluxes are evaluated half way between rows and weighted by the
/// cosine of latitude there; the longitude part is the periodic 3-point
/// second difference. Pole rows are left at zero.
pub fn laplacian(field: ArrayView2<f64>, grid: &Grid, radius: f64) -> Array2<f64> {
    let nlat = grid.nlat();
    let nlon = grid.nlon();
    let rsq = radius * radius;
    let dlsq = grid.delta_lambda().powi(2);
    let phi = grid
        .lats
        .iter()
        .map(|lat| lat.to_radians())
        .collect::<Vec<f64>>();

    let mut out = Array2::<f64>::zeros((nlat, nlon));

    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .filter(|(j, _)| !grid.is_pole(*j))
        .for_each(|(j, mut row)| {
            let cos_j = phi[j].cos();
            let up = if j > 0 { j - 1 } else { j };
            let dn = if j + 1 < nlat { j + 1 } else { j };
            let denom = 0.5 * (phi[dn] - phi[up]);

            for i in 0..nlon {
                let east = field[[j, (i + 1) % nlon]];
                let west = field[[j, (i + nlon - 1) % nlon]];
                let centre = field[[j, i]];

                let zonal = (east - 2.0 * centre + west) / (dlsq * cos_j * cos_j);

                let flux_dn = if dn != j {
                    (0.5 * (phi[j] + phi[dn])).cos() * (field[[dn, i]] - centre)
                        / (phi[dn] - phi[j])
                } else {
                    0.0
                };
                let flux_up = if up != j {
                    (0.5 * (phi[j] + phi[up])).cos() * (centre - field[[up, i]])
                        / (phi[j] - phi[up])
                } else {
                    0.0
                };
                let meridional = (flux_dn - flux_up) / (denom * cos_j);

                row[i] = (zonal + meridional) / rsq;
            }
        });

    out
}
