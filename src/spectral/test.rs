use {
    super::*,
    crate::{constants::RE, utils::max_abs},
    approx::assert_abs_diff_eq,
};

/// Deterministic band-limited spectrum, real for m = 0
fn sample_spectrum(ntrunc: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((ntrunc + 1, ntrunc + 1), |(m, n)| {
        if n < m {
            Complex64::new(0.0, 0.0)
        } else if m == 0 {
            Complex64::new(((3 * n + 1) as f64).sin(), 0.0)
        } else {
            Complex64::new(((7 * m + 3 * n) as f64).sin(), ((5 * m + 11 * n) as f64).cos())
        }
    })
}

fn max_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max)
}

#[test]
fn truncation_defaults_and_clamps() {
    let grid = Grid::regular(2.5).unwrap();

    assert_eq!(36, Spectral::new(&grid, RE, None).unwrap().truncation());
    assert_eq!(36, Spectral::new(&grid, RE, Some(36)).unwrap().truncation());
    assert_eq!(21, Spectral::new(&grid, RE, Some(21)).unwrap().truncation());
    assert!(matches!(
        Spectral::new(&grid, RE, Some(0)),
        Err(Error::Config(_))
    ));
}

#[test]
fn explicit_truncation_beyond_grid_is_rejected() {
    let grid = Grid::regular(2.5).unwrap();

    for &requested in &[37, 72, 500] {
        assert!(matches!(
            Spectral::new(&grid, RE, Some(requested)),
            Err(Error::Config(_))
        ));
    }
}

#[test]
fn oversized_tables_are_rejected() {
    // 721 latitudes at T360 need over 2 GiB of tables
    let grid = Grid::regular(0.25).unwrap();

    assert!(matches!(
        Spectral::new(&grid, RE, None),
        Err(Error::Config(_))
    ));
}

#[test]
fn round_trip_from_spectral() {
    let grid = Grid::regular(5.0).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    let spec = sample_spectrum(spectral.truncation());

    let field = spectral.spectral_to_grid(spec.view());
    let back = spectral.grid_to_spectral(field.view());

    assert!(max_diff(&spec, &back) < 1.0E-10);
}

#[test]
fn round_trip_without_poles() {
    let lats = (0..35).map(|j| 85.0 - 5.0 * j as f64).collect();
    let lons = (0..72).map(|i| 5.0 * i as f64).collect();
    let grid = Grid::new(lats, lons).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    assert_eq!(17, spectral.truncation());

    let spec = sample_spectrum(17);
    let field = spectral.spectral_to_grid(spec.view());
    let back = spectral.grid_to_spectral(field.view());

    assert!(max_diff(&spec, &back) < 1.0E-10);
}

#[test]
fn sine_latitude_is_p1_0() {
    let grid = Grid::regular(5.0).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();

    let spec = spectral.grid_to_spectral(grid.theta.mapv(f64::sin).view());

    for ((m, n), c) in spec.indexed_iter() {
        let exact = if (m, n) == (0, 1) {
            (2.0f64 / 3.0).sqrt()
        } else {
            0.0
        };
        assert_abs_diff_eq!(exact, c.re, epsilon = 1.0E-12);
        assert_abs_diff_eq!(0.0, c.im, epsilon = 1.0E-12);
    }
}

/// Solid-body rotation u = U cos(theta) has vorticity 2 U sin(theta) / a and
/// no divergence.
#[test]
fn solid_body_rotation() {
    let grid = Grid::regular(2.5).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    let speed = 20.0;

    let u = grid.theta.mapv(|theta| speed * theta.cos());
    let v = Array2::<f64>::zeros(grid.shape());
    let vort = grid.theta.mapv(|theta| 2.0 * speed * theta.sin() / RE);

    let (vort_spec, div_spec) = spectral.vorticity_divergence_spectra(u.view(), v.view());
    let expected = spectral.grid_to_spectral(vort.view());

    assert!(max_diff(&expected, &vort_spec) < 1.0E-16);
    assert!(div_spec.iter().all(|c| c.norm() < 1.0E-16));

    let (u2, v2) = spectral.winds_from_spectra(vort_spec.view(), spectral.zero_spectrum().view());
    assert_abs_diff_eq!(u, u2, epsilon = 1.0E-9);
    assert_abs_diff_eq!(v, v2, epsilon = 1.0E-9);

    // psi = -U a sin(theta)
    let (psi, chi) = spectral.streamfunction_potential_from_winds(u.view(), v.view());
    let exact = grid.theta.mapv(|theta| -speed * RE * theta.sin());
    assert_abs_diff_eq!(exact, psi, epsilon = 1.0E-8 * speed * RE);
    assert!(max_abs(chi.view()) < 1.0E-8 * speed * RE);
}

#[test]
fn winds_from_vorticity_are_non_divergent() {
    let grid = Grid::regular(5.0).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    let mut vort = sample_spectrum(spectral.truncation()) * Complex64::new(1.0E-5, 0.0);
    vort[[0, 0]] = Complex64::new(0.0, 0.0);

    let (u, v) = spectral.winds_from_spectra(vort.view(), spectral.zero_spectrum().view());
    let (vort2, div2) = spectral.vorticity_divergence_spectra(u.view(), v.view());

    assert!(max_diff(&vort, &vort2) < 1.0E-15);
    assert!(div2.iter().all(|c| c.norm() < 1.0E-15));
}

#[test]
fn laplacian_eigenvalues() {
    let grid = Grid::regular(5.0).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    let spec = sample_spectrum(spectral.truncation());

    let lap = spectral.laplacian(spec.view());
    let back = spectral.inverse_laplacian(lap.view());

    for ((m, n), c) in back.indexed_iter() {
        if n == 0 {
            assert_eq!(Complex64::new(0.0, 0.0), *c);
        } else {
            assert!((c - spec[[m, n]]).norm() < 1.0E-12);
        }
    }
}

#[test]
fn streamfunction_from_vorticity_matches_wind_route() {
    let grid = Grid::regular(5.0).unwrap();
    let spectral = Spectral::new(&grid, RE, None).unwrap();
    let mut vort = sample_spectrum(spectral.truncation()) * Complex64::new(1.0E-5, 0.0);
    vort[[0, 0]] = Complex64::new(0.0, 0.0);

    let direct = spectral.streamfunction_from_vorticity(vort.view());

    let (u, v) = spectral.winds_from_spectra(vort.view(), spectral.zero_spectrum().view());
    let (psi, _) = spectral.streamfunction_potential_from_winds(u.view(), v.view());

    let scale = max_abs(direct.view());
    assert_abs_diff_eq!(direct, psi, epsilon = 1.0E-9 * scale);
}
