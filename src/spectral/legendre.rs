//! Associated Legendre functions and latitude quadrature.
//!
//! Functions are fully normalised so that the integral of the square of each
//! over x = sin(latitude) in [-1, 1] is one, and carry no Condon-Shortley
//! phase. Tables are indexed `[[lat, m, n]]` with zeros wherever `n < m`.

use {
    crate::error::{Error, Result},
    faer::{linalg::solvers::Solve, Mat},
    ndarray::{Array2, Array3},
    std::f64::consts::FRAC_1_SQRT_2,
};

#[derive(Debug, PartialEq, Clone)]
pub struct LegendreTables {
    /// P(n, m) at each latitude
    pub p: Array3<f64>,
    /// dP(n, m)/dphi (latitude derivative)
    pub dp: Array3<f64>,
    /// P(n, m) / cos(phi), zero for m = 0
    pub q: Array3<f64>,
}

impl LegendreTables {
    /// Builds the tables up to and including degree `ntrunc` at the nodes
    /// `x = sin(latitude)`.
    pub fn new(x: &[f64], ntrunc: usize) -> Self {
        let size = ntrunc + 1;
        let mut p = Array3::<f64>::zeros((x.len(), size, size));
        let mut dp = p.clone();
        let mut q = p.clone();

        for (j, &xj) in x.iter().enumerate() {
            // One degree beyond the truncation is needed for derivatives
            let pj = legendre(xj, ntrunc + 1);

            for m in 0..size {
                let mf = m as f64;
                for n in m..size {
                    let nf = n as f64;

                    p[[j, m, n]] = pj[[m, n]];

                    dp[[j, m, n]] = if m == 0 {
                        (nf * (nf + 1.0)).sqrt() * pj[[1, n]]
                    } else {
                        -0.5 * (((nf + mf) * (nf - mf + 1.0)).sqrt() * pj[[m - 1, n]]
                            - ((nf - mf) * (nf + mf + 1.0)).sqrt() * pj[[m + 1, n]])
                    };

                    if m > 0 {
                        q[[j, m, n]] = ((2.0 * nf + 1.0) / (2.0 * nf + 3.0)).sqrt() / (2.0 * mf)
                            * (((nf + mf + 1.0) * (nf + mf + 2.0)).sqrt() * pj[[m + 1, n + 1]]
                                + ((nf - mf + 1.0) * (nf - mf + 2.0)).sqrt() * pj[[m - 1, n + 1]]);
                    }
                }
            }
        }

        Self { p, dp, q }
    }
}

/// Fully normalised associated Legendre functions at `x` for
/// `0 <= m <= n <= nmax`, indexed `[[m, n]]`.
pub fn legendre(x: f64, nmax: usize) -> Array2<f64> {
    let s = (1.0 - x * x).max(0.0).sqrt();
    let mut p = Array2::<f64>::zeros((nmax + 1, nmax + 1));

    p[[0, 0]] = FRAC_1_SQRT_2;

    for m in 0..=nmax {
        let mf = m as f64;

        if m > 0 {
            p[[m, m]] = ((2.0 * mf + 1.0) / (2.0 * mf)).sqrt() * s * p[[m - 1, m - 1]];
        }

        if m < nmax {
            p[[m, m + 1]] = (2.0 * mf + 3.0).sqrt() * x * p[[m, m]];
        }

        for n in m + 2..=nmax {
            let nf = n as f64;
            let a = ((4.0 * nf * nf - 1.0) / (nf * nf - mf * mf)).sqrt();
            let b = (((nf - 1.0).powi(2) - mf * mf) / (4.0 * (nf - 1.0).powi(2) - 1.0)).sqrt();
            p[[m, n]] = a * (x * p[[m, n - 1]] - b * p[[m, n - 2]]);
        }
    }

    p
}

/// Interpolatory quadrature weights on [-1, 1] for arbitrary distinct nodes,
/// exact for polynomials up to degree `x.len() - 1`.
///
/// Solves sum_j w_j P_k(x_j) = 2 delta_k0 for k < x.len() using the
/// unnormalised Legendre polynomials P_k.
pub fn quadrature_weights(x: &[f64]) -> Result<Vec<f64>> {
    let n = x.len();
    let mut moments = Mat::<f64>::zeros(n, n);

    for (j, &xj) in x.iter().enumerate() {
        let mut pm = 1.0;
        let mut p = xj;
        moments[(0, j)] = 1.0;
        if n > 1 {
            moments[(1, j)] = xj;
        }
        for k in 2..n {
            let kf = k as f64;
            let next = ((2.0 * kf - 1.0) * xj * p - (kf - 1.0) * pm) / kf;
            pm = p;
            p = next;
            moments[(k, j)] = p;
        }
    }

    let mut rhs = Mat::<f64>::zeros(n, 1);
    rhs[(0, 0)] = 2.0;

    let lu = moments.as_ref().full_piv_lu();
    let solution = lu.solve(&rhs);
    let weights = (0..n).map(|j| solution[(j, 0)]).collect::<Vec<f64>>();

    // A singular system leaves non-finite weights or unmatched moments
    let residual = (0..n)
        .map(|k| {
            let sum = (0..n).map(|j| moments[(k, j)] * weights[j]).sum::<f64>();
            (sum - rhs[(k, 0)]).abs()
        })
        .fold(0.0, f64::max);

    if weights.iter().all(|w| w.is_finite()) && residual < 1.0E-8 {
        Ok(weights)
    } else {
        Err(Error::Grid(
            "latitude quadrature is singular, are latitudes repeated?".to_string(),
        ))
    }
}

#[cfg(test)]
mod test {
    use {super::*, approx::assert_abs_diff_eq};

    #[test]
    fn low_degree_closed_forms() {
        let x = 0.3f64;
        let s = (1.0 - x * x).sqrt();
        let p = legendre(x, 3);

        assert_abs_diff_eq!(FRAC_1_SQRT_2, p[[0, 0]], epsilon = 1.0E-15);
        assert_abs_diff_eq!((1.5f64).sqrt() * x, p[[0, 1]], epsilon = 1.0E-15);
        assert_abs_diff_eq!(3.0f64.sqrt() / 2.0 * s, p[[1, 1]], epsilon = 1.0E-15);
        assert_abs_diff_eq!(
            (2.5f64).sqrt() * (3.0 * x * x - 1.0) / 2.0,
            p[[0, 2]],
            epsilon = 1.0E-15
        );
        assert_abs_diff_eq!(15.0f64.sqrt() / 2.0 * x * s, p[[1, 2]], epsilon = 1.0E-15);
        assert_abs_diff_eq!(15.0f64.sqrt() / 4.0 * s * s, p[[2, 2]], epsilon = 1.0E-15);
    }

    #[test]
    fn weights_integrate_polynomials() {
        let x = (0..37)
            .map(|j| (90.0 - 5.0 * j as f64).to_radians().sin())
            .collect::<Vec<f64>>();
        let w = quadrature_weights(&x).unwrap();

        assert_abs_diff_eq!(2.0, w.iter().sum::<f64>(), epsilon = 1.0E-12);
        // Integral of x^k over [-1, 1]
        for k in 0..=36 {
            let exact = if k % 2 == 0 { 2.0 / (k as f64 + 1.0) } else { 0.0 };
            let approx = x
                .iter()
                .zip(&w)
                .map(|(x, w)| w * x.powi(k))
                .sum::<f64>();
            assert_abs_diff_eq!(exact, approx, epsilon = 1.0E-10);
        }
    }

    #[test]
    fn tables_are_orthonormal() {
        let x = (0..37)
            .map(|j| (90.0 - 5.0 * j as f64).to_radians().sin())
            .collect::<Vec<f64>>();
        let w = quadrature_weights(&x).unwrap();
        let tables = LegendreTables::new(&x, 18);

        for m in 0..=18 {
            for n in m..=18 {
                for k in m..=18 {
                    let product = (0..x.len())
                        .map(|j| w[j] * tables.p[[j, m, n]] * tables.p[[j, m, k]])
                        .sum::<f64>();
                    let exact = if n == k { 1.0 } else { 0.0 };
                    assert_abs_diff_eq!(exact, product, epsilon = 1.0E-10);
                }
            }
        }
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let phi = 0.4f64;
        let h = 1.0E-6;
        let tables = LegendreTables::new(&[phi.sin()], 6);
        let plus = legendre((phi + h).sin(), 6);
        let minus = legendre((phi - h).sin(), 6);

        for m in 0..=6 {
            for n in m..=6 {
                let fd = (plus[[m, n]] - minus[[m, n]]) / (2.0 * h);
                assert_abs_diff_eq!(fd, tables.dp[[0, m, n]], epsilon = 1.0E-7);
                if m > 0 {
                    assert_abs_diff_eq!(
                        tables.p[[0, m, n]] / phi.cos(),
                        tables.q[[0, m, n]],
                        epsilon = 1.0E-12
                    );
                }
            }
        }
    }

    #[test]
    fn repeated_nodes_are_rejected() {
        assert!(quadrature_weights(&[0.5, 0.5, -0.5]).is_err());
    }
}
