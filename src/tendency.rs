//! Right hand side of the barotropic vorticity equation

use {
    crate::{
        diffusion::Hyperdiffusion,
        grid::Grid,
        operators::{d_dlambda, jacobian},
        parameters::Physical,
        spectral::SpectralTransform,
    },
    ndarray::{Array2, ArrayView2, Axis, Zip},
};

/// Externally imposed vorticity tendency (s^-2)
#[derive(Debug, Clone, PartialEq)]
pub struct Forcing {
    pub field: Array2<f64>,
    /// Seconds after the start during which the forcing is applied, forever
    /// if `None`
    pub duration: Option<f64>,
}

impl Forcing {
    pub fn is_active(&self, time: f64) -> bool {
        self.duration.map_or(true, |duration| time < duration)
    }
}

/// Static inputs of the tendency, borrowed from the model for one step.
pub struct TendencyEvaluator<'a, S: ?Sized> {
    pub grid: &'a Grid,
    pub physical: &'a Physical,
    pub diffusion: Hyperdiffusion,
    pub spectral: &'a S,

    pub psi_bar: ArrayView2<'a, f64>,
    pub vort_bar: ArrayView2<'a, f64>,
    pub topography: ArrayView2<'a, f64>,
    pub coriolis: ArrayView2<'a, f64>,
    pub forcing: Option<&'a Forcing>,
}

impl<'a, S: SpectralTransform + ?Sized> TendencyEvaluator<'a, S> {
    /// d(vort_prime)/dt at `time` seconds after the start.
    ///
    /// Pole rows of the advective terms are zeroed before the hyperdiffusion
    /// sees them, and pole rows of the result are exactly zero.
    pub fn evaluate(
        &self,
        vort_prime: ArrayView2<f64>,
        psi_prime: ArrayView2<f64>,
        time: f64,
    ) -> Array2<f64> {
        let grid = self.grid;
        let radius = self.physical.radius;
        let omega = self.physical.rotation_rate;

        let psi = &self.psi_bar + &psi_prime;
        let vort = &self.vort_bar + &vort_prime;

        // Beta effect
        let mut tend = d_dlambda(psi.view(), grid.dlambda.view()) * (-2.0 * omega / radius.powi(2));

        // Advection of total vorticity by the total flow
        tend -= &self.jacobian(psi.view(), vort.view());
        self.mask_poles(&mut tend);

        let mut tend = self.diffusion.apply(
            tend,
            vort_prime,
            time,
            grid,
            radius,
            self.spectral,
        );

        if let Some(forcing) = self.forcing {
            if forcing.is_active(time) {
                tend += &forcing.field;
            }
        }

        // Vortex stretching by flow over topography
        let topo = self.jacobian(psi.view(), self.topography);
        let height = self.physical.fluid_height;
        Zip::from(&mut tend)
            .and(self.coriolis)
            .and(&topo)
            .for_each(|tend, f, j| *tend -= f * j / height);

        self.mask_poles(&mut tend);

        tend
    }

    fn jacobian(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Array2<f64> {
        jacobian(
            a,
            b,
            self.grid.theta.view(),
            self.grid.dtheta.view(),
            self.grid.dlambda.view(),
            self.physical.radius,
        )
    }

    fn mask_poles(&self, field: &mut Array2<f64>) {
        for j in self.grid.pole_rows() {
            field.index_axis_mut(Axis(0), j).fill(0.0);
        }
    }
}
