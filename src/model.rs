//! Model state and integration loop
//!
//! The model owns the grid, the transform, the immutable mean state and the
//! evolving perturbation. Every wind it stores is recovered from a vorticity
//! spectrum with zero divergence.

use {
    crate::{
        constants::SECONDS_PER_HOUR,
        diffusion::Hyperdiffusion,
        error::{Error, Result},
        grid::Grid,
        initial::InitialConditions,
        parameters::{Parameters, Physical},
        snapshot::{Component, FieldSelection, Snapshot, SnapshotSink},
        spectral::{Spectral, SpectralTransform},
        stepper::{Scheme, Stepper},
        tendency::{Forcing, TendencyEvaluator},
        topography::topography,
        utils::{all_finite, max_abs},
    },
    chrono::{Duration, NaiveDateTime},
    log::{debug, info, warn},
    ndarray::{Array2, ArrayView2, Zip},
    num_complex::Complex64,
};

/// Settings fixed for the lifetime of a model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Time step (s)
    pub time_step: f64,
    pub steps: usize,
    /// Hours between snapshots, 0 disables them
    pub snapshot_interval: f64,
    pub scheme: Scheme,
    pub robert_coefficient: f64,
    pub diffusion: Hyperdiffusion,
    pub physical: Physical,
    pub output: FieldSelection,
}

impl ModelConfig {
    pub fn from_parameters(params: &Parameters) -> Self {
        Self {
            time_step: params.numerical.time_step,
            steps: params.numerical.steps,
            snapshot_interval: params.numerical.snapshot_interval,
            scheme: params.numerical.scheme,
            robert_coefficient: params.numerical.robert_coefficient,
            diffusion: params.diffusion,
            physical: params.physical.clone(),
            output: params.output,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0.0) || !self.time_step.is_finite() {
            return Err(Error::Config(format!(
                "time step {} must be positive",
                self.time_step
            )));
        }
        if self.steps == 0 {
            return Err(Error::Config("number of steps must be positive".to_string()));
        }
        if !(self.snapshot_interval >= 0.0) || !self.snapshot_interval.is_finite() {
            return Err(Error::Config(format!(
                "snapshot interval {} must be finite and non-negative",
                self.snapshot_interval
            )));
        }

        let physical = &self.physical;
        for (name, value) in &[
            ("radius", physical.radius),
            ("rotation rate", physical.rotation_rate),
            ("gravity", physical.gravity),
            ("fluid height", physical.fluid_height),
        ] {
            if !(*value > 0.0) || !value.is_finite() {
                return Err(Error::Config(format!("{} {} must be positive", name, value)));
            }
        }

        self.diffusion.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    U,
    V,
    Vorticity,
    Streamfunction,
}

/// Winds, relative vorticity and streamfunction of one part of the flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowFields {
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub vort: Array2<f64>,
    pub psi: Array2<f64>,
}

impl FlowFields {
    /// Non-divergent flow with the rotational part of `u`, `v`
    pub fn from_winds<S: SpectralTransform + ?Sized>(
        spectral: &S,
        u: ArrayView2<f64>,
        v: ArrayView2<f64>,
    ) -> Self {
        let (vort, _) = spectral.vorticity_divergence_spectra(u, v);
        Self::from_spectrum(spectral, vort.view())
    }

    /// Flow carrying the vorticity `vort`, projected onto the truncation
    pub fn from_vorticity<S: SpectralTransform + ?Sized>(
        spectral: &S,
        vort: ArrayView2<f64>,
    ) -> Self {
        Self::from_spectrum(spectral, spectral.grid_to_spectral(vort).view())
    }

    fn from_spectrum<S: SpectralTransform + ?Sized>(
        spectral: &S,
        vort: ArrayView2<Complex64>,
    ) -> Self {
        let (u, v) = spectral.winds_from_spectra(vort, spectral.zero_spectrum().view());
        Self {
            u,
            v,
            vort: spectral.spectral_to_grid(vort),
            psi: spectral.streamfunction_from_vorticity(vort),
        }
    }

    pub fn get(&self, field: Field) -> &Array2<f64> {
        match field {
            Field::U => &self.u,
            Field::V => &self.v,
            Field::Vorticity => &self.vort,
            Field::Streamfunction => &self.psi,
        }
    }

    /// First non-finite field, if any
    fn non_finite(&self) -> Option<&'static str> {
        [
            ("vorticity", &self.vort),
            ("u", &self.u),
            ("v", &self.v),
            ("streamfunction", &self.psi),
        ]
        .iter()
        .find(|(_, field)| !all_finite(field.view()))
        .map(|(name, _)| *name)
    }
}

/// Start time plus a whole number of steps
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    start: NaiveDateTime,
    dt: f64,
    steps: usize,
}

impl Clock {
    pub fn new(start: NaiveDateTime, dt: f64) -> Self {
        Self { start, dt, steps: 0 }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Seconds since the start
    pub fn elapsed(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    pub fn hours(&self) -> f64 {
        self.elapsed() / SECONDS_PER_HOUR
    }

    pub fn now(&self) -> NaiveDateTime {
        self.start + Duration::milliseconds((self.elapsed() * 1000.0).round() as i64)
    }

    fn advance(&mut self) {
        self.steps += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    /// One line of diagnostics per step
    pub monitor: String,
    pub steps: usize,
    /// Snapshots accepted by the sink
    pub snapshots: usize,
}

pub struct Model<S> {
    config: ModelConfig,
    grid: Grid,
    spectral: S,

    mean: FlowFields,
    perturbation: FlowFields,

    topography: Array2<f64>,
    coriolis: Array2<f64>,
    forcing: Option<Forcing>,

    stepper: Stepper,
    clock: Clock,
}

impl Model<Spectral> {
    /// Builds the grid, transform, initial state, topography and forcing
    /// described by `params`.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let grid = Grid::regular(params.numerical.grid_spacing)?;
        let spectral = Spectral::new(&grid, params.physical.radius, params.numerical.truncation)?;

        info!(
            "Grid of {} x {} points, truncation T{}",
            grid.nlat(),
            grid.nlon(),
            spectral.truncation()
        );

        let ics = InitialConditions::from_parameters(&params.initial, &grid, &spectral);
        let topography = topography(&params.topography, &grid)?;
        let forcing = params.initial.forcing.map(|profile| profile.build(&grid));

        Self::new(
            ModelConfig::from_parameters(params),
            ics,
            spectral,
            topography,
            forcing,
        )
    }
}

impl<S: SpectralTransform> Model<S> {
    pub fn new(
        config: ModelConfig,
        ics: InitialConditions,
        spectral: S,
        topography: Array2<f64>,
        forcing: Option<Forcing>,
    ) -> Result<Self> {
        config.validate()?;

        let grid = Grid::new(ics.lats.clone(), ics.lons.clone())?;
        let expected = grid.shape();

        check_shape("transform", expected, spectral.shape())?;
        for (name, field) in &[
            ("u_bar", &ics.u_bar),
            ("v_bar", &ics.v_bar),
            ("u_prime", &ics.u_prime),
            ("v_prime", &ics.v_prime),
            ("topography", &topography),
        ] {
            check_shape(*name, expected, field.dim())?;
        }
        if let Some(forcing) = &forcing {
            check_shape("forcing", expected, forcing.field.dim())?;
        }

        let mean = FlowFields::from_winds(&spectral, ics.u_bar.view(), ics.v_bar.view());
        let perturbation = FlowFields::from_winds(&spectral, ics.u_prime.view(), ics.v_prime.view());

        let coriolis = grid.coriolis(config.physical.rotation_rate);
        let stepper = Stepper::new(config.scheme, config.robert_coefficient)?;
        let clock = Clock::new(ics.start_time, config.time_step);

        Ok(Self {
            config,
            grid,
            spectral,
            mean,
            perturbation,
            topography,
            coriolis,
            forcing,
            stepper,
            clock,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn spectral(&self) -> &S {
        &self.spectral
    }

    pub fn mean(&self) -> &FlowFields {
        &self.mean
    }

    pub fn perturbation(&self) -> &FlowFields {
        &self.perturbation
    }

    pub fn topography(&self) -> &Array2<f64> {
        &self.topography
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// `field` of the mean, perturbation or total flow
    pub fn field(&self, field: Field, component: Component) -> Array2<f64> {
        match component {
            Component::Mean => self.mean.get(field).clone(),
            Component::Perturbation => self.perturbation.get(field).clone(),
            Component::Total => self.mean.get(field) + self.perturbation.get(field),
        }
    }

    /// Advances the perturbation by one time step
    pub fn step(&mut self) -> Result<()> {
        let t = self.clock.elapsed();
        let dt = self.config.time_step;
        let spectral = &self.spectral;

        let evaluator = TendencyEvaluator {
            grid: &self.grid,
            physical: &self.config.physical,
            diffusion: self.config.diffusion,
            spectral,
            psi_bar: self.mean.psi.view(),
            vort_bar: self.mean.vort.view(),
            topography: self.topography.view(),
            coriolis: self.coriolis.view(),
            forcing: self.forcing.as_ref(),
        };

        let advance = self
            .stepper
            .step(self.perturbation.vort.view(), t, dt, |vort, time| {
                let spec = spectral.grid_to_spectral(vort);
                let psi = spectral.streamfunction_from_vorticity(spec.view());
                evaluator.evaluate(vort, psi.view(), time)
            });

        let fields = FlowFields::from_vorticity(spectral, advance.next.view());

        let step = self.clock.steps() + 1;
        if let Some(field) = fields.non_finite() {
            return Err(Error::Diverged { step, field });
        }

        self.stepper.commit(advance);
        self.perturbation = fields;
        self.clock.advance();

        Ok(())
    }

    /// Runs the configured number of steps, handing snapshots to `sink`
    pub fn integrate(&mut self, sink: &mut dyn SnapshotSink) -> Result<Output> {
        let mut output = Output::default();
        self.integrate_into(sink, &mut output)?;
        Ok(output)
    }

    /// As `integrate`, recording into `output` so that the diagnostics of
    /// completed steps survive a failed run
    pub fn integrate_into(
        &mut self,
        sink: &mut dyn SnapshotSink,
        output: &mut Output,
    ) -> Result<()> {
        info!(
            "Integrating {} steps of {} s with {} from {}",
            self.config.steps,
            self.config.time_step,
            self.stepper.scheme(),
            self.clock.now()
        );

        if self.config.snapshot_interval > 0.0 {
            self.emit(sink, output);
        }

        for _ in 0..self.config.steps {
            if let Err(e) = self.step() {
                warn!(
                    "Stopped after {} steps at {}: {}",
                    output.steps,
                    self.clock.now(),
                    e
                );
                return Err(e);
            }
            output.steps += 1;

            self.diagnose(output);

            if self.snapshot_due() {
                self.emit(sink, output);
            }
        }

        info!(
            "Finished at {} after {} steps, {} snapshots",
            self.clock.now(),
            output.steps,
            output.snapshots
        );

        Ok(())
    }

    /// Snapshot of the fields selected in the configuration
    pub fn snapshot(&self) -> Snapshot {
        let selection = self.config.output;
        let streamfunction = self.field(Field::Streamfunction, selection.streamfunction);
        let scale = self.config.physical.rotation_rate / self.config.physical.gravity;

        Snapshot {
            hour: (self.clock.hours() + 1.0E-9).floor() as u64,
            time: self.clock.now(),
            lats: self.grid.lats.clone(),
            lons: self.grid.lons.clone(),
            selection,
            u: self.field(Field::U, selection.winds),
            v: self.field(Field::V, selection.winds),
            vorticity: self.field(Field::Vorticity, selection.vorticity),
            height: &streamfunction * scale,
            streamfunction,
            topography: self.topography.clone(),
            forcing: if selection.forcing {
                self.forcing.as_ref().map(|forcing| forcing.field.clone())
            } else {
                None
            },
        }
    }

    fn snapshot_due(&self) -> bool {
        if self.config.snapshot_interval == 0.0 {
            return false;
        }
        let r = self.clock.elapsed() / (self.config.snapshot_interval * SECONDS_PER_HOUR);
        (r - r.round()).abs() < 1.0E-9
    }

    fn emit(&self, sink: &mut dyn SnapshotSink, output: &mut Output) {
        let snapshot = self.snapshot();
        match sink.emit(&snapshot) {
            Ok(()) => output.snapshots += 1,
            Err(e) => warn!("Failed to emit snapshot for hour {}: {}", snapshot.hour, e),
        }
    }

    fn diagnose(&self, output: &mut Output) {
        let vort = self.perturbation.vort.view();
        let mean_square = self.area_mean(vort.mapv(|x| x * x).view());

        let mut speed = Array2::<f64>::zeros(self.grid.shape());
        Zip::from(&mut speed)
            .and(&self.mean.u)
            .and(&self.perturbation.u)
            .and(&self.mean.v)
            .and(&self.perturbation.v)
            .for_each(|s, ub, up, vb, vp| *s = (ub + up).hypot(vb + vp));

        let s = format!(
            "{:.5} {:.6e} {:.6e} {:.6e} {:.6}\n",
            self.clock.hours(),
            max_abs(vort),
            mean_square.sqrt(),
            0.5 * mean_square,
            max_abs(speed.view())
        );

        debug!("{}", &s.trim());
        output.monitor += &s;
    }

    /// cos(latitude) weighted mean over the sphere
    fn area_mean(&self, field: ArrayView2<f64>) -> f64 {
        let mut total = 0.0;
        let mut weight = 0.0;
        Zip::from(field)
            .and(&self.grid.theta)
            .for_each(|x, theta| {
                total += x * theta.cos();
                weight += theta.cos();
            });
        total / weight
    }
}

fn check_shape(
    name: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            name,
            expected,
            found,
        })
    }
}
