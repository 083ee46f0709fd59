//! Time stepping of the perturbation vorticity

use {
    crate::error::{Error, Result},
    ndarray::{Array2, ArrayView2, Zip},
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

/// Integration scheme selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Leapfrog,
    Rk4,
}

impl Default for Scheme {
    fn default() -> Self {
        Self::Rk4
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "leapfrog" => Ok(Self::Leapfrog),
            "rk4" => Ok(Self::Rk4),
            _ => Err(Error::Config(format!(
                "unknown integration scheme {:?}, expected leapfrog or rk4",
                s
            ))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Leapfrog => write!(f, "leapfrog"),
            Self::Rk4 => write!(f, "rk4"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No step taken yet
    Uninitialized,
    /// One forward step taken, history is unfiltered
    FirstStep,
    Steady,
}

/// Leapfrog with a Robert-Asselin filter
#[derive(Debug, Clone, PartialEq)]
pub struct Leapfrog {
    pub robert: f64,
    prev: Option<Array2<f64>>,
    phase: Phase,
}

impl Leapfrog {
    pub fn new(robert: f64) -> Result<Self> {
        if !(0.0..0.5).contains(&robert) {
            return Err(Error::Config(format!(
                "Robert coefficient {} must lie in [0, 0.5)",
                robert
            )));
        }
        Ok(Self {
            robert,
            prev: None,
            phase: Phase::Uninitialized,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Filtered vorticity of the previous step
    pub fn history(&self) -> Option<&Array2<f64>> {
        self.prev.as_ref()
    }

    /// Leapfrog step from `now`, leaving the history untouched until
    /// committed
    fn advance<F>(&self, now: ArrayView2<f64>, t: f64, dt: f64, mut tendency: F) -> Advance
    where
        F: FnMut(ArrayView2<f64>, f64) -> Array2<f64>,
    {
        let mut next = tendency(now, t);

        match &self.prev {
            None => {
                Zip::from(&mut next)
                    .and(now)
                    .for_each(|next, now| *next = now + *next * dt);

                Advance {
                    history: Some(now.to_owned()),
                    next,
                }
            }
            Some(prev) => {
                Zip::from(&mut next)
                    .and(prev)
                    .for_each(|next, prev| *next = prev + *next * 2.0 * dt);

                Advance {
                    history: Some(robert_asselin(now, next.view(), prev.view(), self.robert)),
                    next,
                }
            }
        }
    }

    fn commit(&mut self, history: Array2<f64>) {
        self.phase = match self.prev {
            None => Phase::FirstStep,
            Some(_) => Phase::Steady,
        };
        self.prev = Some(history);
    }
}

/// A computed step that has not been taken yet
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// Unprojected perturbation vorticity one step ahead
    pub next: Array2<f64>,
    history: Option<Array2<f64>>,
}

/// Robert-Asselin filter of the centre of the triplet `prev, now, next`
///
/// `(1 - 2r) now + r (next + prev)`
pub fn robert_asselin(
    now: ArrayView2<f64>,
    next: ArrayView2<f64>,
    prev: ArrayView2<f64>,
    r: f64,
) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros(now.raw_dim());
    Zip::from(&mut out)
        .and(now)
        .and(next)
        .and(prev)
        .for_each(|out, now, next, prev| *out = (1.0 - 2.0 * r) * now + r * (next + prev));
    out
}

/// Classical fourth order Runge-Kutta step
pub fn rk4<F>(now: ArrayView2<f64>, t: f64, dt: f64, mut tendency: F) -> Array2<f64>
where
    F: FnMut(ArrayView2<f64>, f64) -> Array2<f64>,
{
    let half = 0.5 * dt;

    let k1 = tendency(now, t);
    let k2 = tendency((&now + &(&k1 * half)).view(), t + half);
    let k3 = tendency((&now + &(&k2 * half)).view(), t + half);
    let k4 = tendency((&now + &(&k3 * dt)).view(), t + dt);

    let mut next = now.to_owned();
    Zip::from(&mut next)
        .and(&k1)
        .and(&k2)
        .and(&k3)
        .and(&k4)
        .for_each(|next, k1, k2, k3, k4| {
            *next += dt * (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0;
        });
    next
}

/// Time stepper, fixed for the lifetime of a model
#[derive(Debug, Clone, PartialEq)]
pub enum Stepper {
    Leapfrog(Leapfrog),
    Rk4,
}

impl Stepper {
    pub fn new(scheme: Scheme, robert: f64) -> Result<Self> {
        Ok(match scheme {
            Scheme::Leapfrog => Self::Leapfrog(Leapfrog::new(robert)?),
            Scheme::Rk4 => Self::Rk4,
        })
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            Self::Leapfrog(_) => Scheme::Leapfrog,
            Self::Rk4 => Scheme::Rk4,
        }
    }

    /// Computes the step after `now` given `tendency(vort, time)`. The
    /// stepper only changes once the result is passed to `commit`.
    pub fn step<F>(&self, now: ArrayView2<f64>, t: f64, dt: f64, tendency: F) -> Advance
    where
        F: FnMut(ArrayView2<f64>, f64) -> Array2<f64>,
    {
        match self {
            Self::Leapfrog(leapfrog) => leapfrog.advance(now, t, dt, tendency),
            Self::Rk4 => Advance {
                next: rk4(now, t, dt, tendency),
                history: None,
            },
        }
    }

    /// Takes a step computed by `step`, returning the new vorticity
    pub fn commit(&mut self, advance: Advance) -> Array2<f64> {
        if let (Self::Leapfrog(leapfrog), Some(history)) = (&mut *self, advance.history) {
            leapfrog.commit(history);
        }
        advance.next
    }
}

#[cfg(test)]
mod test {
    use {super::*, approx::assert_abs_diff_eq, ndarray::arr2};

    fn decay(vort: ArrayView2<f64>, _: f64) -> Array2<f64> {
        vort.mapv(|x| -x)
    }

    fn take(stepper: &mut Stepper, now: &Array2<f64>, t: f64, dt: f64) -> Array2<f64> {
        let advance = stepper.step(now.view(), t, dt, decay);
        stepper.commit(advance)
    }

    fn leapfrog(stepper: &Stepper) -> &Leapfrog {
        match stepper {
            Stepper::Leapfrog(leapfrog) => leapfrog,
            Stepper::Rk4 => panic!("expected a leapfrog stepper"),
        }
    }

    #[test]
    fn scheme_names() {
        assert_eq!(Scheme::Rk4, "rk4".parse().unwrap());
        assert_eq!(Scheme::Leapfrog, "Leapfrog".parse().unwrap());
        assert!(matches!("euler".parse::<Scheme>(), Err(Error::Config(_))));
        assert_eq!("leapfrog", Scheme::Leapfrog.to_string());
    }

    #[test]
    fn robert_coefficient_range() {
        assert!(Stepper::new(Scheme::Leapfrog, 0.5).is_err());
        assert!(Stepper::new(Scheme::Leapfrog, -0.1).is_err());
        assert!(Stepper::new(Scheme::Leapfrog, 0.2).is_ok());
        // Unused by RK4
        assert!(Stepper::new(Scheme::Rk4, 0.5).is_ok());
    }

    #[test]
    fn leapfrog_first_step_is_forward_euler() {
        let now = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let dt = 0.5;
        let mut stepper = Stepper::new(Scheme::Leapfrog, 0.2).unwrap();

        let advance = stepper.step(now.view(), 0.0, dt, |vort, _| vort.mapv(|x| x * x));
        let next = stepper.commit(advance);

        let expected = &now + &(now.mapv(|x| x * x) * dt);
        assert_eq!(expected, next);

        assert_eq!(Phase::FirstStep, leapfrog(&stepper).phase());
        // Unfiltered history
        assert_eq!(Some(&now), leapfrog(&stepper).history());
    }

    #[test]
    fn uncommitted_steps_leave_leapfrog_unchanged() {
        let mut stepper = Stepper::new(Scheme::Leapfrog, 0.2).unwrap();
        let v0 = arr2(&[[1.0]]);

        let first = stepper.step(v0.view(), 0.0, 0.1, decay);
        assert_eq!(Phase::Uninitialized, leapfrog(&stepper).phase());
        assert!(leapfrog(&stepper).history().is_none());

        // Retrying after a discarded step repeats the forward step
        let v1 = take(&mut stepper, &v0, 0.0, 0.1);
        assert_eq!(first.next, v1);
        let history = leapfrog(&stepper).history().cloned();

        let _ = stepper.step(v1.view(), 0.1, 0.1, decay);
        assert_eq!(Phase::FirstStep, leapfrog(&stepper).phase());
        assert_eq!(history.as_ref(), leapfrog(&stepper).history());
    }

    #[test]
    fn leapfrog_later_steps_are_centred_and_filtered() {
        let r = 0.2;
        let dt = 0.1;
        let mut stepper = Stepper::new(Scheme::Leapfrog, r).unwrap();
        let v0 = arr2(&[[1.0]]);
        let v1 = take(&mut stepper, &v0, 0.0, dt);
        let v2 = take(&mut stepper, &v1, dt, dt);

        // Centred difference from the unfiltered first history
        assert_abs_diff_eq!(1.0 - 2.0 * dt * v1[[0, 0]], v2[[0, 0]], epsilon = 1.0E-15);
        assert_eq!(Phase::Steady, leapfrog(&stepper).phase());

        let filtered = (1.0 - 2.0 * r) * v1[[0, 0]] + r * (v2[[0, 0]] + 1.0);
        assert_abs_diff_eq!(
            filtered,
            leapfrog(&stepper).history().unwrap()[[0, 0]],
            epsilon = 1.0E-15
        );
    }

    #[test]
    fn robert_filter_lies_inside_oscillation() {
        let prev = arr2(&[[1.0, -2.0]]);
        let now = arr2(&[[-1.0, 2.0]]);
        let next = arr2(&[[1.0, -2.0]]);

        for &r in &[0.01, 0.1, 0.2, 0.3, 0.49] {
            let filtered = robert_asselin(now.view(), next.view(), prev.view(), r);

            assert_abs_diff_eq!(-1.0 + 4.0 * r, filtered[[0, 0]], epsilon = 1.0E-15);
            assert!(filtered[[0, 0]] > -1.0 && filtered[[0, 0]] < 1.0);
            assert!(filtered[[0, 1]] > -2.0 && filtered[[0, 1]] < 2.0);
        }
    }

    #[test]
    fn rk4_exponential_decay() {
        let mut stepper = Stepper::new(Scheme::Rk4, 0.0).unwrap();
        let dt = 0.1;
        let mut vort = arr2(&[[1.0]]);
        let mut t = 0.0;

        for _ in 0..10 {
            vort = take(&mut stepper, &vort, t, dt);
            t += dt;
        }

        // Fourth order: global error ~ dt^4
        assert_abs_diff_eq!((-1.0f64).exp(), vort[[0, 0]], epsilon = 1.0E-6);
    }

    #[test]
    fn rk4_stage_times() {
        let mut times = vec![];
        let now = arr2(&[[0.0]]);

        rk4(now.view(), 10.0, 2.0, |v, t| {
            times.push(t);
            v.to_owned()
        });

        assert_eq!(vec![10.0, 11.0, 11.0, 12.0], times);
    }

    #[test]
    fn rk4_explicit_time_dependence() {
        // dv/dt = t^3 is integrated exactly
        let now = arr2(&[[0.0]]);
        let next = rk4(now.view(), 0.0, 2.0, |v, t| Array2::from_elem(v.raw_dim(), t.powi(3)));

        assert_abs_diff_eq!(4.0, next[[0, 0]], epsilon = 1.0E-12);
    }
}
