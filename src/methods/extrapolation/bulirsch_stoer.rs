//! Gragg-Bulirsch-Stoer extrapolation with order and step-size control.
//!
//! Each step runs the modified midpoint rule with `n_k = 2(k+1)` substeps
//! for `k = 0..=order+1` and Richardson-extrapolates the results to zero
//! substep size. The difference between the two most extrapolated entries
//! of each tableau row is the error estimate for that order.
//!
//! With dense output the states halfway through the step are extrapolated
//! as well (from the sequences whose midpoint falls on an even substep), and
//! the step is also held to the accuracy of the cubic Hermite interpolant
//! against that midpoint.
//!
//! References
//! - W. H. Press et al., "Numerical Recipes", 3rd ed., Cambridge University
//!   Press (2007), Section 17.3.2.
//! - P. Deuflhard, "Order and stepsize control in extrapolation methods",
//!   Numerische Mathematik 41 (1983), 399-422.

use crate::{
    core::{
        interpolate::CubicHermite,
        ode::ODE,
        solout::{ControlFlag, SolOut},
        solution::{IntegrationResult, Steps},
        status::Status,
    },
    error::{Error, Result},
    methods::{
        fixed::fixed_steps,
        hinit::hinit,
        settings::{Control, Defaults, Settings, Tolerance},
    },
    real::{ratio, Real},
};

const DEFAULTS: Defaults = Defaults {
    safety_factor: 0.9,
    scale_min: 0.01,
    scale_max: 100.0,
    beta: 0.0,
};

/// Order the adaptive integration starts with and the fixed-step flavour uses.
const INITIAL_ORDER: usize = 3;
const DEFAULT_MAX_ORDER: usize = 10;

/// Share of `atol + rtol |y|` the local error of one step may use.
const LOCAL_TOLERANCE: (i64, i64) = (1, 20);

/// Bulirsch–Stoer with adaptive step size and order.
///
/// The order starts at 3 and moves by at most one per accepted step,
/// towards whichever neighbour promises the least work per unit step
/// (`settings.max_order` bounds it, default 10). A step is accepted when no
/// species of the highest tableau row deviates by more than a twentieth of
/// its `atol + rtol |y|` envelope. Dense output uses
/// the cubic Hermite interpolant through the step endpoints, and a step is
/// only accepted once that interpolant matches the extrapolated midpoint
/// state within `atol + rtol |y|`.
pub fn bulirsch_stoer<T, F, S>(
    f: &mut F,
    mut x: T,
    xend: T,
    y: &mut [T],
    rtol: Tolerance<T>,
    atol: Tolerance<T>,
    solout: &mut S,
    dense_output: bool,
    settings: &Settings<T>,
) -> Result<IntegrationResult<T>>
where
    T: Real,
    F: ODE<T>,
    S: SolOut<T>,
{
    let control = settings.resolve(x, xend, &DEFAULTS)?;
    let max_order = max_order(settings)?;

    let n = y.len();
    let mut order = INITIAL_ORDER.min(max_order);
    let mut f0 = vec![T::zero(); n];
    let mut f1 = vec![T::zero(); n];
    let mut steps = Steps::default();
    let mut last = false;
    let mut reject = false;
    let posneg = (xend - x).signum();

    f.ode(x, y, &mut f0);
    let mut h = match control.h0 {
        Some(h0) => h0.abs() * posneg,
        None => {
            let mut y1 = vec![T::zero(); n];
            hinit(
                f,
                x,
                y,
                posneg,
                &f0,
                &mut f1,
                &mut y1,
                2 * order + 1,
                control.hmax,
                &atol,
                &rtol,
            )
        }
    };
    if h.abs() > control.hmax {
        h = posneg * control.hmax;
    }

    let mut tableau = Tableau::new(n, max_order, Some((atol, rtol)));

    if solout.solout::<CubicHermite<T>>(x, x, y, None) == ControlFlag::Interrupt {
        return Ok(IntegrationResult::new(x, h, Status::Interrupted, steps));
    }

    let status = loop {
        if steps.total >= control.nmax {
            break Status::NeedLargerNmax;
        }

        if !h.is_finite() || T::lit(0.1) * h.abs() <= x.abs() * control.uround {
            break Status::StepSizeTooSmall;
        }

        if (x + T::lit(1.01) * h - xend) * posneg > T::zero() {
            h = xend - x;
            last = true;
        }

        steps.total += 1;
        let converged = tableau.step(f, x, h, order, y, &f0);

        if converged {
            let xph = x + h;
            f.ode(xph, &tableau.ynew, &mut f1);

            let mut hcap = None;
            if dense_output {
                let errint = tableau.interpolation_error(h, order + 1, y, &f0, &f1);
                let fac = hermite_factor(errint, &control);
                if !(errint <= T::one()) {
                    h *= fac;
                    reject = true;
                    last = false;
                    if steps.accepted >= 1 {
                        steps.rejected += 1;
                    }
                    continue;
                }
                hcap = Some(h.abs() * fac);
            }
            steps.accepted += 1;

            let xold = x;
            x = if last { xend } else { xph };

            let flag = if dense_output {
                let interpolator = CubicHermite::new(xold, h, y, &tableau.ynew, &f0, &f1);
                solout.solout(xold, x, &tableau.ynew, Some(&interpolator))
            } else {
                solout.solout::<CubicHermite<T>>(xold, x, &tableau.ynew, None)
            };

            y.copy_from_slice(&tableau.ynew);
            std::mem::swap(&mut f0, &mut f1);

            if flag == ControlFlag::Interrupt {
                break Status::Interrupted;
            }

            if last {
                h *= step_factor(tableau.errors[order], order, &control);
                break Status::Success;
            }

            let mut hnew = h;
            order = control_order(&tableau.errors, order, max_order, &mut hnew, &control);
            if hnew.abs() > control.hmax {
                hnew = posneg * control.hmax;
            }
            if let Some(cap) = hcap {
                hnew = posneg * hnew.abs().min(cap);
            }
            if reject {
                hnew = posneg * hnew.abs().min(h.abs());
            }
            reject = false;
            h = hnew;
        } else {
            h *= step_factor(tableau.errors[order], order, &control);
            reject = true;
            last = false;
            if steps.accepted >= 1 {
                steps.rejected += 1;
            }
        }
    };

    Ok(IntegrationResult::new(x, h, status, steps))
}

/// Bulirsch–Stoer with a constant step `h` and a fixed extrapolation order
/// of 3 (capped by `settings.max_order`). No error estimate is computed.
pub fn bulirsch_stoer_fixed<T, F, S>(
    f: &mut F,
    x: T,
    xend: T,
    y: &mut [T],
    h: T,
    solout: &mut S,
    settings: &Settings<T>,
) -> Result<IntegrationResult<T>>
where
    T: Real,
    F: ODE<T>,
    S: SolOut<T>,
{
    let control = settings.resolve(x, xend, &DEFAULTS)?;
    let order = INITIAL_ORDER.min(max_order(settings)?);

    let n = y.len();
    let mut tableau = Tableau::new(n, order, None);
    let mut f0 = vec![T::zero(); n];

    fixed_steps(x, xend, y, h, control.nmax, solout, |x, h, y| {
        f.ode(x, y, &mut f0);
        tableau.step(f, x, h, order, y, &f0);
        y.copy_from_slice(&tableau.ynew);
        Ok(())
    })
}

fn max_order<T: Real>(settings: &Settings<T>) -> Result<usize> {
    match settings.max_order {
        Some(0) => Err(Error::InvalidConfig(
            "max_order must be at least 1".to_string(),
        )),
        Some(k) => Ok(k),
        None => Ok(DEFAULT_MAX_ORDER),
    }
}

/// Substep count of the `k`-th midpoint sequence.
fn compute_n(k: usize) -> usize {
    2 * (k + 1)
}

/// Right-hand side evaluations needed to fill tableau rows `0..=k`.
fn compute_work(k: usize) -> usize {
    2 * (k + 1) + k * (k + 1)
}

/// Step-size multiplier for a scaled error `err` at extrapolation order `k`
/// (Deuflhard, eq. 2.14), clamped to `[1/facc1, 1/facc2]`.
fn step_factor<T: Real>(err: T, k: usize, control: &Control<T>) -> T {
    if err > T::zero() {
        (control.safety_factor / err.powf(T::one() / T::int(2 * k as i64 + 1)))
            .max(control.facc1.recip())
            .min(control.facc2.recip())
    } else if err == T::zero() {
        T::int(2)
    } else {
        // NaN
        T::lit(0.5)
    }
}

/// Step-size multiplier for a scaled Hermite interpolation error, which
/// scales with `h^4`.
fn hermite_factor<T: Real>(err: T, control: &Control<T>) -> T {
    if err > T::zero() {
        (control.safety_factor / err.powf(T::lit(0.25)))
            .max(control.facc1.recip())
            .min(control.facc2.recip())
    } else if err == T::zero() {
        control.facc2.recip()
    } else {
        T::lit(0.5)
    }
}

/// Choose the next order from the work per unit step of orders `k-1` and
/// `k` and scale `h` accordingly (Numerical Recipes, eqs. 17.3.14-15).
fn control_order<T: Real>(
    errors: &[T],
    k: usize,
    max_order: usize,
    h: &mut T,
    control: &Control<T>,
) -> usize {
    let fac = step_factor(errors[k], k, control);
    if k == 0 {
        *h *= fac;
        return k;
    }

    let fac_lower = step_factor(errors[k - 1], k - 1, control);
    let work = T::int(compute_work(k) as i64);
    let work_per_step = work / (h.abs() * fac);
    let work_lower = T::int(compute_work(k - 1) as i64);
    let work_per_step_lower = work_lower / (h.abs() * fac_lower);

    if work_per_step_lower < T::lit(0.8) * work_per_step && k > 1 {
        *h *= fac_lower;
        k - 1
    } else if work_per_step < T::lit(0.98) * work_per_step_lower && k < max_order {
        let work_higher = T::int(compute_work(k + 1) as i64);
        *h *= fac * work_higher / work;
        k + 1
    } else {
        *h *= fac;
        k
    }
}

/// Modified midpoint buffers.
struct Midpoint<T: Real> {
    zi: Vec<T>,
    zip1: Vec<T>,
    fi: Vec<T>,
}

impl<T: Real> Midpoint<T> {
    /// Gragg's modified midpoint rule over `[x, x + h]` with `n` substeps,
    /// including the final smoothing step. The unsmoothed state after `n/2`
    /// substeps lands in `half`.
    fn run<F: ODE<T>>(
        &mut self,
        f: &mut F,
        x: T,
        h: T,
        n: usize,
        y: &[T],
        f0: &[T],
        out: &mut [T],
        half: &mut [T],
    ) {
        let dim = y.len();
        let sub = h / T::int(n as i64);
        let two_sub = T::int(2) * sub;

        for i in 0..dim {
            self.zi[i] = y[i];
            self.zip1[i] = y[i] + sub * f0[i];
        }
        for m in 1..n {
            std::mem::swap(&mut self.zi, &mut self.zip1);
            if 2 * m == n {
                half.copy_from_slice(&self.zi);
            }
            f.ode(x + T::int(m as i64) * sub, &self.zi, &mut self.fi);
            for i in 0..dim {
                self.zip1[i] += two_sub * self.fi[i];
            }
        }
        f.ode(x + h, &self.zip1, &mut self.fi);
        for i in 0..dim {
            out[i] = T::lit(0.5) * (self.zi[i] + self.zip1[i] + sub * self.fi[i]);
        }
    }
}

/// Extrapolation tableau sized for orders up to `max_order`.
struct Tableau<T: Real> {
    /// `rows[k][j]`: entry `T_{k,j}`, `j <= k`.
    rows: Vec<Vec<Vec<T>>>,
    /// `halves[k]`: state at `x + h/2` of the `k`-th midpoint sequence.
    halves: Vec<Vec<T>>,
    mid: Midpoint<T>,
    /// Worst scaled species error of rows `1..=order+1`, filled in adaptive
    /// mode.
    errors: Vec<T>,
    ynew: Vec<T>,
    tol: Option<(Tolerance<T>, Tolerance<T>)>,
}

impl<T: Real> Tableau<T> {
    fn new(n: usize, max_order: usize, tol: Option<(Tolerance<T>, Tolerance<T>)>) -> Self {
        let rows = (0..max_order + 2)
            .map(|k| vec![vec![T::zero(); n]; k + 1])
            .collect();
        Self {
            rows,
            halves: vec![vec![T::zero(); n]; max_order + 2],
            mid: Midpoint {
                zi: vec![T::zero(); n],
                zip1: vec![T::zero(); n],
                fi: vec![T::zero(); n],
            },
            errors: Vec::with_capacity(max_order + 1),
            ynew: vec![T::zero(); n],
            tol,
        }
    }

    /// One extrapolated step of size `h`, result in `ynew`. Returns whether
    /// the highest row met the tolerances (always `true` without them).
    fn step<F: ODE<T>>(
        &mut self,
        f: &mut F,
        x: T,
        h: T,
        order: usize,
        y: &[T],
        f0: &[T],
    ) -> bool {
        for k in 0..=order + 1 {
            let nk = compute_n(k);
            let (prev, cur) = self.rows.split_at_mut(k);
            let cur = &mut cur[0];
            self.mid.run(f, x, h, nk, y, f0, &mut cur[0], &mut self.halves[k]);

            for j in 0..k {
                let ratio = T::int(nk as i64) / T::int(compute_n(k - j - 1) as i64);
                let denom = ratio * ratio - T::one();
                let below = &prev[k - 1][j];
                let (lo, hi) = cur.split_at_mut(j + 1);
                let tj = &lo[j];
                for i in 0..y.len() {
                    hi[0][i] = tj[i] + (tj[i] - below[i]) / denom;
                }
            }
        }

        let top = order + 1;
        self.ynew.copy_from_slice(&self.rows[top][top]);

        let Some((atol, rtol)) = &self.tol else {
            return true;
        };

        let share: T = ratio(LOCAL_TOLERANCE);
        self.errors.clear();
        for k in 1..=top {
            let row = &self.rows[k];
            let (yk, yalt) = (&row[k - 1], &row[k]);
            let mut worst = T::zero();
            for i in 0..y.len() {
                let scale = share * (atol[i] + rtol[i] * yk[i].abs().max(yalt[i].abs()));
                let d = ((yk[i] - yalt[i]) / scale).abs();
                // NaN sticks and rejects the step
                if !(d <= worst) {
                    worst = d;
                }
            }
            self.errors.push(worst);
        }

        self.errors[order] < T::one()
    }

    /// Worst scaled deviation between the cubic Hermite interpolant of the
    /// last step and the extrapolated state at `x + h/2`. Only sequences
    /// `k = 1, 3, 5, ...` up to `top` enter, their midpoint substep count
    /// `n_k / 2` being even. `ynew` must hold the step result.
    fn interpolation_error(&mut self, h: T, top: usize, y: &[T], f0: &[T], f1: &[T]) -> T {
        let ks: Vec<usize> = (1..=top).step_by(2).collect();
        // Aitken-Neville in place, column by column
        for j in 1..ks.len() {
            for i in (j..ks.len()).rev() {
                let ratio =
                    T::int(compute_n(ks[i]) as i64) / T::int(compute_n(ks[i - j]) as i64);
                let denom = ratio * ratio - T::one();
                let (lo, hi) = self.halves.split_at_mut(ks[i]);
                let below = &lo[ks[i - 1]];
                for (t, b) in hi[0].iter_mut().zip(below) {
                    *t += (*t - *b) / denom;
                }
            }
        }
        let Some(&kmid) = ks.last() else {
            return T::zero();
        };
        let Some((atol, rtol)) = &self.tol else {
            return T::zero();
        };

        let half = T::lit(0.5);
        let eighth = T::lit(0.125);
        let mut worst = T::zero();
        for i in 0..y.len() {
            let hermite = half * (y[i] + self.ynew[i]) + eighth * h * (f0[i] - f1[i]);
            let scale = atol[i] + rtol[i] * y[i].abs().max(self.ynew[i].abs());
            let d = ((hermite - self.halves[kmid][i]) / scale).abs();
            if !(d <= worst) {
                worst = d;
            }
        }
        worst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{interpolate::Interpolate, solout::NoOutput};

    #[test]
    fn work_is_cumulative_substeps() {
        for k in 0..6 {
            assert_eq!(compute_work(k), (0..=k).map(compute_n).sum::<usize>());
        }
    }

    struct Grow;

    impl ODE<f64> for Grow {
        fn ode(&mut self, _x: f64, y: &[f64], dydx: &mut [f64]) {
            dydx[0] = y[0];
        }
    }

    /// y' = cos(x): exercises the explicit x-dependence of the midpoint rule.
    struct Forced;

    impl ODE<f64> for Forced {
        fn ode(&mut self, x: f64, _y: &[f64], dydx: &mut [f64]) {
            dydx[0] = x.cos();
        }
    }

    #[test]
    fn exponential_to_high_precision() {
        let mut y = [1.0];
        let res = bulirsch_stoer(
            &mut Grow,
            0.0,
            3.5,
            &mut y,
            Tolerance::Scalar(1e-13),
            Tolerance::Scalar(0.0),
            &mut NoOutput,
            false,
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.x, 3.5);
        assert!((y[0] / 3.5_f64.exp() - 1.0).abs() < 1e-12, "{}", y[0]);
    }

    #[test]
    fn time_dependent_rhs() {
        let mut y = [0.0];
        bulirsch_stoer(
            &mut Forced,
            0.0,
            2.0,
            &mut y,
            Tolerance::Scalar(1e-12),
            Tolerance::Scalar(1e-12),
            &mut NoOutput,
            false,
            &Settings::default(),
        )
        .unwrap();
        assert!((y[0] - 2.0_f64.sin()).abs() < 1e-10);
    }

    /// Largest relative error of the step interpolants at each step midpoint.
    struct MidpointError(f64);

    impl SolOut<f64> for MidpointError {
        fn solout<I: Interpolate<f64>>(
            &mut self,
            xold: f64,
            x: f64,
            _y: &[f64],
            interpolator: Option<&I>,
        ) -> ControlFlag {
            if let Some(interp) = interpolator {
                let t = 0.5 * (xold + x);
                let mut yi = [0.0];
                interp.interpolate(t, &mut yi);
                self.0 = self.0.max((yi[0] / t.exp() - 1.0).abs());
            }
            ControlFlag::Continue
        }
    }

    #[test]
    fn dense_steps_keep_the_interpolant_accurate() {
        let mut y = [1.0];
        let mut midpoints = MidpointError(0.0);
        let res = bulirsch_stoer(
            &mut Grow,
            0.0,
            3.5,
            &mut y,
            Tolerance::Scalar(1e-10),
            Tolerance::Scalar(0.0),
            &mut midpoints,
            true,
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(res.status, Status::Success);
        assert!(midpoints.0 < 1e-9, "midpoint error {}", midpoints.0);
        assert!((y[0] / 3.5_f64.exp() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn midpoint_states_extrapolate_to_the_solution() {
        let tol = Some((Tolerance::Scalar(1.0), Tolerance::Scalar(0.0)));
        let mut tableau = Tableau::new(1, 5, tol);
        let (y, f0) = ([1.0], [1.0]);
        let h = 0.5;
        tableau.step(&mut Grow, 0.0, h, 4, &y, &f0);
        let f1 = [tableau.ynew[0]];
        tableau.interpolation_error(h, 5, &y, &f0, &f1);
        assert!((tableau.halves[5][0] - 0.25_f64.exp()).abs() < 1e-9);
    }

    #[test]
    fn fixed_step_single_update() {
        let mut y = [1.0];
        let res = bulirsch_stoer_fixed(
            &mut Grow,
            0.0,
            0.5,
            &mut y,
            1.0,
            &mut NoOutput,
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(res.steps.accepted, 1);
        assert!((y[0] - 1.0_f64.exp()).abs() < 1e-6);
    }

    #[test]
    fn zero_max_order_is_rejected() {
        let mut y = [1.0];
        let settings = Settings::builder().max_order(0).build();
        let err = bulirsch_stoer_fixed(&mut Grow, 0.0, 1.0, &mut y, 0.1, &mut NoOutput, &settings)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
