//! RODAS4 - 6-stage, order 4(3), L-stable Rosenbrock integrator
//!
//! Stiffly accurate: the last two stages coincide with the solution, so the
//! embedded error estimate is the sixth stage increment itself.
//!
//! Reference
//! - E. Hairer and G. Wanner, "Solving Ordinary Differential Equations II.
//!   Stiff and Differential-Algebraic Problems", 2nd ed., Springer (1996),
//!   Section IV.7.

use crate::{
    core::{
        interpolate::CubicHermite,
        ode::Jacobian,
        solout::{ControlFlag, SolOut},
        solution::{IntegrationResult, Steps},
        status::Status,
    },
    error::Result,
    matrix::Lu,
    methods::{
        fixed::fixed_steps,
        hinit::hinit,
        settings::{error_norm, Defaults, Settings, Tolerance},
    },
    real::{ratio, Real},
};

const DEFAULTS: Defaults = Defaults {
    safety_factor: 0.9,
    scale_min: 0.2,
    scale_max: 6.0,
    beta: 0.0,
};

/// Consecutive singular iteration matrices tolerated before giving up.
const MAX_SINGULAR: usize = 5;

/// RODAS4 with adaptive step-size control and optional dense output.
///
/// Each step factorizes `E = I/(h*gamma) - J` once and solves six linear
/// systems with it. The Jacobian is evaluated at the start of the
/// integration and after every accepted step; rejected steps reuse it.
/// A singular `E` halves the step; after five such failures the
/// integration stops with [`Status::SingularMatrix`].
///
/// Dense output is the cubic Hermite interpolant through both step
/// endpoints and their derivatives, which the method evaluates anyway.
pub fn rodas4<T, F, S>(
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
    F: Jacobian<T>,
    S: SolOut<T>,
{
    let control = settings.resolve(x, xend, &DEFAULTS)?;

    let n = y.len();
    let mut work = Stages::new(n);
    let mut jac = f.jac_matrix(n);
    let mut dfdx = vec![T::zero(); n];
    let mut f0 = vec![T::zero(); n];
    let mut f1 = vec![T::zero(); n];
    let mut steps = Steps::default();
    let mut nlu = 0;
    let mut nsing = 0;
    let mut last = false;
    let mut reject = false;
    let mut fresh_jac = true;
    let posneg = (xend - x).signum();

    f.ode(x, y, &mut f0);
    let mut h = match control.h0 {
        Some(h0) => h0.abs() * posneg,
        None => hinit(
            f,
            x,
            y,
            posneg,
            &f0,
            &mut f1,
            &mut work.ynew,
            4,
            control.hmax,
            &atol,
            &rtol,
        ),
    };
    if h.abs() > control.hmax {
        h = posneg * control.hmax;
    }

    if solout.solout::<CubicHermite<T>>(x, x, y, None) == ControlFlag::Interrupt {
        let mut res = IntegrationResult::new(x, h, Status::Interrupted, steps);
        res.nlu = nlu;
        return Ok(res);
    }

    let status = loop {
        if steps.total >= control.nmax {
            break Status::NeedLargerNmax;
        }

        if T::lit(0.1) * h.abs() <= x.abs() * control.uround {
            break Status::StepSizeTooSmall;
        }

        if (x + T::lit(1.01) * h - xend) * posneg > T::zero() {
            h = xend - x;
            last = true;
        }

        if fresh_jac {
            jac.fill_zero();
            f.jac(x, y, &mut jac, &mut dfdx);
            fresh_jac = false;
        }

        steps.total += 1;

        let fac = (h * work.coef.gamma).recip();
        nlu += 1;
        let lu = match jac.shifted_identity(fac).lu() {
            Some(lu) => lu,
            None => {
                nsing += 1;
                if nsing >= MAX_SINGULAR {
                    break Status::SingularMatrix;
                }
                h *= T::lit(0.5);
                reject = true;
                last = false;
                continue;
            }
        };

        work.advance(f, x, h, y, &f0, &dfdx, &lu);
        let err = error_norm(&work.k[5], y, &work.ynew, &atol, &rtol);

        let fac = control.facc2.max(
            control
                .facc1
                .min(err.powf(T::lit(0.25)) / control.safety_factor),
        );
        let mut hnew = h / fac;

        if err <= T::one() {
            steps.accepted += 1;
            let xph = x + h;
            f.ode(xph, &work.ynew, &mut f1);

            let xold = x;
            x = if last { xend } else { xph };

            let flag = if dense_output {
                let interpolator = CubicHermite::new(xold, h, y, &work.ynew, &f0, &f1);
                solout.solout(xold, x, &work.ynew, Some(&interpolator))
            } else {
                solout.solout::<CubicHermite<T>>(xold, x, &work.ynew, None)
            };

            y.copy_from_slice(&work.ynew);
            std::mem::swap(&mut f0, &mut f1);
            fresh_jac = true;

            if flag == ControlFlag::Interrupt {
                break Status::Interrupted;
            }

            if last {
                h = hnew;
                break Status::Success;
            }

            if hnew.abs() > control.hmax {
                hnew = posneg * control.hmax;
            }
            if reject {
                hnew = posneg * hnew.abs().min(h.abs());
            }
            reject = false;
        } else {
            reject = true;
            last = false;
            if steps.accepted >= 1 {
                steps.rejected += 1;
            }
        }
        h = hnew;
    };

    let mut res = IntegrationResult::new(x, h, status, steps);
    res.nlu = nlu;
    Ok(res)
}

/// RODAS4 with a constant step `h`. The Jacobian is re-evaluated and the
/// iteration matrix refactorized on every step; a singular matrix ends the
/// integration with [`Status::SingularMatrix`].
pub fn rodas4_fixed<T, F, S>(
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
    F: Jacobian<T>,
    S: SolOut<T>,
{
    let control = settings.resolve(x, xend, &DEFAULTS)?;

    let n = y.len();
    let mut work = Stages::new(n);
    let mut jac = f.jac_matrix(n);
    let mut dfdx = vec![T::zero(); n];
    let mut f0 = vec![T::zero(); n];
    let mut nlu = 0;
    let fac = (h * work.coef.gamma).recip();

    let mut res = fixed_steps(x, xend, y, h, control.nmax, solout, |x, h, y| {
        f.ode(x, y, &mut f0);
        jac.fill_zero();
        f.jac(x, y, &mut jac, &mut dfdx);
        nlu += 1;
        let lu = jac.shifted_identity(fac).lu().ok_or(Status::SingularMatrix)?;
        work.advance(f, x, h, y, &f0, &dfdx, &lu);
        y.copy_from_slice(&work.ynew);
        Ok(())
    })?;
    res.nlu = nlu;
    Ok(res)
}

/// Stage increments of one RODAS4 step.
struct Stages<T: Real> {
    k: Vec<Vec<T>>,
    u: Vec<T>,
    fs: Vec<T>,
    ynew: Vec<T>,
    coef: Coefficients<T>,
}

impl<T: Real> Stages<T> {
    fn new(n: usize) -> Self {
        Self {
            k: vec![vec![T::zero(); n]; 6],
            u: vec![T::zero(); n],
            fs: vec![T::zero(); n],
            ynew: vec![T::zero(); n],
            coef: Coefficients::new(),
        }
    }

    /// Solve the six stage systems and form `ynew`.
    ///
    /// Stage `s` solves `E k_s = f(x + alpha_s h, y + sum a_sj k_j)
    /// + sum (c_sj / h) k_j + h d_s dfdx` with `f0 = f(x, y)` standing in
    /// for the first evaluation.
    fn advance<F: Jacobian<T>>(
        &mut self,
        f: &mut F,
        x: T,
        h: T,
        y: &[T],
        f0: &[T],
        dfdx: &[T],
        lu: &Lu<T>,
    ) {
        let n = y.len();
        let c = &self.coef;
        for s in 0..6 {
            if s == 0 {
                self.fs.copy_from_slice(f0);
            } else {
                for i in 0..n {
                    let mut ui = y[i];
                    for j in 0..s {
                        ui += c.a[s][j] * self.k[j][i];
                    }
                    self.u[i] = ui;
                }
                f.ode(x + c.alpha[s] * h, &self.u, &mut self.fs);
            }

            let hd = h * c.d[s];
            for i in 0..n {
                let mut rhs = self.fs[i] + hd * dfdx[i];
                for j in 0..s {
                    rhs += c.c[s][j] / h * self.k[j][i];
                }
                self.fs[i] = rhs;
            }
            lu.solve_mut(&mut self.fs);
            self.k[s].copy_from_slice(&self.fs);
        }

        for i in 0..n {
            let mut yi = y[i];
            for (j, m) in c.m.iter().enumerate() {
                yi += *m * self.k[j][i];
            }
            self.ynew[i] = yi;
        }
    }
}

/// The RODAS4 coefficients in the working precision.
struct Coefficients<T: Real> {
    gamma: T,
    alpha: [T; 6],
    d: [T; 6],
    a: [[T; 6]; 6],
    c: [[T; 6]; 6],
    m: [T; 6],
}

impl<T: Real> Coefficients<T> {
    fn new() -> Self {
        Self {
            gamma: ratio(GAMMA),
            alpha: ALPHA.map(ratio),
            d: D.map(T::lit),
            a: A.map(|row| row.map(T::lit)),
            c: C.map(|row| row.map(T::lit)),
            m: M.map(T::lit),
        }
    }
}

// RODAS4 coefficients (Hairer & Wanner, rodas.f). The diagonal and the
// nodes are exact `(p, q)` fractions; the rest are published to double
// precision only.
const GAMMA: (i64, i64) = (1, 4);

const ALPHA: [(i64, i64); 6] = [(0, 1), (386, 1000), (21, 100), (63, 100), (1, 1), (1, 1)];

/// Row sums of the full Gamma matrix, multiplying `h * df/dx`.
const D: [f64; 6] = [0.25, -0.1043, 0.1035, -0.03620000000000023, 0.0, 0.0];

#[rustfmt::skip]
const A: [[f64; 6]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.1544000000000000e+01, 0.0, 0.0, 0.0, 0.0, 0.0],
    [0.9466785280815826e+00, 0.2557011698983284e+00, 0.0, 0.0, 0.0, 0.0],
    [0.3314825187068521e+01, 0.2896124015972201e+01, 0.9986419139977817e+00, 0.0, 0.0, 0.0],
    [0.1221224509226641e+01, 0.6019134481288629e+01, 0.1253708332932087e+02, -0.6878860361058950e+00, 0.0, 0.0],
    [0.1221224509226641e+01, 0.6019134481288629e+01, 0.1253708332932087e+02, -0.6878860361058950e+00, 1.0, 0.0],
];

#[rustfmt::skip]
const C: [[f64; 6]; 6] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-0.5668800000000000e+01, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-0.2430093356833875e+01, -0.2063599157091915e+00, 0.0, 0.0, 0.0, 0.0],
    [-0.1073529058151375e+00, -0.9594562251023355e+01, -0.2047028614809616e+02, 0.0, 0.0, 0.0],
    [ 0.7496443313967647e+01, -0.1024680431464352e+02, -0.3399990352819905e+02,  0.1170890893206160e+02, 0.0, 0.0],
    [ 0.8083246795921522e+01, -0.7981132988064893e+01, -0.3152159432874371e+02,  0.1631930543123136e+02, -0.6058818238834054e+01, 0.0],
];

/// Solution weights; the embedded solution drops the last stage.
const M: [f64; 6] = [
    0.1221224509226641e+01,
    0.6019134481288629e+01,
    0.1253708332932087e+02,
    -0.6878860361058950e+00,
    1.0,
    1.0,
];
