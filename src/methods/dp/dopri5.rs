//! DOPRI5 - Dormand–Prince 5(4) explicit Runge–Kutta integrator
//!
//! Reference
//! - E. Hairer, S. P. Nørsett, and G. Wanner, "Solving Ordinary Differential
//!   Equations I. Nonstiff Problems", 2nd ed., Springer (1993).

use crate::{
    core::{
        interpolate::Interpolate,
        ode::ODE,
        solout::{ControlFlag, SolOut},
        solution::{IntegrationResult, Steps},
        status::Status,
    },
    error::Result,
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
    scale_max: 10.0,
    beta: 0.04,
};

/// Dormand-Prince DOPRI5, an explicit embedded Runge–Kutta 5(4) solver with
/// adaptive step-size control and optional dense output.
///
/// Integrates `y' = f(x, y)` from `x` to `xend`, advancing `y` in place. The
/// last step is clipped so the integration ends exactly on `xend`.
///
/// # Arguments
///
/// - `f`: Right‑hand side implementing `ODE`.
/// - `x`, `xend`: Integration interval; `xend < x` integrates backwards.
/// - `y`: Initial state; on success contains the state at `xend`.
/// - `rtol`, `atol`: Relative and absolute tolerances (see [`Tolerance`]).
/// - `solout`: Observer called before the first step and after every accepted
///   step. With `dense_output` it receives a [`Dp5Dense`] interpolant.
/// - `settings`: see [`Settings`]. Defaults: `safety_factor = 0.9`,
///   `scale_min = 0.2`, `scale_max = 10`, `beta = 0.04`, `nmax = 100_000`,
///   stiffness test every `nstiff = 1000` accepted steps.
///
/// # Returns
/// The final abscissa, the proposed next step and the step statistics, or an
/// [`Error`](crate::Error) if the settings are invalid.
pub fn dopri5<T, F, S>(
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

    // --- Declarations ---
    let n = y.len();
    let mut work = Stages::new(n);
    let mut cont = vec![T::zero(); 5 * n];
    let mut facold = T::lit(1e-4);
    let mut last = false;
    let mut reject = false;
    let mut nonstiff = 0;
    let mut iasti = 0;
    let mut hlamb = T::zero();
    let mut steps = Steps::default();
    let expo1 = T::lit(0.2) - control.beta * T::lit(0.75);
    let posneg = (xend - x).signum();

    // --- Initializations ---
    f.ode(x, y, &mut work.k1);
    let mut h = match control.h0 {
        Some(h0) => h0.abs() * posneg,
        None => hinit(
            f,
            x,
            y,
            posneg,
            &work.k1,
            &mut work.k2,
            &mut work.y1,
            5,
            control.hmax,
            &atol,
            &rtol,
        ),
    };

    if solout.solout::<Dp5Dense<T>>(x, x, y, None) == ControlFlag::Interrupt {
        return Ok(IntegrationResult::new(x, h, Status::Interrupted, steps));
    }

    // --- Main integration loop ---
    let status = loop {
        if steps.total >= control.nmax {
            break Status::NeedLargerNmax;
        }

        // Check for underflow due to machine rounding
        if T::lit(0.1) * h.abs() <= x.abs() * control.uround {
            break Status::StepSizeTooSmall;
        }

        // Adjust last step to land on xend
        if (x + T::lit(1.01) * h - xend) * posneg > T::zero() {
            h = xend - x;
            last = true;
        }

        steps.total += 1;

        let xph = x + h;
        work.advance(f, x, h, y);
        f.ode(xph, &work.y1, &mut work.k7);

        let err = work.error(h, y, &atol, &rtol);

        // Computation of hnew with Lund stabilization
        let fac11 = err.powf(expo1);
        let mut fac = fac11 / facold.powf(control.beta);
        fac = control
            .facc2
            .max(control.facc1.min(fac / control.safety_factor));
        let mut hnew = h / fac;

        if err <= T::one() {
            // Step accepted
            facold = err.max(T::lit(1.0e-4));
            steps.accepted += 1;

            // Stiffness detection
            if steps.accepted % control.nstiff == 0 || iasti > 0 {
                let (stnum, stden) = work.stiffness_quotient();
                if stden > T::zero() {
                    hlamb = h.abs() * (stnum / stden).sqrt();
                }
                if hlamb > T::lit(3.25) {
                    nonstiff = 0;
                    iasti += 1;
                    if iasti == 15 {
                        break Status::ProbablyStiff;
                    }
                } else {
                    nonstiff += 1;
                    if nonstiff == 6 {
                        iasti = 0;
                    }
                }
            }

            if dense_output {
                work.dense(h, y, &mut cont);
            }

            work.k1.copy_from_slice(&work.k7);
            y.copy_from_slice(&work.y1);
            let xold = x;
            x = if last { xend } else { xph };

            let flag = if dense_output {
                let interpolator = Dp5Dense::new(&cont, xold, h);
                solout.solout(xold, x, y, Some(&interpolator))
            } else {
                solout.solout::<Dp5Dense<T>>(xold, x, y, None)
            };
            if flag == ControlFlag::Interrupt {
                break Status::Interrupted;
            }

            // Normal exit
            if last {
                h = hnew;
                break Status::Success;
            }

            if hnew.abs() > control.hmax {
                hnew = posneg * control.hmax;
            }

            // Prevent oscillations due to previous rejected step
            if reject {
                hnew = posneg * hnew.abs().min(h.abs());
                reject = false;
            }
        } else {
            // Step rejected
            hnew = h / control.facc1.min(fac11 / control.safety_factor);
            reject = true;
            if steps.accepted >= 1 {
                steps.rejected += 1;
            }
            last = false;
        }
        h = hnew;
    };

    Ok(IntegrationResult::new(x, h, status, steps))
}

/// DOPRI5 with a constant step `h` and no error control.
pub fn dopri5_fixed<T, F, S>(
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
    let mut work = Stages::new(y.len());

    fixed_steps(x, xend, y, h, control.nmax, solout, |x, h, y| {
        f.ode(x, y, &mut work.k1);
        work.advance(f, x, h, y);
        y.copy_from_slice(&work.y1);
        Ok(())
    })
}

/// Stage vectors of one DOPRI5 step.
struct Stages<T: Real> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    ysti: Vec<T>,
    y1: Vec<T>,
    err: Vec<T>,
    coef: Coefficients<T>,
}

impl<T: Real> Stages<T> {
    fn new(n: usize) -> Self {
        let z = || vec![T::zero(); n];
        Self {
            k1: z(),
            k2: z(),
            k3: z(),
            k4: z(),
            k5: z(),
            k6: z(),
            k7: z(),
            ysti: z(),
            y1: z(),
            err: z(),
            coef: Coefficients::new(),
        }
    }

    /// Stages 2 to 6 and the fifth-order solution `y1`. Expects `k1 = f(x, y)`.
    fn advance<F: ODE<T>>(&mut self, f: &mut F, x: T, h: T, y: &[T]) {
        let c = &self.coef;
        let n = y.len();

        for i in 0..n {
            self.y1[i] = y[i] + h * c.a21 * self.k1[i];
        }
        f.ode(x + c.c2 * h, &self.y1, &mut self.k2);

        for i in 0..n {
            self.y1[i] = y[i] + h * (c.a31 * self.k1[i] + c.a32 * self.k2[i]);
        }
        f.ode(x + c.c3 * h, &self.y1, &mut self.k3);

        for i in 0..n {
            self.y1[i] = y[i]
                + h * (c.a41 * self.k1[i] + c.a42 * self.k2[i] + c.a43 * self.k3[i]);
        }
        f.ode(x + c.c4 * h, &self.y1, &mut self.k4);

        for i in 0..n {
            self.y1[i] = y[i]
                + h * (c.a51 * self.k1[i]
                    + c.a52 * self.k2[i]
                    + c.a53 * self.k3[i]
                    + c.a54 * self.k4[i]);
        }
        f.ode(x + c.c5 * h, &self.y1, &mut self.k5);

        for i in 0..n {
            self.ysti[i] = y[i]
                + h * (c.a61 * self.k1[i]
                    + c.a62 * self.k2[i]
                    + c.a63 * self.k3[i]
                    + c.a64 * self.k4[i]
                    + c.a65 * self.k5[i]);
        }
        f.ode(x + h, &self.ysti, &mut self.k6);

        for i in 0..n {
            self.y1[i] = y[i]
                + h * (c.a71 * self.k1[i]
                    + c.a73 * self.k3[i]
                    + c.a74 * self.k4[i]
                    + c.a75 * self.k5[i]
                    + c.a76 * self.k6[i]);
        }
    }

    /// Scaled norm of the embedded error estimate. Needs `k7 = f(x + h, y1)`.
    fn error(&mut self, h: T, y: &[T], atol: &Tolerance<T>, rtol: &Tolerance<T>) -> T {
        let c = &self.coef;
        for i in 0..y.len() {
            self.err[i] = h
                * (c.e1 * self.k1[i]
                    + c.e3 * self.k3[i]
                    + c.e4 * self.k4[i]
                    + c.e5 * self.k5[i]
                    + c.e6 * self.k6[i]
                    + c.e7 * self.k7[i]);
        }
        error_norm(&self.err, y, &self.y1, atol, rtol)
    }

    /// `(|k7 - k6|^2, |y1 - ysti|^2)`, whose ratio estimates the dominant
    /// eigenvalue along the step.
    fn stiffness_quotient(&self) -> (T, T) {
        let mut stnum = T::zero();
        let mut stden = T::zero();
        for i in 0..self.y1.len() {
            let d1 = self.k7[i] - self.k6[i];
            let d2 = self.y1[i] - self.ysti[i];
            stnum += d1 * d1;
            stden += d2 * d2;
        }
        (stnum, stden)
    }

    /// Dense output coefficients of the accepted step from `y` to `y1`.
    fn dense(&self, h: T, y: &[T], cont: &mut [T]) {
        let c = &self.coef;
        let n = y.len();
        for i in 0..n {
            let ydiff = self.y1[i] - y[i];
            let bspl = h * self.k1[i] - ydiff;
            cont[i] = y[i];
            cont[n + i] = ydiff;
            cont[2 * n + i] = bspl;
            cont[3 * n + i] = -h * self.k7[i] + ydiff - bspl;
            cont[4 * n + i] = h
                * (c.d1 * self.k1[i]
                    + c.d3 * self.k3[i]
                    + c.d4 * self.k4[i]
                    + c.d5 * self.k5[i]
                    + c.d6 * self.k6[i]
                    + c.d7 * self.k7[i]);
        }
    }
}

/// Continuous output function for DOPRI5
pub fn contdp5<T: Real>(xi: T, yi: &mut [T], cont: &[T], xold: T, h: T) {
    let n = cont.len() / 5;
    let theta = (xi - xold) / h;
    let theta1 = T::one() - theta;
    for i in 0..n {
        yi[i] = cont[i]
            + theta
                * (cont[n + i]
                    + theta1
                        * (cont[2 * n + i] + theta * (cont[3 * n + i] + theta1 * cont[4 * n + i])));
    }
}

/// Dense output interpolator for DOPRI5, valid on the last accepted step.
pub struct Dp5Dense<'a, T: Real> {
    cont: &'a [T],
    xold: T,
    h: T,
}

impl<'a, T: Real> Dp5Dense<'a, T> {
    pub fn new(cont: &'a [T], xold: T, h: T) -> Self {
        Self { cont, xold, h }
    }
}

impl<T: Real> Interpolate<T> for Dp5Dense<'_, T> {
    fn interpolate(&self, xi: T, yi: &mut [T]) {
        contdp5(xi, yi, self.cont, self.xold, self.h);
    }

    fn get_cont(&self) -> (Vec<T>, T, T) {
        (self.cont.to_vec(), self.xold, self.h)
    }
}

/// The DOPRI5 tableau converted once to the working precision.
struct Coefficients<T: Real> {
    c2: T,
    c3: T,
    c4: T,
    c5: T,
    a21: T,
    a31: T,
    a32: T,
    a41: T,
    a42: T,
    a43: T,
    a51: T,
    a52: T,
    a53: T,
    a54: T,
    a61: T,
    a62: T,
    a63: T,
    a64: T,
    a65: T,
    a71: T,
    a73: T,
    a74: T,
    a75: T,
    a76: T,
    e1: T,
    e3: T,
    e4: T,
    e5: T,
    e6: T,
    e7: T,
    d1: T,
    d3: T,
    d4: T,
    d5: T,
    d6: T,
    d7: T,
}

impl<T: Real> Coefficients<T> {
    fn new() -> Self {
        Self {
            c2: ratio(C2),
            c3: ratio(C3),
            c4: ratio(C4),
            c5: ratio(C5),
            a21: ratio(A21),
            a31: ratio(A31),
            a32: ratio(A32),
            a41: ratio(A41),
            a42: ratio(A42),
            a43: ratio(A43),
            a51: ratio(A51),
            a52: ratio(A52),
            a53: ratio(A53),
            a54: ratio(A54),
            a61: ratio(A61),
            a62: ratio(A62),
            a63: ratio(A63),
            a64: ratio(A64),
            a65: ratio(A65),
            a71: ratio(A71),
            a73: ratio(A73),
            a74: ratio(A74),
            a75: ratio(A75),
            a76: ratio(A76),
            e1: ratio(E1),
            e3: ratio(E3),
            e4: ratio(E4),
            e5: ratio(E5),
            e6: ratio(E6),
            e7: ratio(E7),
            d1: ratio(D1),
            d3: ratio(D3),
            d4: ratio(D4),
            d5: ratio(D5),
            d6: ratio(D6),
            d7: ratio(D7),
        }
    }
}

// DOPRI5 Butcher tableau, exact rationals `(p, q)` for `p / q`
const C2: (i64, i64) = (1, 5);
const C3: (i64, i64) = (3, 10);
const C4: (i64, i64) = (4, 5);
const C5: (i64, i64) = (8, 9);

const A21: (i64, i64) = (1, 5);
const A31: (i64, i64) = (3, 40);
const A32: (i64, i64) = (9, 40);
const A41: (i64, i64) = (44, 45);
const A42: (i64, i64) = (-56, 15);
const A43: (i64, i64) = (32, 9);
const A51: (i64, i64) = (19372, 6561);
const A52: (i64, i64) = (-25360, 2187);
const A53: (i64, i64) = (64448, 6561);
const A54: (i64, i64) = (-212, 729);
const A61: (i64, i64) = (9017, 3168);
const A62: (i64, i64) = (-355, 33);
const A63: (i64, i64) = (46732, 5247);
const A64: (i64, i64) = (49, 176);
const A65: (i64, i64) = (-5103, 18656);
const A71: (i64, i64) = (35, 384);
const A73: (i64, i64) = (500, 1113);
const A74: (i64, i64) = (125, 192);
const A75: (i64, i64) = (-2187, 6784);
const A76: (i64, i64) = (11, 84);

const E1: (i64, i64) = (71, 57600);
const E3: (i64, i64) = (-71, 16695);
const E4: (i64, i64) = (71, 1920);
const E5: (i64, i64) = (-17253, 339200);
const E6: (i64, i64) = (22, 525);
const E7: (i64, i64) = (-1, 40);

const D1: (i64, i64) = (-12715105075, 11282082432);
const D3: (i64, i64) = (87487479700, 32700410799);
const D4: (i64, i64) = (-10690763975, 1880347072);
const D5: (i64, i64) = (701980252875, 199316789632);
const D6: (i64, i64) = (-1453857185, 822651844);
const D7: (i64, i64) = (69997945, 29380423);


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::solout::NoOutput;

    struct Exp;

    impl ODE<f64> for Exp {
        fn ode(&mut self, _x: f64, y: &[f64], dydx: &mut [f64]) {
            dydx[0] = -y[0];
        }
    }

    /// Checks every dense interpolant against the exact solution.
    struct DenseSampler {
        max_err: f64,
        calls: usize,
    }

    impl SolOut<f64> for DenseSampler {
        fn solout<I: Interpolate<f64>>(
            &mut self,
            xold: f64,
            x: f64,
            _y: &[f64],
            interpolator: Option<&I>,
        ) -> ControlFlag {
            self.calls += 1;
            if let Some(interp) = interpolator {
                let mut yi = [0.0];
                let xm = 0.5 * (xold + x);
                interp.interpolate(xm, &mut yi);
                self.max_err = self.max_err.max((yi[0] - (-xm).exp()).abs());
            }
            ControlFlag::Continue
        }
    }

    #[test]
    fn tableau_rows_sum_to_nodes() {
        let c = Coefficients::<f64>::new();
        assert_eq!(c.a21, c.c2);
        assert!((c.a31 + c.a32 - c.c3).abs() < 1e-15);
        assert!((c.a41 + c.a42 + c.a43 - c.c4).abs() < 1e-15);
        assert!((c.a51 + c.a52 + c.a53 + c.a54 - c.c5).abs() < 1e-14);
        assert!((c.a61 + c.a62 + c.a63 + c.a64 + c.a65 - 1.0).abs() < 1e-14);
        assert!((c.a71 + c.a73 + c.a74 + c.a75 + c.a76 - 1.0).abs() < 1e-15);
        assert!((c.e1 + c.e3 + c.e4 + c.e5 + c.e6 + c.e7).abs() < 1e-16);
    }

    #[test]
    fn adaptive_reaches_xend_exactly() {
        let mut y = [1.0];
        let res = dopri5(
            &mut Exp,
            0.0,
            2.0,
            &mut y,
            Tolerance::Scalar(1e-10),
            Tolerance::Scalar(1e-10),
            &mut NoOutput,
            false,
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(res.status, Status::Success);
        assert_eq!(res.x, 2.0);
        assert!((y[0] - (-2.0_f64).exp()).abs() < 1e-9);
        assert!(res.steps.accepted > 5);
    }

    #[test]
    fn dense_output_tracks_solution() {
        let mut y = [1.0];
        let mut sampler = DenseSampler {
            max_err: 0.0,
            calls: 0,
        };
        let res = dopri5(
            &mut Exp,
            0.0,
            3.0,
            &mut y,
            Tolerance::Scalar(1e-8),
            Tolerance::Scalar(1e-8),
            &mut sampler,
            true,
            &Settings::default(),
        )
        .unwrap();
        assert_eq!(sampler.calls, res.steps.accepted + 1);
        assert!(sampler.max_err < 1e-6, "dense error {}", sampler.max_err);
    }

    #[test]
    fn fixed_step_is_one_rk_update() {
        let mut y = [1.0];
        let res = dopri5_fixed(&mut Exp, 0.0, 0.5, &mut y, 1.0, &mut NoOutput, &Settings::default())
            .unwrap();
        assert_eq!(res.steps.accepted, 1);
        assert_eq!(res.x, 1.0);
        // Fifth-order solution of y' = -y over one unit step.
        assert!((y[0] - (-1.0_f64).exp()).abs() < 2e-3);
    }

    #[test]
    fn step_budget_exhaustion_is_reported() {
        let mut y = [1.0];
        let settings = Settings::builder().nmax(3).h0(1e-3).build();
        let res = dopri5(
            &mut Exp,
            0.0,
            10.0,
            &mut y,
            Tolerance::Scalar(1e-12),
            Tolerance::Scalar(1e-12),
            &mut NoOutput,
            false,
            &settings,
        )
        .unwrap();
        assert_eq!(res.status, Status::NeedLargerNmax);
    }
}
