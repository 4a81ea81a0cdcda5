//! Compute an initial step size guess

use crate::{core::ode::ODE, methods::settings::Tolerance, real::Real};

/// Compute an initial step size guess for an ODE solver of order `iord`.
///
/// Takes an explicit Euler step of a first guess based on the ratio of the
/// scaled state and derivative norms, estimates the second derivative from
/// it and returns `min(100 |h|, h1, hmax)` signed along `posneg`.
pub fn hinit<T, F>(
    f: &mut F,
    x: T,
    y: &[T],
    posneg: T,
    f0: &[T],
    f1: &mut [T],
    y1: &mut [T],
    iord: usize,
    hmax: T,
    atol: &Tolerance<T>,
    rtol: &Tolerance<T>,
) -> T
where
    T: Real,
    F: ODE<T>,
{
    let n = y.len();
    let mut dnf = T::zero();
    let mut dny = T::zero();

    for i in 0..n {
        let sk = atol[i] + rtol[i] * y[i].abs();
        dnf += (f0[i] / sk) * (f0[i] / sk);
        dny += (y[i] / sk) * (y[i] / sk);
    }

    let tiny = T::lit(1e-10);
    let mut h = if dnf <= tiny || dny <= tiny {
        T::lit(1.0e-6)
    } else {
        (dny / dnf).sqrt() * T::lit(0.01)
    };
    h = h.min(hmax.abs());
    h = h.abs() * posneg.signum();

    // Explicit Euler step: y1 = y + h * f0
    for i in 0..n {
        y1[i] = y[i] + h * f0[i];
    }
    f.ode(x + h, y1, f1);

    // Estimate second derivative
    let mut der2 = T::zero();
    for i in 0..n {
        let sk = atol[i] + rtol[i] * y[i].abs();
        let df = (f1[i] - f0[i]) / sk;
        der2 += df * df;
    }
    der2 = der2.sqrt() / h.abs();

    let der12 = der2.abs().max(dnf.sqrt());
    let h1 = if der12 <= T::lit(1.0e-15) {
        T::lit(1.0e-6).max(h.abs() * T::lit(1.0e-3))
    } else {
        (T::lit(0.01) / der12).powf(T::one() / T::int(iord as i64))
    };

    let h_final = (T::int(100) * h.abs()).min(h1).min(hmax.abs());
    h_final * posneg.signum()
}
