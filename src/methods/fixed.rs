//! Constant step-size driver shared by the fixed-step flavours of every method.

use crate::{
    core::{
        interpolate::CubicHermite,
        solout::{ControlFlag, SolOut},
        solution::{IntegrationResult, Steps},
        status::Status,
    },
    error::{Error, Result},
    real::Real,
};

/// Advance `y` from `x0` towards `xend` in steps of exactly `h`.
///
/// `step(x, h, y)` performs one step of the underlying method in place. The
/// abscissa after `k` steps is `x0 + k * h`, so no rounding accumulates. The
/// last step is never shortened: integration stops at the first mesh point
/// that reaches `xend` (within `|h| * sqrt(eps)`), which may lie beyond it.
/// The observer never receives an interpolant.
pub(crate) fn fixed_steps<T, S, P>(
    x0: T,
    xend: T,
    y: &mut [T],
    h: T,
    nmax: usize,
    solout: &mut S,
    mut step: P,
) -> Result<IntegrationResult<T>>
where
    T: Real,
    S: SolOut<T>,
    P: FnMut(T, T, &mut [T]) -> std::result::Result<(), Status>,
{
    let posneg = (xend - x0).signum();
    if h == T::zero() || !h.is_finite() || h.signum() != posneg {
        return Err(Error::InvalidStepSize(h.to_f64_lossy()));
    }

    let mut steps = Steps::default();
    let slack = h.abs() * T::epsilon().sqrt();
    let mut x = x0;

    if solout.solout::<CubicHermite<T>>(x, x, y, None) == ControlFlag::Interrupt {
        return Ok(IntegrationResult::new(x, h, Status::Interrupted, steps));
    }

    while (xend - x) * posneg > slack {
        if steps.total >= nmax {
            return Ok(IntegrationResult::new(x, h, Status::NeedLargerNmax, steps));
        }

        steps.total += 1;
        if let Err(status) = step(x, h, y) {
            return Ok(IntegrationResult::new(x, h, status, steps));
        }
        steps.accepted += 1;

        let xold = x;
        x = x0 + T::int(steps.accepted as i64) * h;
        if solout.solout::<CubicHermite<T>>(xold, x, y, None) == ControlFlag::Interrupt {
            return Ok(IntegrationResult::new(x, h, Status::Interrupted, steps));
        }
    }

    Ok(IntegrationResult::new(x, h, Status::Success, steps))
}
