//! Callback hook executed after each accepted step.

use crate::{core::interpolate::Interpolate, real::Real};

/// Return flags for [`SolOut`].
///
/// - `Continue`: proceed with integration as normal.
/// - `Interrupt`: stop integration and return control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlag {
    Continue,
    Interrupt,
}

/// Observer invoked once before the first step (`xold == x`) and after every
/// accepted step, in-line with the integrator's control flow.
///
/// The state `y` is read-only. When the integrator runs with dense output,
/// `interpolator` evaluates the solution anywhere in `[xold, x]`.
pub trait SolOut<T: Real> {
    fn solout<I: Interpolate<T>>(
        &mut self,
        xold: T,
        x: T,
        y: &[T],
        interpolator: Option<&I>,
    ) -> ControlFlag;
}

/// Observer that ignores every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutput;

impl<T: Real> SolOut<T> for NoOutput {
    fn solout<I: Interpolate<T>>(
        &mut self,
        _xold: T,
        _x: T,
        _y: &[T],
        _interpolator: Option<&I>,
    ) -> ControlFlag {
        ControlFlag::Continue
    }
}
