//! User-supplied ODE system.

use crate::{matrix::Matrix, real::Real};

/// Right-hand side of `y' = f(x, y)`.
///
/// The integrator repeatedly calls `ode` with the current abscissa `x` and
/// state `y` and expects `dydx` to be filled with the derivative values.
/// The receiver is `&mut self` so an implementation can keep per-run
/// bookkeeping such as evaluation counters.
///
/// # Example
///
/// ```
/// use decay_chain::prelude::*;
///
/// struct Decay { k: f64 }
///
/// impl ODE<f64> for Decay {
///     fn ode(&mut self, _x: f64, y: &[f64], dydx: &mut [f64]) {
///         dydx[0] = -self.k * y[0];
///     }
/// }
/// ```
pub trait ODE<T: Real> {
    fn ode(&mut self, x: T, y: &[T], dydx: &mut [T]);
}

/// Systems that also provide their Jacobian, required by implicit methods.
pub trait Jacobian<T: Real>: ODE<T> {
    /// Fill `j` with `df/dy` at `(x, y)` and `dfdx` with the explicit
    /// time derivative `df/dx`. Entries outside the matrix storage pattern
    /// are assumed zero and must not be written.
    fn jac(&mut self, x: T, y: &[T], j: &mut Matrix<T>, dfdx: &mut [T]);

    /// Zeroed `n x n` matrix with the storage pattern `jac` writes into.
    fn jac_matrix(&self, n: usize) -> Matrix<T> {
        Matrix::full(n, n)
    }
}
