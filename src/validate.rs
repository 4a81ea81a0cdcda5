//! Accuracy checks of a numerical trajectory against the analytic solution.

use crate::{
    analytic::{bateman, reference},
    real::Real,
    solve::Trajectory,
};

/// Per-species outcome of [`check`].
#[derive(Clone, Debug)]
pub struct Validation<T: Real> {
    /// `|numeric[j] - ref(j)|`
    pub deviations: Vec<T>,
    /// `atol + rtol * ref(j)`
    pub bounds: Vec<T>,
}

impl<T: Real> Validation<T> {
    /// Whether every deviation lies within its bound.
    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Indices of the species outside their bound.
    pub fn failures(&self) -> impl Iterator<Item = usize> + '_ {
        self.deviations
            .iter()
            .zip(&self.bounds)
            .enumerate()
            .filter(|(_, (d, b))| !(**d <= **b))
            .map(|(j, _)| j)
    }

    /// Largest deviation relative to its bound.
    pub fn worst_ratio(&self) -> T {
        self.deviations
            .iter()
            .zip(&self.bounds)
            .map(|(d, b)| *d / *b)
            .fold(T::zero(), T::max)
    }
}

/// Compare the terminal state of a run to `t = 1` against [`reference`].
///
/// A NaN deviation never passes.
pub fn check<T: Real>(terminal: &[T], p: usize, a: T, atol: T, rtol: T) -> Validation<T> {
    let exact: Vec<T> = (0..terminal.len()).map(|j| reference(j, p, a)).collect();
    check_against(terminal, &exact, atol, rtol)
}

/// [`check`] against an arbitrary exact state, e.g. [`bateman`] at an end
/// time other than one.
pub fn check_against<T: Real>(terminal: &[T], exact: &[T], atol: T, rtol: T) -> Validation<T> {
    let (deviations, bounds) = terminal
        .iter()
        .zip(exact)
        .map(|(&y, &r)| ((y - r).abs(), atol + rtol * r))
        .unzip();
    Validation { deviations, bounds }
}

/// Validate the last row of `trajectory` at its own time. A row at exactly
/// `t = 1` goes through [`check`], any other time (a later end time or an
/// overshooting fixed step) through [`bateman`] over `rates`. `None` for an
/// empty trajectory.
pub fn check_terminal<T: Real>(
    trajectory: &Trajectory<T>,
    rates: &[T],
    p: usize,
    a: T,
    atol: T,
    rtol: T,
) -> Option<Validation<T>> {
    let (t, terminal) = trajectory.last()?;
    Some(if t == T::one() {
        check(terminal, p, a, atol, rtol)
    } else {
        check_against(terminal, &bateman(rates, t), atol, rtol)
    })
}

/// Absolute deviation of every trajectory row from the Bateman solution,
/// laid out like [`Trajectory::yout`].
pub fn deviations<T: Real>(trajectory: &Trajectory<T>, rates: &[T]) -> Vec<T> {
    let n = trajectory.n();
    let mut out = Vec::with_capacity(trajectory.yout.len());
    for (row, &t) in trajectory.xout.iter().enumerate() {
        let exact = bateman(rates, t);
        let y = &trajectory.yout[row * n..(row + 1) * n];
        out.extend(y.iter().zip(&exact).map(|(v, e)| (*v - *e).abs()));
    }
    out
}

/// `computed[j] - supplied[j]` for external regression comparison.
pub fn diff_row<T: Real>(computed: &[T], supplied: &[T]) -> Vec<T> {
    computed
        .iter()
        .zip(supplied)
        .map(|(c, s)| *c - *s)
        .collect()
}
