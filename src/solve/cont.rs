//! Continuous output provided by dense output coefficients (cont) from each step.

use crate::{core::interpolate::conthermite, methods::dp::contdp5, real::Real};

use super::{
    method::Family,
    recorder::{Segment, Trajectory},
};

type ContFn<T> = fn(T, &mut [T], &[T], T, T);

#[derive(Debug, Clone)]
struct Step<T: Real> {
    cont: Vec<T>,
    xold: T,
    h: T,
}

/// Piecewise dense output over all accepted steps of a forward run.
#[derive(Debug, Clone)]
pub struct ContinuousOutput<T: Real> {
    steps: Vec<Step<T>>,
    cont_fn: ContFn<T>,
    coeffs_per_state: usize,
}

impl<T: Real> ContinuousOutput<T> {
    /// Build from per-step tuples of `(cont, xold, h)` produced by `family`.
    pub(crate) fn from_segments(family: Family, segs: Vec<Segment<T>>) -> Self {
        let (cont_fn, coeffs_per_state) = match family {
            Family::Dopri5 => (contdp5 as ContFn<T>, 5),
            Family::Rodas4 | Family::BulirschStoer => (conthermite as ContFn<T>, 4),
        };
        let steps = segs
            .into_iter()
            .filter(|(_, _, h)| *h != T::zero())
            .map(|(cont, xold, h)| Step { cont, xold, h })
            .collect();
        Self {
            steps,
            cont_fn,
            coeffs_per_state,
        }
    }

    /// Number of step interpolants.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Domain covered by the dense output.
    pub fn t_span(&self) -> Option<(T, T)> {
        let first = self.steps.first()?;
        let last = self.steps.last()?;
        Some((first.xold, last.xold + last.h))
    }

    /// Interpolate y(t) if t lies within any recorded step; returns None if outside.
    pub fn evaluate(&self, t: T) -> Option<Vec<T>> {
        let step = self.find_step(t)?;
        let n = step.cont.len() / self.coeffs_per_state;
        let mut yi = vec![T::zero(); n];
        (self.cont_fn)(t, &mut yi, &step.cont, step.xold, step.h);
        Some(yi)
    }

    /// Batch-evaluate at many times; returns None for points outside coverage.
    pub fn evaluate_many(&self, ts: &[T]) -> Vec<Option<Vec<T>>> {
        ts.iter().map(|&t| self.evaluate(t)).collect()
    }

    /// Spread the rows of `mesh` evenly over its time span. The row count
    /// and both end rows are kept. Interior rows are evaluated through the
    /// step interpolants.
    pub fn resample(&self, mesh: &Trajectory<T>) -> Trajectory<T> {
        let rows = mesh.len();
        if rows < 3 || self.steps.is_empty() {
            return mesh.clone();
        }
        let (x0, y0) = mesh.row(0);
        let (xend, yend) = mesh.row(rows - 1);

        let intervals = T::int(rows as i64 - 1);
        let mut out = Trajectory::new(mesh.n());
        let mut yi = vec![T::zero(); mesh.n()];
        out.push(x0, y0);
        for i in 1..rows - 1 {
            let t = x0 + (xend - x0) * T::int(i as i64) / intervals;
            let i = self
                .steps
                .partition_point(|s| s.xold + s.h < t)
                .min(self.steps.len() - 1);
            let step = &self.steps[i];
            (self.cont_fn)(t, &mut yi, &step.cont, step.xold, step.h);
            out.push(t, &yi);
        }
        out.push(xend, yend);
        out
    }

    fn find_step(&self, t: T) -> Option<&Step<T>> {
        // Steps are contiguous and ascending.
        let i = self.steps.partition_point(|s| s.xold + s.h < t);
        let step = self.steps.get(i)?;
        (t >= step.xold).then_some(step)
    }
}
