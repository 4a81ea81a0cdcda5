//! Trajectory buffer and the observer that fills it.

use crate::{
    core::{
        interpolate::Interpolate,
        solout::{ControlFlag, SolOut},
    },
    real::Real,
};

/// Append-only `(time, state)` rows. States are stored flattened, so
/// `xout.len() == yout.len() / n` always holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory<T: Real> {
    n: usize,
    pub xout: Vec<T>,
    pub yout: Vec<T>,
}

impl<T: Real> Trajectory<T> {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            xout: Vec::new(),
            yout: Vec::new(),
        }
    }

    /// Width of a state row.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.xout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xout.is_empty()
    }

    pub fn push(&mut self, x: T, y: &[T]) {
        debug_assert_eq!(y.len(), self.n);
        self.xout.push(x);
        self.yout.extend_from_slice(y);
    }

    pub fn row(&self, i: usize) -> (T, &[T]) {
        (self.xout[i], &self.yout[i * self.n..(i + 1) * self.n])
    }

    pub fn last(&self) -> Option<(T, &[T])> {
        self.len().checked_sub(1).map(|i| self.row(i))
    }

    pub fn rows(&self) -> impl Iterator<Item = (T, &[T])> + '_ {
        self.xout.iter().copied().zip(self.yout.chunks(self.n))
    }
}

/// Per-step dense output coefficients `(cont, xold, h)`.
pub(crate) type Segment<T> = (Vec<T>, T, T);

/// Records every observer call into a [`Trajectory`].
///
/// Without sample times each call appends the mesh point. With sample
/// times only samples in `(xold, x]` are appended, evaluated through the
/// step interpolant (or taken verbatim when they coincide with `x`). When
/// `collect_segments` is set, every step interpolant is kept as well.
pub struct TrajectoryRecorder<T: Real> {
    trajectory: Trajectory<T>,
    t_eval: Option<Vec<T>>,
    next: usize,
    segments: Option<Vec<Segment<T>>>,
}

impl<T: Real> TrajectoryRecorder<T> {
    pub fn new(n: usize, t_eval: Option<Vec<T>>, collect_segments: bool) -> Self {
        Self {
            trajectory: Trajectory::new(n),
            t_eval,
            next: 0,
            segments: collect_segments.then(Vec::new),
        }
    }

    /// Append `x` and a copy of `y`.
    pub fn record(&mut self, y: &[T], x: T) {
        self.trajectory.push(x, y);
    }

    pub fn trajectory(&self) -> &Trajectory<T> {
        &self.trajectory
    }

    pub(crate) fn into_parts(self) -> (Trajectory<T>, Option<Vec<Segment<T>>>) {
        (self.trajectory, self.segments)
    }

    fn sample<I: Interpolate<T>>(&mut self, xold: T, x: T, y: &[T], interpolator: Option<&I>) {
        let Some(t_eval) = self.t_eval.as_ref() else {
            return;
        };
        let mut yi = vec![T::zero(); y.len()];
        while let Some(&t) = t_eval.get(self.next) {
            if t > x {
                break;
            }
            if t == x {
                self.trajectory.push(t, y);
            } else if t > xold {
                if let Some(interp) = interpolator {
                    interp.interpolate(t, &mut yi);
                    self.trajectory.push(t, &yi);
                }
            }
            self.next += 1;
        }
    }
}

impl<T: Real> SolOut<T> for TrajectoryRecorder<T> {
    fn solout<I: Interpolate<T>>(
        &mut self,
        xold: T,
        x: T,
        y: &[T],
        interpolator: Option<&I>,
    ) -> ControlFlag {
        if let (Some(segments), Some(interp)) = (self.segments.as_mut(), interpolator) {
            segments.push(interp.get_cont());
        }

        if self.t_eval.is_some() {
            self.sample(xold, x, y, interpolator);
        } else {
            self.record(y, x);
        }
        ControlFlag::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::interpolate::CubicHermite;

    #[test]
    fn mesh_points_are_recorded_in_order() {
        let mut rec = TrajectoryRecorder::new(2, None, false);
        rec.solout::<CubicHermite<f64>>(0.0, 0.0, &[1.0, 0.0], None);
        rec.solout::<CubicHermite<f64>>(0.0, 0.5, &[0.6, 0.3], None);
        let (traj, segs) = rec.into_parts();
        assert!(segs.is_none());
        assert_eq!(traj.xout, vec![0.0, 0.5]);
        assert_eq!(traj.yout, vec![1.0, 0.0, 0.6, 0.3]);
        assert_eq!(traj.row(1), (0.5, &[0.6, 0.3][..]));
        assert_eq!(traj.rows().count(), 2);
    }

    #[test]
    fn samples_go_through_the_interpolant() {
        // Linear solution y = 1 - x on each step.
        let mut rec = TrajectoryRecorder::new(1, Some(vec![0.0, 0.25, 0.5, 0.75]), true);
        rec.solout::<CubicHermite<f64>>(0.0, 0.0, &[1.0], None);

        let (y0, y1, d) = ([1.0], [0.5], [-1.0]);
        let interp = CubicHermite::new(0.0, 0.5, &y0, &y1, &d, &d);
        rec.solout(0.0, 0.5, &y1, Some(&interp));

        let (y2, y3) = ([0.5], [0.2]);
        let interp = CubicHermite::new(0.5, 0.3, &y2, &y3, &d, &d);
        rec.solout(0.5, 0.8, &y3, Some(&interp));

        let (traj, segs) = rec.into_parts();
        assert_eq!(traj.xout, vec![0.0, 0.25, 0.5, 0.75]);
        assert!((traj.yout[1] - 0.75).abs() < 1e-15);
        assert_eq!(traj.yout[2], 0.5);
        assert!((traj.yout[3] - 0.25).abs() < 1e-15);
        assert_eq!(segs.map(|s| s.len()), Some(2));
    }
}
