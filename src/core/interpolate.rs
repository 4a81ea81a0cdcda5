//! Interpolation trait and the cubic Hermite interpolant

use crate::real::Real;

/// Trait for interpolating the solution within a step.
pub trait Interpolate<T: Real> {
    /// Interpolate the solution at the given abscissa `xi`.
    fn interpolate(&self, xi: T, yi: &mut [T]);

    /// Owned copy of the dense-output coefficients as `(cont, xold, h)`.
    fn get_cont(&self) -> (Vec<T>, T, T);
}

/// Cubic Hermite interpolant over one step from the endpoint values and
/// derivatives. Third-order accurate; used by methods without a native
/// continuous extension.
pub struct CubicHermite<'a, T: Real> {
    x0: T,
    h: T,
    y0: &'a [T],
    y1: &'a [T],
    dy0: &'a [T],
    dy1: &'a [T],
}

impl<'a, T: Real> CubicHermite<'a, T> {
    pub fn new(x0: T, h: T, y0: &'a [T], y1: &'a [T], dy0: &'a [T], dy1: &'a [T]) -> Self {
        Self {
            x0,
            h,
            y0,
            y1,
            dy0,
            dy1,
        }
    }
}

impl<T: Real> Interpolate<T> for CubicHermite<'_, T> {
    fn interpolate(&self, xi: T, yi: &mut [T]) {
        let n = self.y0.len();
        let two = T::int(2);
        let three = T::int(3);
        let t = (xi - self.x0) / self.h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = two * t3 - three * t2 + T::one();
        let h10 = t3 - two * t2 + t;
        let h01 = -two * t3 + three * t2;
        let h11 = t3 - t2;

        for i in 0..n {
            yi[i] = h00 * self.y0[i]
                + h10 * self.h * self.dy0[i]
                + h01 * self.y1[i]
                + h11 * self.h * self.dy1[i];
        }
    }

    fn get_cont(&self) -> (Vec<T>, T, T) {
        let n = self.y0.len();
        let mut cont = Vec::with_capacity(4 * n);
        cont.extend_from_slice(self.y0);
        cont.extend_from_slice(self.y1);
        cont.extend(self.dy0.iter().map(|&d| self.h * d));
        cont.extend(self.dy1.iter().map(|&d| self.h * d));
        (cont, self.x0, self.h)
    }
}

/// Continuous output from stored Hermite coefficients `[y0, y1, h*dy0, h*dy1]`.
pub fn conthermite<T: Real>(xi: T, yi: &mut [T], cont: &[T], xold: T, h: T) {
    let n = cont.len() / 4;
    let two = T::int(2);
    let three = T::int(3);
    let t = (xi - xold) / h;
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = two * t3 - three * t2 + T::one();
    let h10 = t3 - two * t2 + t;
    let h01 = -two * t3 + three * t2;
    let h11 = t3 - t2;
    for i in 0..n {
        yi[i] = h00 * cont[i] + h01 * cont[n + i] + h10 * cont[2 * n + i] + h11 * cont[3 * n + i];
    }
}
