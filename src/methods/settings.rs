//! Settings for numerical integrators

use std::ops::Index;

use bon::Builder;

use crate::{
    error::{Error, Result},
    real::Real,
};

#[derive(Builder, Clone, Debug)]
/// Settings for the numerical integrators
pub struct Settings<T: Real> {
    /// The rounding unit, typically machine epsilon of `T`.
    pub uround: Option<T>,
    /// safety factor in step-size prediction.
    pub safety_factor: Option<T>,
    /// Parameter for step size selection where scale_min <= hnew/hold <= scale_max
    pub scale_min: Option<T>,
    /// Parameter for step size selection where scale_min <= hnew/hold <= scale_max
    pub scale_max: Option<T>,
    /// Beta factor for stabilized step size control (DOPRI5 only). Positive
    /// values of Beta ( <= 0.04 ) make the step size control more stable.
    pub beta: Option<T>,
    /// Maximal step size.
    pub hmax: Option<T>,
    /// Initial step size. None will result in an initial guess
    /// provided by the [`hinit`](crate::methods::hinit) function.
    pub h0: Option<T>,
    /// Maximum number of allowed steps.
    pub nmax: Option<usize>,
    /// Number of accepted steps between two stiffness tests (DOPRI5 only).
    pub nstiff: Option<usize>,
    /// Highest extrapolation order (Bulirsch-Stoer only).
    pub max_order: Option<usize>,
}

impl<T: Real> Default for Settings<T> {
    fn default() -> Self {
        Settings::builder().build()
    }
}

/// Method specific defaults used to resolve unset [`Settings`] fields.
pub(crate) struct Defaults {
    pub safety_factor: f64,
    pub scale_min: f64,
    pub scale_max: f64,
    pub beta: f64,
}

/// Validated step-control parameters.
pub(crate) struct Control<T: Real> {
    pub uround: T,
    pub safety_factor: T,
    /// Inverse of the smallest allowed ratio hnew/hold.
    pub facc1: T,
    /// Inverse of the largest allowed ratio hnew/hold.
    pub facc2: T,
    pub beta: T,
    pub hmax: T,
    pub h0: Option<T>,
    pub nmax: usize,
    pub nstiff: usize,
}

impl<T: Real> Settings<T> {
    /// Validate the settings against the integration span and fill in defaults.
    pub(crate) fn resolve(&self, x: T, xend: T, defaults: &Defaults) -> Result<Control<T>> {
        let uround = match self.uround {
            Some(u) if u <= T::lit(1e-35) || u >= T::one() => {
                return Err(Error::URoundOutOfRange(u.to_f64_lossy()));
            }
            Some(u) => u,
            None => T::epsilon(),
        };

        let safety_factor = match self.safety_factor {
            Some(s) if s >= T::one() || s <= T::lit(1e-4) => {
                return Err(Error::SafetyFactorOutOfRange(s.to_f64_lossy()));
            }
            Some(s) => s,
            None => T::lit(defaults.safety_factor),
        };

        let scale_min = self.scale_min.unwrap_or(T::lit(defaults.scale_min));
        let scale_max = self.scale_max.unwrap_or(T::lit(defaults.scale_max));
        if scale_min <= T::zero() || scale_min >= T::one() || scale_max <= T::one() {
            return Err(Error::InvalidScaleFactors(
                scale_min.to_f64_lossy(),
                scale_max.to_f64_lossy(),
            ));
        }

        let beta = match self.beta {
            Some(b) if b > T::lit(0.2) => return Err(Error::BetaTooLarge(b.to_f64_lossy())),
            Some(b) => b.max(T::zero()),
            None => T::lit(defaults.beta),
        };

        let hmax = match self.hmax {
            Some(h) => h.abs(),
            None => (xend - x).abs(),
        };

        let h0 = match self.h0 {
            Some(h) if h == T::zero() || !h.is_finite() => {
                return Err(Error::InvalidStepSize(h.to_f64_lossy()));
            }
            h => h,
        };

        let nmax = self.nmax.unwrap_or(100_000);
        if nmax == 0 {
            return Err(Error::NMaxMustBePositive(nmax));
        }

        let nstiff = self.nstiff.unwrap_or(1000);
        if nstiff == 0 {
            return Err(Error::NStiffMustBePositive(nstiff));
        }

        Ok(Control {
            uround,
            safety_factor,
            facc1: scale_min.recip(),
            facc2: scale_max.recip(),
            beta,
            hmax,
            h0,
            nmax,
            nstiff,
        })
    }
}

/// Tolerance enum to allow scalar or vector tolerances
/// using [`Into`] trait for easy conversion from `T`, `[T; N]`, or `Vec<T>`
/// users do not need to know or worry this simply allows both
/// `T` and `[T; N]` to be passed in as arguments.
#[derive(Clone, Debug)]
pub enum Tolerance<T: Real> {
    Scalar(T),
    Vector(Vec<T>),
}

impl<T: Real> From<T> for Tolerance<T> {
    fn from(val: T) -> Self {
        Tolerance::Scalar(val)
    }
}

impl<T: Real> From<&[T]> for Tolerance<T> {
    fn from(val: &[T]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<T: Real, const N: usize> From<[T; N]> for Tolerance<T> {
    fn from(val: [T; N]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<T: Real> From<Vec<T>> for Tolerance<T> {
    fn from(val: Vec<T>) -> Self {
        Tolerance::Vector(val)
    }
}

impl<T: Real> Index<usize> for Tolerance<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &vs[index],
        }
    }
}

/// Weighted RMS norm of `e` scaled by `atol + rtol * max(|y0|, |y1|)`.
pub(crate) fn error_norm<T: Real>(
    e: &[T],
    y0: &[T],
    y1: &[T],
    atol: &Tolerance<T>,
    rtol: &Tolerance<T>,
) -> T {
    let n = e.len();
    let mut err = T::zero();
    for i in 0..n {
        let sk = atol[i] + rtol[i] * y0[i].abs().max(y1[i].abs());
        err += (e[i] / sk) * (e[i] / sk);
    }
    (err / T::int(n as i64)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: Defaults = Defaults {
        safety_factor: 0.9,
        scale_min: 0.2,
        scale_max: 10.0,
        beta: 0.04,
    };

    #[test]
    fn defaults_resolve() {
        let control = Settings::<f64>::default().resolve(0.0, 2.0, &DEFAULTS).unwrap();
        assert_eq!(control.uround, f64::EPSILON);
        assert_eq!(control.facc1, 5.0);
        assert_eq!(control.facc2, 0.1);
        assert_eq!(control.hmax, 2.0);
        assert_eq!(control.nmax, 100_000);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let s = Settings::<f64>::builder().safety_factor(1.5).build();
        assert!(matches!(
            s.resolve(0.0, 1.0, &DEFAULTS),
            Err(Error::SafetyFactorOutOfRange(_))
        ));

        let s = Settings::<f64>::builder().nmax(0).build();
        assert!(matches!(
            s.resolve(0.0, 1.0, &DEFAULTS),
            Err(Error::NMaxMustBePositive(0))
        ));

        let s = Settings::<f64>::builder().beta(0.3).build();
        assert!(matches!(
            s.resolve(0.0, 1.0, &DEFAULTS),
            Err(Error::BetaTooLarge(_))
        ));

        let s = Settings::<f64>::builder().h0(0.0).build();
        assert!(matches!(
            s.resolve(0.0, 1.0, &DEFAULTS),
            Err(Error::InvalidStepSize(_))
        ));
    }

    #[test]
    fn tolerance_indexing() {
        let s = Tolerance::from(1e-6_f64);
        assert_eq!(s[3], 1e-6);
        let v = Tolerance::from([1e-3_f64, 1e-9]);
        assert_eq!(v[1], 1e-9);
    }
}
