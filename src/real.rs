//! Numeric type abstraction shared by the model, the steppers and the validator.

use std::fmt::{Debug, Display, LowerExp};
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

use num_traits::{Float, FromPrimitive};

/// Real number type the harness is generic over.
///
/// `f32` and `f64` are provided, and `twofloat::TwoFloat` (about 32
/// significant digits) with the `extended` feature. Any other
/// [`num_traits::Float`] type can be plugged in by implementing the two
/// constructors below; nothing in the crate assumes IEEE double rounding.
pub trait Real:
    Float
    + FromPrimitive
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Sum
    + Debug
    + Display
    + LowerExp
    + Send
    + Sync
    + 'static
{
    /// Significant decimal digits used when printing values of this type.
    const DIGITS: usize;

    /// Short name of the precision, used in logs.
    const NAME: &'static str;

    /// Convert a literal constant (coefficients, safety factors, ...).
    fn lit(v: f64) -> Self;

    /// Convert an integer count or index.
    fn int(n: i64) -> Self;

    /// Lossy conversion for error payloads and diagnostics.
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl Real for f32 {
    const DIGITS: usize = 9;
    const NAME: &'static str = "f32";

    #[inline]
    fn lit(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn int(n: i64) -> Self {
        n as f32
    }
}

impl Real for f64 {
    const DIGITS: usize = 17;
    const NAME: &'static str = "f64";

    #[inline]
    fn lit(v: f64) -> Self {
        v
    }

    #[inline]
    fn int(n: i64) -> Self {
        n as f64
    }
}

#[cfg(feature = "extended")]
impl Real for twofloat::TwoFloat {
    const DIGITS: usize = 32;
    const NAME: &'static str = "twofloat";

    #[inline]
    fn lit(v: f64) -> Self {
        Self::from(v)
    }

    /// Exact for every `i64`: the part lost when rounding to `f64` is added
    /// back as the low word.
    fn int(n: i64) -> Self {
        let hi = n as f64;
        let lo = (n as i128 - hi as i128) as f64;
        Self::from(hi) + Self::from(lo)
    }
}

/// The fraction `p / q` rounded once in the target precision.
pub fn ratio<T: Real>((p, q): (i64, i64)) -> T {
    T::int(p) / T::int(q)
}

/// `10^e` computed in the target precision.
pub fn pow10<T: Real>(e: i32) -> T {
    T::int(10).powi(e)
}

/// Format a value with `T::DIGITS` significant digits.
pub fn format_real<T: Real>(v: T) -> String {
    format!("{:.*e}", T::DIGITS - 1, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow10_matches_literals() {
        assert_eq!(pow10::<f64>(0), 1.0);
        assert_eq!(pow10::<f64>(3), 1000.0);
        assert!((pow10::<f64>(-12) - 1e-12).abs() < 1e-27);
        assert!((pow10::<f32>(-3) - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn ratio_rounds_once() {
        assert_eq!(ratio::<f64>((19372, 6561)), 19372.0 / 6561.0);
        assert_eq!(ratio::<f32>((-1, 40)), -0.025_f32);
        assert_eq!(ratio::<f64>((0, 1)), 0.0);
    }

    #[cfg(feature = "extended")]
    #[test]
    fn twofloat_carries_more_digits_than_f64() {
        use twofloat::TwoFloat;

        let third: TwoFloat = ratio((1, 3));
        let residual = third * TwoFloat::int(3) - TwoFloat::int(1);
        assert!(residual.abs().to_f64_lossy() < 1e-30);
        // 1/3 is not representable in f64; the low word holds the rest.
        let f64_third = TwoFloat::lit(1.0 / 3.0);
        assert!((third - f64_third).abs().to_f64_lossy() > 1e-18);

        let big = (1_i64 << 60) + 1;
        assert_eq!(TwoFloat::int(big) - TwoFloat::int(1 << 60), TwoFloat::int(1));
        assert!(pow10::<TwoFloat>(-12).to_f64_lossy() > 0.0);
    }

    #[test]
    fn format_uses_precision_digits() {
        // 17 significant digits: one before the point, 16 after.
        assert_eq!(format_real(0.5_f64), "5.0000000000000000e-1");
        assert_eq!(format_real(0.5_f32), "5.00000000e-1");
    }
}
