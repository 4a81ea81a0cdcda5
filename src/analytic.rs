//! Closed-form solutions of the decay chain.

use crate::real::Real;

/// Binomial coefficient `C(n, k)` evaluated in `T`.
pub fn binomial<T: Real>(n: usize, k: usize) -> T {
    if k > n {
        return T::zero();
    }
    let k = k.min(n - k);
    let mut c = T::one();
    for i in 1..=k {
        c = c * T::int((n - k + i) as i64) / T::int(i as i64);
    }
    c
}

/// Exact population of species `j` at `t = 1` for the chain
/// `rates[i] = (i + p + 1) ln a` started from `[1, 0, ...]`:
///
/// `C(p + j, p) * a^(-1-p) * ((a - 1) / a)^j`
///
/// The value does not depend on the chain length, since species `j` only
/// sees its ancestors.
pub fn reference<T: Real>(j: usize, p: usize, a: T) -> T {
    binomial::<T>(p + j, p) * a.powi(-1 - p as i32) * ((a - T::one()) / a).powi(j as i32)
}

/// [`reference`] for species `0..n`.
pub fn references<T: Real>(n: usize, p: usize, a: T) -> Vec<T> {
    (0..n).map(|j| reference(j, p, a)).collect()
}

/// Bateman solution of a chain with pairwise distinct `rates` at time `t`,
/// all population starting in the parent:
///
/// `y_j(t) = (prod_{k<j} l_k) sum_{i<=j} exp(-l_i t) / prod_{k<=j, k!=i} (l_k - l_i)`
///
/// The alternating sum cancels heavily for long chains; evaluate in a wide
/// type when many digits matter.
pub fn bateman<T: Real>(rates: &[T], t: T) -> Vec<T> {
    let mut out = Vec::with_capacity(rates.len());
    let mut prefactor = T::one();
    for j in 0..rates.len() {
        if j > 0 {
            prefactor *= rates[j - 1];
        }
        let mut sum = T::zero();
        for i in 0..=j {
            let mut denom = T::one();
            for k in 0..=j {
                if k != i {
                    denom *= rates[k] - rates[i];
                }
            }
            sum += (-rates[i] * t).exp() / denom;
        }
        out.push(prefactor * sum);
    }
    out
}
