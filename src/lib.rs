//! Integration harness for linear decay chains.
//!
//! A chain of `N` species, species `i` decaying into species `i + 1` at rate
//! `lmbd[i]`, is integrated with one of three stepper families (RODAS4,
//! DOPRI5, Bulirsch–Stoer) under a fixed-step or an adaptive discipline, and
//! the result is checked against the closed-form solution.
//!
//! The rate family `lmbd[i] = (i + p + 1) ln a` has the exact state
//! `C(p + j, p) a^(-1-p) ((a - 1) / a)^j` at `t = 1`, see
//! [`analytic::reference`].
//!
//! Everything is generic over the [`Real`] number type.

pub mod analytic;
pub mod chain;
pub mod core;
mod error;
pub mod matrix;
pub mod methods;
pub mod prelude;
mod real;
pub mod records;
pub mod solve;
pub mod validate;

#[cfg(feature = "python")]
mod python;

pub use error::{Error, ErrorKind, Result};
pub use real::{format_real, pow10, ratio, Real};
