//! Numerical methods

mod fixed;
mod hinit;

pub mod dp;
pub mod extrapolation;
pub mod rosenbrock;
pub mod settings;

pub use dp::{dopri5, dopri5_fixed};
pub use extrapolation::{bulirsch_stoer, bulirsch_stoer_fixed};
pub use rosenbrock::{rodas4, rodas4_fixed};
pub use settings::{Settings, Tolerance};
