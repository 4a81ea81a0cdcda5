//! Dormand-Prince Runge Kutta methods

mod dopri5;

pub use dopri5::{contdp5, dopri5, dopri5_fixed, Dp5Dense};
