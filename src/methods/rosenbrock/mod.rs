//! Rosenbrock (linearly implicit) methods for stiff problems

mod rodas4;

pub use rodas4::{rodas4, rodas4_fixed};
