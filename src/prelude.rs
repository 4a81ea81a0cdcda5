//! Convenient prelude: import the most commonly used traits, types, and functions.
//!
//! Bring this into scope with:
//!
//! ```rust
//! use decay_chain::prelude::*;
//! ```

pub use crate::analytic::{bateman, reference};
pub use crate::chain::{Counters, DecayChain, RunContext};
pub use crate::core::{
    interpolate::Interpolate,
    ode::{Jacobian, ODE},
    solout::{ControlFlag, SolOut},
    status::Status,
};
pub use crate::matrix::Matrix;
pub use crate::methods::{Settings, Tolerance};
pub use crate::solve::{run, run_with, IntegrationConfig, Method, RunOutput, Trajectory};
pub use crate::validate::{check, Validation};
pub use crate::{Error, Real};
