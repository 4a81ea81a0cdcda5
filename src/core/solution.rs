//! A struct representing the outputted result of a numerical integrator.

use crate::{core::status::Status, real::Real};

/// Step counters of a single integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Steps {
    /// All attempted steps
    pub total: usize,
    /// Steps that passed the error test (every step for fixed-step runs)
    pub accepted: usize,
    /// Steps that failed the error test
    pub rejected: usize,
}

/// The output of a numerical integrator
#[derive(Clone, Debug)]
pub struct IntegrationResult<T: Real> {
    /// The final value of the independent variable
    pub x: T,
    /// The step size proposed for the next step
    pub h: T,
    /// The status of the integration process
    pub status: Status,
    /// Step statistics
    pub steps: Steps,
    /// LU decompositions of the iteration matrix (implicit methods only)
    pub nlu: usize,
}

impl<T: Real> IntegrationResult<T> {
    pub fn new(x: T, h: T, status: Status, steps: Steps) -> Self {
        Self {
            x,
            h,
            status,
            steps,
            nlu: 0,
        }
    }
}
