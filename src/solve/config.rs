//! Run configuration.

use bon::Builder;

use crate::real::{pow10, Real};

/// Everything that determines a run. Tolerances, end time and initial step
/// are powers of ten given by their integer exponents.
///
/// The defaults reproduce the reference problem: 27 species, `p = 1`,
/// `a = 27`, `atol = rtol = 1e-12`, `tend = 1`, `dx0 = 1e-14`, RODAS4 with
/// dense output.
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct IntegrationConfig {
    #[builder(default = -12)]
    pub log10_atol: i32,
    #[builder(default = -12)]
    pub log10_rtol: i32,
    #[builder(default = 0)]
    pub log10_tend: i32,
    /// Initial step of adaptive runs, constant step of fixed-step runs.
    #[builder(default = -14)]
    pub log10_dx0: i32,
    /// Number of species
    #[builder(default = 27)]
    pub n: usize,
    #[builder(default = 1)]
    pub p: i64,
    #[builder(default = 27)]
    pub a: i64,
    /// Method code, see [`Method`](super::Method).
    #[builder(default = 0)]
    pub method: i32,
    /// Upgrade adaptive methods 3-5 to dense output.
    #[builder(default = false)]
    pub dense: bool,
    /// Record the trajectory at these times (ascending, within `[0, tend]`)
    /// through the step interpolant instead of at the mesh points. Dense
    /// methods only.
    pub t_eval: Option<Vec<f64>>,
    /// Step budget of the stepper (default 100 000).
    pub max_steps: Option<usize>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl IntegrationConfig {
    pub fn atol<T: Real>(&self) -> T {
        pow10(self.log10_atol)
    }

    pub fn rtol<T: Real>(&self) -> T {
        pow10(self.log10_rtol)
    }

    pub fn tend<T: Real>(&self) -> T {
        pow10(self.log10_tend)
    }

    pub fn dx0<T: Real>(&self) -> T {
        pow10(self.log10_dx0)
    }
}
