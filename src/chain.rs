//! The linear decay chain model and its per-run evaluation context.

use crate::{
    core::ode::{Jacobian, ODE},
    error::{Error, Result},
    matrix::Matrix,
    real::Real,
};

/// Species `i` decays into species `i + 1` at rate `rates[i]`; the last
/// species has an outgoing rate but no daughter.
#[derive(Clone, Debug, PartialEq)]
pub struct DecayChain<T: Real> {
    rates: Vec<T>,
}

impl<T: Real> DecayChain<T> {
    /// Chain with arbitrary decay constants. Every rate must be finite and
    /// positive.
    pub fn new(rates: Vec<T>) -> Result<Self> {
        if rates.is_empty() {
            return Err(Error::InvalidConfig("a chain needs at least one species".into()));
        }
        if let Some(i) = rates.iter().position(|r| !(r.is_finite() && *r > T::zero())) {
            return Err(Error::InvalidConfig(format!(
                "rate {} of species {} is not a positive number",
                rates[i], i
            )));
        }
        Ok(Self { rates })
    }

    /// The analytically solvable family `rates[i] = (i + p + 1) ln a`.
    ///
    /// Requires `n >= 1`, `p >= 0` and `a >= 2`; for `a = 1` every rate
    /// vanishes and below that they turn negative or undefined.
    pub fn from_parameters(n: usize, p: i64, a: i64) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidConfig("N must be at least 1".into()));
        }
        if p < 0 {
            return Err(Error::InvalidConfig(format!("p must be non-negative (got {p})")));
        }
        if a < 2 {
            return Err(Error::InvalidConfig(format!("a must be at least 2 (got {a})")));
        }
        let loga = T::int(a).ln();
        let rates = (0..n)
            .map(|i| T::int(i as i64 + p + 1) * loga)
            .collect();
        Ok(Self { rates })
    }

    pub fn rates(&self) -> &[T] {
        &self.rates
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// `[1, 0, ..., 0]`: all population in the parent.
    pub fn initial_state(&self) -> Vec<T> {
        let mut y = vec![T::zero(); self.len()];
        y[0] = T::one();
        y
    }

    /// `dydx[i] = -rates[i] y[i] + rates[i-1] y[i-1]`.
    pub fn derivative(&self, y: &[T], dydx: &mut [T]) {
        let l = &self.rates;
        dydx[0] = -l[0] * y[0];
        for i in 1..l.len() {
            dydx[i] = l[i - 1] * y[i - 1] - l[i] * y[i];
        }
    }

    /// Lower bidiagonal Jacobian; the system is autonomous so `dfdx = 0`.
    pub fn jacobian(&self, j: &mut Matrix<T>, dfdx: &mut [T]) {
        let l = &self.rates;
        for i in 0..l.len() {
            j[(i, i)] = -l[i];
            if i > 0 {
                j[(i, i - 1)] = l[i - 1];
            }
        }
        dfdx.fill(T::zero());
    }
}

/// Evaluation counts of one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Right-hand side evaluations
    pub nrhs: usize,
    /// Jacobian evaluations
    pub njac: usize,
    /// LU decompositions
    pub nlu: usize,
}

/// A chain together with the counters of the run that integrates it. The
/// steppers see the chain only through this context.
#[derive(Debug)]
pub struct RunContext<T: Real> {
    chain: DecayChain<T>,
    counters: Counters,
}

impl<T: Real> RunContext<T> {
    pub fn new(chain: DecayChain<T>) -> Self {
        Self {
            chain,
            counters: Counters::default(),
        }
    }

    pub fn chain(&self) -> &DecayChain<T> {
        &self.chain
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub(crate) fn reset(&mut self) {
        self.counters = Counters::default();
    }

    pub(crate) fn record_lu(&mut self, nlu: usize) {
        self.counters.nlu += nlu;
    }
}

impl<T: Real> ODE<T> for RunContext<T> {
    fn ode(&mut self, _x: T, y: &[T], dydx: &mut [T]) {
        self.counters.nrhs += 1;
        self.chain.derivative(y, dydx);
    }
}

impl<T: Real> Jacobian<T> for RunContext<T> {
    fn jac(&mut self, _x: T, _y: &[T], j: &mut Matrix<T>, dfdx: &mut [T]) {
        self.counters.njac += 1;
        self.chain.jacobian(j, dfdx);
    }

    fn jac_matrix(&self, n: usize) -> Matrix<T> {
        Matrix::banded(n, 1, 0)
    }
}
