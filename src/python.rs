use numpy::{PyArray1, PyArray2, PyArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::{
    analytic::references,
    error::Error,
    solve::{run, IntegrationConfig},
};

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Integration output as `(naccpt, xout, yout, nrhs, njac)`.
type Integrated<'py> = (
    usize,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray2<f64>>,
    usize,
    usize,
);

#[pyfunction]
#[pyo3(signature = (log10_atol=-12, log10_rtol=-12, log10_tend=0, log10_dx0=-14, n=27, p=1, a=27, method=0, dense=false))]
/// Integrate the decay chain and return the recorded trajectory.
///
/// Parameters
/// ----------
/// log10_atol, log10_rtol : int
///     Exponents of the absolute and relative tolerance.
/// log10_tend : int
///     Exponent of the end time.
/// log10_dx0 : int
///     Exponent of the initial (adaptive) or constant (fixed-step) step.
/// n, p, a : int
///     Chain length and rate parameters, ``k_j = (j + p + 1) ln a``.
/// method : int
///     0-2 dense, 3-5 adaptive, 6-8 fixed step for RODAS4, DOPRI5 and
///     Bulirsch-Stoer.
/// dense : bool
///     Upgrade methods 3-5 to dense output.
///
/// Returns
/// -------
/// tuple
///     ``(naccpt, xout, yout, nrhs, njac)`` with ``yout`` of shape
///     ``(rows, n)``.
#[allow(clippy::too_many_arguments)]
fn integrate<'py>(
    py: Python<'py>,
    log10_atol: i32,
    log10_rtol: i32,
    log10_tend: i32,
    log10_dx0: i32,
    n: usize,
    p: i64,
    a: i64,
    method: i32,
    dense: bool,
) -> PyResult<Integrated<'py>> {
    let config = IntegrationConfig::builder()
        .log10_atol(log10_atol)
        .log10_rtol(log10_rtol)
        .log10_tend(log10_tend)
        .log10_dx0(log10_dx0)
        .n(n)
        .p(p)
        .a(a)
        .method(method)
        .dense(dense)
        .build();

    let out = py.detach(|| run::<f64>(&config)).map_err(to_py_err)?;
    let rows = out.trajectory.len();
    let xout = PyArray1::from_vec(py, out.trajectory.xout);
    let yout = PyArray1::from_vec(py, out.trajectory.yout).reshape((rows, n))?;

    Ok((
        out.naccpt,
        xout,
        yout,
        out.counters.nrhs,
        out.counters.njac,
    ))
}

#[pyfunction]
#[pyo3(signature = (n=27, p=1, a=27))]
/// Analytic populations of the ``n`` first species at ``t = 1``.
fn reference<'py>(py: Python<'py>, n: usize, p: i64, a: i64) -> PyResult<Bound<'py, PyArray1<f64>>> {
    if p < 0 || a < 2 {
        return Err(to_py_err(Error::InvalidConfig(format!(
            "need p >= 0 and a >= 2 (got p = {p}, a = {a})"
        ))));
    }
    Ok(PyArray1::from_vec(py, references(n, p as usize, a as f64)))
}

#[pymodule]
fn decay_chain(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(integrate, m)?)?;
    m.add_function(wrap_pyfunction!(reference, m)?)?;

    let doc = "Linear decay chain integration with RODAS4, DOPRI5 and Bulirsch-Stoer.\n\n\
               `integrate` runs one configuration and returns the trajectory;\n\
               `reference` gives the analytic populations at t = 1.";
    m.setattr("__doc__", doc)?;

    Ok(())
}
