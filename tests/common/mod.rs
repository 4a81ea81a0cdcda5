#![allow(dead_code)]

use decay_chain::prelude::*;

/// Method codes with an error-controlled step (with and without dense output).
pub const ADAPTIVE: [i32; 6] = [0, 1, 2, 3, 4, 5];
pub const FIXED: [i32; 3] = [6, 7, 8];

/// The 27-species problem at `atol = rtol = 1e-12`.
pub fn reference_problem(method: i32) -> IntegrationConfig {
    IntegrationConfig::builder().method(method).build()
}

/// A short chain that every method, fixed-step included, integrates quickly.
pub fn small_chain(method: i32) -> IntegrationConfig {
    IntegrationConfig::builder()
        .n(5)
        .p(1)
        .a(5)
        .log10_atol(-10)
        .log10_rtol(-10)
        .log10_dx0(-3)
        .method(method)
        .build()
}

/// Terminal state of a successful run.
pub fn terminal<T: Real>(out: &RunOutput<T>) -> Vec<T> {
    let (_, y) = out.trajectory.last().expect("trajectory has rows");
    y.to_vec()
}
