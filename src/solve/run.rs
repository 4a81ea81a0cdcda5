//! The integration driver.

use tracing::{debug, warn};

use crate::{
    chain::{Counters, DecayChain, RunContext},
    core::{solution::IntegrationResult, status::Status},
    error::{Error, Result},
    methods::{
        bulirsch_stoer, bulirsch_stoer_fixed, dopri5, dopri5_fixed, rodas4, rodas4_fixed,
        Settings, Tolerance,
    },
    real::Real,
};

use super::{
    config::IntegrationConfig,
    cont::ContinuousOutput,
    method::{Discipline, Family, Method},
    recorder::{Trajectory, TrajectoryRecorder},
};

/// Default step budget of every stepper.
const DEFAULT_MAX_STEPS: usize = 100_000;

/// Result of a successful run.
#[derive(Clone, Debug)]
pub struct RunOutput<T: Real> {
    /// Accepted steps (every step of a fixed-step run)
    pub naccpt: usize,
    pub trajectory: Trajectory<T>,
    pub counters: Counters,
    /// Step interpolants of dense runs
    pub dense: Option<ContinuousOutput<T>>,
}

/// Integrate the chain described by `config` from `[1, 0, ..., 0]` at
/// `x = 0` to `tend`.
///
/// The method code is checked before anything else. Without
/// `config.t_eval` the trajectory starts with the initial state and holds
/// one more row than there are accepted steps. Those rows sit on the step
/// mesh, except for dense methods: there they are spread evenly over
/// `[0, tend]` and the interior rows come from the step interpolants.
///
/// # Example
///
/// ```
/// use decay_chain::prelude::*;
///
/// let config = IntegrationConfig::builder()
///     .n(2)
///     .p(0)
///     .a(2)
///     .log10_atol(-10)
///     .log10_rtol(-10)
///     .log10_dx0(-6)
///     .method(4)
///     .build();
/// let out = run::<f64>(&config).unwrap();
/// let (_, terminal) = out.trajectory.last().unwrap();
/// assert!(check(terminal, 0, 2.0, 1e-8, 1e-8).passed());
/// ```
pub fn run<T: Real>(config: &IntegrationConfig) -> Result<RunOutput<T>> {
    Method::try_from(config.method)?;
    let chain = DecayChain::from_parameters(config.n, config.p, config.a)?;
    let mut ctx = RunContext::new(chain);
    run_with(&mut ctx, config)
}

/// [`run`] over a caller-owned context: the chain of `ctx` is integrated
/// and its counters stay readable after the call, successful or not.
/// `config.n`, `config.p` and `config.a` are not consulted.
pub fn run_with<T: Real>(
    ctx: &mut RunContext<T>,
    config: &IntegrationConfig,
) -> Result<RunOutput<T>> {
    let method = Method::try_from(config.method)?.with_dense(config.dense);
    ctx.reset();

    let n = ctx.chain().len();
    let x0 = T::zero();
    let xend: T = config.tend();
    let dx0: T = config.dx0();
    let atol: T = config.atol();
    let rtol: T = config.rtol();
    let t_eval = sample_times(config, method, x0, xend)?;
    let nmax = config.max_steps.unwrap_or(DEFAULT_MAX_STEPS);

    debug!(
        %method,
        precision = T::NAME,
        n,
        atol = %atol,
        rtol = %rtol,
        tend = %xend,
        dx0 = %dx0,
        "starting integration"
    );

    let mut y = ctx.chain().initial_state();
    let dense = method.discipline.is_dense();
    let mut recorder = TrajectoryRecorder::new(n, t_eval, dense);
    let settings = Settings::builder().h0(dx0).nmax(nmax).build();

    let res = match (method.family, method.discipline) {
        (Family::Rodas4, Discipline::Fixed) => {
            rodas4_fixed(ctx, x0, xend, &mut y, dx0, &mut recorder, &settings)
        }
        (Family::Dopri5, Discipline::Fixed) => {
            dopri5_fixed(ctx, x0, xend, &mut y, dx0, &mut recorder, &settings)
        }
        (Family::BulirschStoer, Discipline::Fixed) => {
            bulirsch_stoer_fixed(ctx, x0, xend, &mut y, dx0, &mut recorder, &settings)
        }
        (Family::Rodas4, _) => rodas4(
            ctx,
            x0,
            xend,
            &mut y,
            Tolerance::Scalar(rtol),
            Tolerance::Scalar(atol),
            &mut recorder,
            dense,
            &settings,
        ),
        (Family::Dopri5, _) => dopri5(
            ctx,
            x0,
            xend,
            &mut y,
            Tolerance::Scalar(rtol),
            Tolerance::Scalar(atol),
            &mut recorder,
            dense,
            &settings,
        ),
        (Family::BulirschStoer, _) => bulirsch_stoer(
            ctx,
            x0,
            xend,
            &mut y,
            Tolerance::Scalar(rtol),
            Tolerance::Scalar(atol),
            &mut recorder,
            dense,
            &settings,
        ),
    }?;
    ctx.record_lu(res.nlu);

    let counters = ctx.counters();
    if let Some(err) = failure(&res, nmax) {
        warn!(
            %method,
            nrhs = counters.nrhs,
            steps = res.steps.total,
            "integration failed: {err}"
        );
        return Err(err);
    }

    debug!(
        %method,
        naccpt = res.steps.accepted,
        nrejct = res.steps.rejected,
        nrhs = counters.nrhs,
        njac = counters.njac,
        nlu = counters.nlu,
        "integration finished"
    );

    let (mut trajectory, segments) = recorder.into_parts();
    let dense = segments.map(|s| ContinuousOutput::from_segments(method.family, s));
    if let (Some(cont), None) = (dense.as_ref(), config.t_eval.as_ref()) {
        trajectory = cont.resample(&trajectory);
    }
    Ok(RunOutput {
        naccpt: res.steps.accepted,
        trajectory,
        counters,
        dense,
    })
}

/// Validated sample times converted to `T`.
fn sample_times<T: Real>(
    config: &IntegrationConfig,
    method: Method,
    x0: T,
    xend: T,
) -> Result<Option<Vec<T>>> {
    let Some(t_eval) = config.t_eval.as_ref() else {
        return Ok(None);
    };
    if !method.discipline.is_dense() {
        return Err(Error::InvalidConfig(format!(
            "sample times need a dense method, {method} has none"
        )));
    }
    let ts: Vec<T> = t_eval.iter().map(|&t| T::lit(t)).collect();
    if ts.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(Error::InvalidConfig(
            "sample times must be strictly increasing".into(),
        ));
    }
    if ts.iter().any(|&t| !(t >= x0 && t <= xend)) {
        return Err(Error::InvalidConfig(format!(
            "sample times must lie within [{x0}, {xend}]"
        )));
    }
    Ok(Some(ts))
}

/// Map a stepper status that did not reach `xend` to its error.
fn failure<T: Real>(res: &IntegrationResult<T>, nmax: usize) -> Option<Error> {
    let x = res.x.to_f64_lossy();
    match res.status {
        Status::Success | Status::Interrupted => None,
        Status::NeedLargerNmax => Some(Error::NeedLargerNmax { x, nmax }),
        Status::StepSizeTooSmall => Some(Error::StepSizeTooSmall {
            x,
            h: res.h.to_f64_lossy(),
        }),
        Status::ProbablyStiff => Some(Error::ProbablyStiff { x }),
        Status::SingularMatrix => Some(Error::SingularMatrix { x }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(method: i32) -> IntegrationConfig {
        IntegrationConfig::builder()
            .n(4)
            .p(0)
            .a(3)
            .log10_atol(-10)
            .log10_rtol(-10)
            .log10_dx0(-8)
            .method(method)
            .build()
    }

    #[test]
    fn unknown_method_does_no_work() {
        let mut ctx = RunContext::new(DecayChain::<f64>::from_parameters(3, 0, 2).unwrap());
        let err = run_with(&mut ctx, &small(99)).unwrap_err();
        assert!(matches!(err, Error::UnknownMethod(99)));
        assert_eq!(ctx.counters().nrhs, 0);
    }

    #[test]
    fn unknown_method_wins_over_bad_parameters() {
        let config = IntegrationConfig::builder().n(0).method(12).build();
        assert!(matches!(run::<f64>(&config), Err(Error::UnknownMethod(12))));
    }

    #[test]
    fn jacobian_only_for_rodas4() {
        let out = run::<f64>(&small(3)).unwrap();
        assert!(out.counters.njac > 0);
        assert!(out.counters.nlu > 0);
        let out = run::<f64>(&small(4)).unwrap();
        assert_eq!(out.counters.njac, 0);
        assert_eq!(out.counters.nlu, 0);
    }

    #[test]
    fn dense_runs_keep_interpolants() {
        let out = run::<f64>(&small(1)).unwrap();
        let dense = out.dense.unwrap();
        assert_eq!(dense.len(), out.naccpt);
        let (start, end) = dense.t_span().unwrap();
        assert_eq!(start, 0.0);
        assert!((end - 1.0).abs() < 1e-15);
        assert!(run::<f64>(&small(4)).unwrap().dense.is_none());
    }

    #[test]
    fn dense_rows_are_evenly_spaced() {
        let out = run::<f64>(&small(0)).unwrap();
        let rows = out.trajectory.len();
        assert_eq!(rows, out.naccpt + 1);
        let step = 1.0 / out.naccpt as f64;
        for (i, &t) in out.trajectory.xout.iter().enumerate() {
            assert!((t - i as f64 * step).abs() < 1e-14, "row {i} at {t}");
        }
    }

    #[test]
    fn sample_times_need_dense_output() {
        let mut config = small(4);
        config.t_eval = Some(vec![0.5, 1.0]);
        assert!(matches!(run::<f64>(&config), Err(Error::InvalidConfig(_))));
        config.dense = true;
        let out = run::<f64>(&config).unwrap();
        assert_eq!(out.trajectory.xout, vec![0.5, 1.0]);

        config.t_eval = Some(vec![1.0, 0.5]);
        assert!(matches!(run::<f64>(&config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn exhausted_step_budget_is_an_error() {
        let mut config = small(4);
        config.max_steps = Some(3);
        assert!(matches!(
            run::<f64>(&config),
            Err(Error::NeedLargerNmax { nmax: 3, .. })
        ));
    }
}
