use approx::assert_abs_diff_eq;
use decay_chain::prelude::*;

mod common;
use common::{small_chain, terminal, ADAPTIVE, FIXED};

#[test]
fn time_is_monotonic_and_rows_match_steps() {
    for method in ADAPTIVE.into_iter().chain(FIXED) {
        let out = run::<f64>(&small_chain(method)).unwrap();
        let xs = &out.trajectory.xout;
        assert_eq!(out.trajectory.len(), out.naccpt + 1, "method {method}");
        assert_eq!(xs[0], 0.0);
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "method {method}");
        assert_abs_diff_eq!(*xs.last().unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(out.trajectory.row(0).1, &[1.0, 0.0, 0.0, 0.0, 0.0]);
    }
}

#[test]
fn identical_configs_give_identical_runs() {
    for method in [0, 4, 8] {
        let config = small_chain(method);
        let first = run::<f64>(&config).unwrap();
        let second = run::<f64>(&config).unwrap();
        assert_eq!(first.trajectory, second.trajectory);
        assert_eq!(first.counters, second.counters);
        assert_eq!(first.naccpt, second.naccpt);
    }
}

#[test]
fn unknown_method_is_rejected_before_any_work() {
    let chain = DecayChain::<f64>::from_parameters(5, 1, 5).unwrap();
    let mut ctx = RunContext::new(chain);
    let err = run_with(&mut ctx, &small_chain(99)).unwrap_err();
    assert!(matches!(err, Error::UnknownMethod(99)));
    assert_eq!(err.kind(), decay_chain::ErrorKind::Configuration);
    assert_eq!(ctx.counters().nrhs, 0);
    assert_eq!(ctx.counters().njac, 0);

    assert!(matches!(
        run::<f64>(&small_chain(-1)),
        Err(Error::UnknownMethod(-1))
    ));
}

#[test]
fn invalid_chain_parameters() {
    for (n, p, a) in [(0, 1, 27), (5, -1, 27), (5, 1, 1)] {
        let config = IntegrationConfig::builder().n(n).p(p).a(a).build();
        assert!(matches!(run::<f64>(&config), Err(Error::InvalidConfig(_))));
    }
}

#[test]
fn oversized_fixed_step_takes_one_step() {
    for method in FIXED {
        let config = IntegrationConfig::builder()
            .n(1)
            .p(0)
            .a(2)
            .log10_dx0(1)
            .method(method)
            .build();
        let out = run::<f64>(&config).unwrap();
        assert_eq!(out.naccpt, 1);
        assert_eq!(out.trajectory.xout, vec![0.0, 10.0]);
        assert!(terminal(&out)[0].is_finite());
    }
}

#[test]
fn oversized_dopri5_step_is_one_runge_kutta_update() {
    let config = IntegrationConfig::builder()
        .n(1)
        .p(0)
        .a(2)
        .log10_dx0(1)
        .method(7)
        .build();
    let out = run::<f64>(&config).unwrap();

    // Stability polynomial of the fifth order Dormand-Prince solution.
    let z = -10.0 * std::f64::consts::LN_2;
    let r = 1.0
        + z
        + z.powi(2) / 2.0
        + z.powi(3) / 6.0
        + z.powi(4) / 24.0
        + z.powi(5) / 120.0
        + z.powi(6) / 600.0;
    assert_abs_diff_eq!(terminal(&out)[0], r, epsilon = 1e-12 * r.abs());
}

#[test]
fn counters_follow_the_method_family() {
    let rodas = run::<f64>(&small_chain(3)).unwrap();
    assert!(rodas.counters.njac >= 1);
    assert!(rodas.counters.nlu >= rodas.naccpt);

    for method in [4, 5, 7, 8] {
        let out = run::<f64>(&small_chain(method)).unwrap();
        assert_eq!(out.counters.njac, 0, "method {method}");
        assert_eq!(out.counters.nlu, 0, "method {method}");
        assert!(out.counters.nrhs > out.naccpt);
    }
}

#[test]
fn run_with_leaves_counters_readable() {
    let chain = DecayChain::<f64>::from_parameters(5, 1, 5).unwrap();
    let mut ctx = RunContext::new(chain);
    let out = run_with(&mut ctx, &small_chain(1)).unwrap();
    assert_eq!(ctx.counters(), out.counters);

    let mut starved = small_chain(4);
    starved.max_steps = Some(2);
    assert!(run_with(&mut ctx, &starved).is_err());
    assert!(ctx.counters().nrhs > 0);
    assert!(ctx.counters().nrhs < out.counters.nrhs);
}

#[test]
fn dense_output_samples_and_interpolants() {
    let chain = DecayChain::<f64>::from_parameters(5, 1, 5).unwrap();
    for method in [0, 1, 2, 4] {
        let mut config = small_chain(method);
        config.dense = true;
        config.t_eval = Some(vec![0.25, 0.5, 0.75, 1.0]);
        let out = run::<f64>(&config).unwrap();
        assert_eq!(out.trajectory.xout, vec![0.25, 0.5, 0.75, 1.0]);

        let dense = out.dense.unwrap();
        let interps = dense.evaluate_many(&out.trajectory.xout);
        for ((t, y), interp) in out.trajectory.rows().zip(interps) {
            let exact = bateman(chain.rates(), t);
            let interp = interp.unwrap();
            for j in 0..5 {
                assert_abs_diff_eq!(y[j], exact[j], epsilon = 1e-8);
                assert_abs_diff_eq!(interp[j], y[j], epsilon = 1e-8);
            }
        }
        assert!(dense.evaluate(2.0).is_none(), "method {method}");
    }
}

#[test]
fn dense_trajectories_differ_from_mesh_trajectories() {
    let chain = DecayChain::<f64>::from_parameters(5, 1, 5).unwrap();
    for (dense, plain) in [(0, 3), (1, 4), (2, 5)] {
        let dense_out = run::<f64>(&small_chain(dense)).unwrap();
        let plain_out = run::<f64>(&small_chain(plain)).unwrap();
        assert_eq!(dense_out.trajectory.len(), dense_out.naccpt + 1);
        assert_ne!(
            dense_out.trajectory.xout, plain_out.trajectory.xout,
            "methods {dense} and {plain}"
        );

        // Interior rows come from the interpolants, at evenly spaced times.
        let spacing = 1.0 / dense_out.naccpt as f64;
        for (i, (t, y)) in dense_out.trajectory.rows().enumerate() {
            assert_abs_diff_eq!(t, i as f64 * spacing, epsilon = 1e-14);
            let exact = bateman(chain.rates(), t);
            for j in 0..5 {
                assert_abs_diff_eq!(y[j], exact[j], epsilon = 1e-8);
            }
        }
        let (tend, y) = dense_out.trajectory.last().unwrap();
        assert_eq!(tend, 1.0);
        assert!(check(y, 1, 5.0, 1e-8, 1e-8).passed());
    }
}
