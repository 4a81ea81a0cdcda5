//! decay-chain CLI

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use decay_chain::{
    chain::DecayChain,
    records::{process, write_trajectory, Mode},
    solve::{run, IntegrationConfig},
    validate::check_terminal,
    Real,
};

#[derive(Parser)]
#[command(name = "decay-chain")]
#[command(about = "Integrate a linear decay chain and check it against the Bateman solution")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Integrate the chain, print the trajectory and validate the end state
    #[command(allow_negative_numbers = true)]
    Integrate {
        /// Absolute tolerance exponent
        #[arg(default_value_t = -12)]
        log10_atol: i32,

        /// Relative tolerance exponent
        #[arg(default_value_t = -12)]
        log10_rtol: i32,

        /// End time exponent
        #[arg(default_value_t = 0)]
        log10_tend: i32,

        /// Initial (or constant) step exponent
        #[arg(default_value_t = -14)]
        log10_dx0: i32,

        /// Number of species
        #[arg(default_value_t = 27)]
        n: usize,

        #[arg(default_value_t = 1)]
        p: i64,

        #[arg(default_value_t = 27)]
        a: i64,

        /// 0-2 dense, 3-5 adaptive, 6-8 fixed step (RODAS4, DOPRI5, Bulirsch-Stoer)
        #[arg(default_value_t = 0)]
        method: i32,

        /// Upgrade adaptive methods 3-5 to dense output
        #[arg(long)]
        dense: bool,

        /// Print K evenly spaced samples in (0, tend] instead of the step mesh.
        #[arg(long, value_name = "K")]
        samples: Option<usize>,

        #[arg(long, value_enum, default_value_t = Precision::F64)]
        precision: Precision,

        /// Step budget of the stepper
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Answer `<t> [<ref_0> ... <ref_{N-1}>]` lines from stdin with Bateman values
    Analytic {
        n: usize,
        p: i64,
        a: i64,

        /// Print computed minus supplied reference instead of the values
        #[arg(long)]
        diff: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Precision {
    F32,
    F64,
    /// Double-double, about 32 significant digits
    #[cfg(feature = "extended")]
    Twofloat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Integrate {
            log10_atol,
            log10_rtol,
            log10_tend,
            log10_dx0,
            n,
            p,
            a,
            method,
            dense,
            samples,
            precision,
            max_steps,
        } => {
            let config = IntegrationConfig {
                log10_atol,
                log10_rtol,
                log10_tend,
                log10_dx0,
                n,
                p,
                a,
                method,
                dense: dense || samples.is_some(),
                t_eval: samples.map(|k| sample_grid(k, log10_tend)),
                max_steps,
            };
            match precision {
                Precision::F32 => cmd_integrate::<f32>(&config),
                Precision::F64 => cmd_integrate::<f64>(&config),
                #[cfg(feature = "extended")]
                Precision::Twofloat => cmd_integrate::<twofloat::TwoFloat>(&config),
            }
        }
        Commands::Analytic { n, p, a, diff } => cmd_analytic(n, p, a, diff),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// `k` evenly spaced times in `(0, 10^log10_tend]`, the last one exactly at
/// the end time.
fn sample_grid(k: usize, log10_tend: i32) -> Vec<f64> {
    let tend = 10f64.powi(log10_tend);
    (1..=k)
        .map(|i| if i == k { tend } else { tend * i as f64 / k as f64 })
        .collect()
}

fn cmd_integrate<T: Real>(config: &IntegrationConfig) -> Result<ExitCode> {
    let out = run::<T>(config)
        .with_context(|| format!("integrating with method {}", config.method))?;

    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    write_trajectory(&out.trajectory, &mut w).context("writing trajectory")?;
    w.flush().context("writing trajectory")?;

    info!(
        naccpt = out.naccpt,
        nrhs = out.counters.nrhs,
        njac = out.counters.njac,
        nlu = out.counters.nlu,
        "run statistics"
    );

    // The chain was already validated by `run`.
    let chain = DecayChain::<T>::from_parameters(config.n, config.p, config.a)?;
    let Some(validation) = check_terminal(
        &out.trajectory,
        chain.rates(),
        config.p as usize,
        T::int(config.a),
        config.atol(),
        config.rtol(),
    ) else {
        anyhow::bail!("empty trajectory");
    };

    if validation.passed() {
        info!(worst = %validation.worst_ratio(), "validation passed");
        Ok(ExitCode::SUCCESS)
    } else {
        for j in validation.failures() {
            warn!(
                species = j,
                deviation = %validation.deviations[j],
                bound = %validation.bounds[j],
                "outside tolerance envelope"
            );
        }
        Ok(ExitCode::from(1))
    }
}

fn cmd_analytic(n: usize, p: i64, a: i64, diff: bool) -> Result<ExitCode> {
    let chain = DecayChain::<f64>::from_parameters(n, p, a).context("building the chain")?;
    let mode = if diff { Mode::Diff } else { Mode::Values };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut w = BufWriter::new(stdout.lock());
    let count = process(stdin.lock(), &mut w, chain.rates(), mode).context("reading records")?;
    w.flush().context("writing records")?;

    info!(records = count, "analytic records answered");
    Ok(ExitCode::SUCCESS)
}
