//! Errors for configuration, integration and record parsing.

use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any integration work starts.
    Configuration,
    /// The stepper could not reach `xend`.
    NumericalFailure,
    /// Malformed text record input.
    Format,
}

/// Errors returned by the harness, the steppers and the record reader.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown method code {0} (expected 0..=8)")]
    UnknownMethod(i32),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("nmax must be positive (got {0})")]
    NMaxMustBePositive(usize),
    #[error("nstiff must be positive (got {0})")]
    NStiffMustBePositive(usize),
    #[error("uround must be in (1e-35, 1.0) (got {0})")]
    URoundOutOfRange(f64),
    #[error("safety_factor must be in (1e-4, 1.0) (got {0})")]
    SafetyFactorOutOfRange(f64),
    #[error("beta must be <= 0.2 (got {0})")]
    BetaTooLarge(f64),
    #[error("step size h has invalid sign or is zero (got {0})")]
    InvalidStepSize(f64),
    #[error("invalid step size scale factors (scale_min {0}, scale_max {1})")]
    InvalidScaleFactors(f64, f64),

    #[error("step size too small at x = {x} (h = {h})")]
    StepSizeTooSmall { x: f64, h: f64 },
    #[error("more than nmax = {nmax} steps needed, stopped at x = {x}")]
    NeedLargerNmax { x: f64, nmax: usize },
    #[error("problem seems to become stiff at x = {x}")]
    ProbablyStiff { x: f64 },
    #[error("singular iteration matrix at x = {x}")]
    SingularMatrix { x: f64 },

    #[error("line {line}: {reason}")]
    Format { line: usize, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownMethod(_)
            | Error::InvalidConfig(_)
            | Error::NMaxMustBePositive(_)
            | Error::NStiffMustBePositive(_)
            | Error::URoundOutOfRange(_)
            | Error::SafetyFactorOutOfRange(_)
            | Error::BetaTooLarge(_)
            | Error::InvalidStepSize(_)
            | Error::InvalidScaleFactors(..) => ErrorKind::Configuration,
            Error::StepSizeTooSmall { .. }
            | Error::NeedLargerNmax { .. }
            | Error::ProbablyStiff { .. }
            | Error::SingularMatrix { .. } => ErrorKind::NumericalFailure,
            Error::Format { .. } | Error::Io(_) => ErrorKind::Format,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
