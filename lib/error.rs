//! Error types for the calibration pipeline.

use thiserror::Error;

/// Errors produced by model construction, schedule compilation, time
/// evolution, and curve fitting.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A referenced physical constant, channel, or parameter is missing or
    /// invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A schedule instruction cannot be mapped to an engine operator.
    #[error("unsupported instruction on channel '{channel}': {reason}")]
    UnsupportedInstruction {
        /// Channel named by the offending instruction.
        channel: String,
        /// Why the instruction could not be mapped.
        reason: String,
    },

    /// Numerical integration lost unitarity/trace beyond tolerance.
    #[error(
        "integration norm drifted by {drift:.3e} at t = {t:.3} \
        (tolerance {tol:.3e} per unit time)"
    )]
    SimulationDivergence {
        /// Time coordinate at which the drift was detected.
        t: f64,
        /// Absolute deviation of the state norm from 1.
        drift: f64,
        /// Allowed drift per unit time.
        tol: f64,
    },

    /// The nonlinear least-squares fit failed or was under-determined.
    #[error("fit failed to converge: {0}")]
    FitConvergence(String),

    /// Filesystem error while reading a config or writing an artifact.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed experiment configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a [`Error::Configuration`] naming a missing physical
    /// constant.
    pub(crate) fn missing_constant(qubit: usize, name: &str) -> Self {
        Self::Configuration(format!(
            "missing physical constant '{}' for qubit {}; \
            supply it via ParamOverrides",
            name, qubit,
        ))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
