//! Experiment configuration loaded from TOML.

use std::path::{ Path, PathBuf };
use serde::Deserialize;
use crate::{
    device::ParamOverrides,
    error::{ Error, Result },
    measure::MeasSpec,
    pulse::Envelope,
};

/// Linearly spaced amplitude sweep bounds.
#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepRange {
    pub count: usize,
    pub lo: f64,
    pub hi: f64,
}

impl Default for SweepRange {
    fn default() -> Self {
        Self { count: 64, lo: 0.0, hi: 1.0 }
    }
}

/// Readout mode selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasMode {
    Statevector,
    Counts,
    Avg,
}

/// Parameters of a Rabi amplitude calibration run.
///
/// The default value reproduces the reference calibration scenario. The
/// drive strength is carried here rather than in the device descriptor
/// because backends do not always publish it; it is applied as an explicit
/// override at model construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub qubit: usize,
    pub channel: String,
    /// Pulse support in samples.
    pub duration: usize,
    /// Gaussian edge width in samples.
    pub sigma: f64,
    /// Flat-top width in samples; defaults to `duration - 4 sigma`.
    pub width: Option<usize>,
    pub amps: SweepRange,
    pub shots: usize,
    /// Sampling seed for per-shot readout.
    pub seed: u64,
    pub meas: MeasMode,
    /// Drive strength override (rad per sample per unit amplitude).
    pub drive_strength: Option<f64>,
    /// Qubit frequency override (angular).
    pub frequency: Option<f64>,
    /// Initial guess [amplitude, frequency, phase, offset] for the fit.
    pub guess: [f64; 4],
    pub outdir: PathBuf,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            qubit: 0,
            channel: "d0".to_string(),
            duration: 2048,
            sigma: 256.0,
            width: None,
            amps: SweepRange::default(),
            shots: 512,
            seed: 0,
            meas: MeasMode::Avg,
            drive_strength: Some(5.7639211e-3),
            frequency: None,
            guess: [1.5, 2.0, 0.0, 0.0],
            outdir: PathBuf::from("output"),
        }
    }
}

impl ExperimentConfig {
    /// Read and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check bounds that the type system cannot.
    pub fn validate(&self) -> Result<()> {
        if self.duration == 0 {
            return Err(Error::Configuration(
                "pulse duration must be nonzero".into()));
        }
        if self.sigma <= 0.0 {
            return Err(Error::Configuration(format!(
                "pulse sigma must be positive, got {}", self.sigma)));
        }
        if self.shots == 0 {
            return Err(Error::Configuration(
                "shot count must be nonzero".into()));
        }
        if self.amps.count == 0 {
            return Err(Error::Configuration(
                "amplitude sweep must contain at least one point".into()));
        }
        if self.amps.lo > self.amps.hi {
            return Err(Error::Configuration(format!(
                "amplitude sweep bounds are inverted: [{}, {}]",
                self.amps.lo, self.amps.hi)));
        }
        Ok(())
    }

    /// The swept pulse shape.
    pub fn envelope(&self) -> Result<Envelope> {
        let width = match self.width {
            Some(w) => w,
            None => {
                let edges = (4.0 * self.sigma).round() as usize;
                self.duration.checked_sub(edges)
                    .ok_or_else(|| Error::Configuration(format!(
                        "duration {} is too short for sigma {}",
                        self.duration, self.sigma)))?
            },
        };
        Envelope::gaussian_square(self.duration, self.sigma, width)
    }

    /// Hamiltonian parameter overrides carried by this experiment.
    pub fn overrides(&self) -> ParamOverrides {
        let mut ovr = ParamOverrides::new();
        if let Some(w) = self.drive_strength {
            ovr = ovr.drive_strength(self.qubit, w);
        }
        if let Some(f) = self.frequency {
            ovr = ovr.frequency(self.qubit, f);
        }
        ovr
    }

    /// Measurement spec selected by this experiment.
    pub fn meas_spec(&self) -> MeasSpec {
        match self.meas {
            MeasMode::Statevector => MeasSpec::RawStatevector,
            MeasMode::Counts => MeasSpec::Counts {
                shots: self.shots,
                seed: self.seed,
            },
            MeasMode::Avg => MeasSpec::AveragedIq { shots: self.shots },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_the_reference_scenario() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.amps.count, 64);
        assert_eq!(config.shots, 512);
        assert_eq!(config.guess, [1.5, 2.0, 0.0, 0.0]);
        let env = config.envelope().unwrap();
        assert_eq!(env.duration(), 2048);
        assert_eq!(config.meas_spec(), MeasSpec::AveragedIq { shots: 512 });
    }

    #[test]
    fn parses_a_partial_toml_document() {
        let text = r#"
            channel = "d0"
            shots = 256
            meas = "counts"
            seed = 42
            amps = { count = 16, lo = 0.0, hi = 0.5 }
        "#;
        let config: ExperimentConfig = toml::from_str(text).unwrap();
        assert_eq!(config.shots, 256);
        assert_eq!(config.amps.count, 16);
        assert_eq!(
            config.meas_spec(),
            MeasSpec::Counts { shots: 256, seed: 42 },
        );
        // unspecified fields fall back to the reference scenario
        assert_eq!(config.duration, 2048);
    }

    #[test]
    fn inverted_sweep_bounds_rejected() {
        let mut config = ExperimentConfig::default();
        config.amps = SweepRange { count: 8, lo: 0.9, hi: 0.1 };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn overrides_carry_the_drive_strength() {
        let config = ExperimentConfig::default();
        let desc = crate::device::DeviceDescriptor::one_qubit(1.0);
        let model
            = crate::device::DeviceModel::build(desc, &config.overrides())
            .unwrap();
        assert_eq!(model.drive_strength(0), Some(5.7639211e-3));
    }
}
