//! Pulse envelope shapes.
//!
//! Envelope values are dimensionless amplitudes in [0, 1] before amplitude
//! scaling; Gaussian-edged shapes are "lifted" so that the waveform is exactly
//! zero at the boundaries of its support.

use ndarray as nd;
use crate::error::{ Error, Result };

/// A pulse envelope over a finite support of `duration` samples.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Unit-height rectangle.
    Constant {
        duration: usize,
    },
    /// Lifted Gaussian peaked at the midpoint of the support.
    Gaussian {
        duration: usize,
        sigma: f64,
    },
    /// Flat top of `width` samples with lifted Gaussian rise/fall edges.
    GaussianSquare {
        duration: usize,
        sigma: f64,
        width: usize,
    },
}

// gaussian lifted and rescaled so that g(edge) = 0 and g(center) = 1
fn lifted_gaussian(x: f64, sigma: f64, edge: f64) -> f64 {
    let g = (-x * x / (2.0 * sigma * sigma)).exp();
    let z = (-edge * edge / (2.0 * sigma * sigma)).exp();
    ((g - z) / (1.0 - z)).max(0.0)
}

impl Envelope {
    /// Create a new rectangular envelope.
    pub fn constant(duration: usize) -> Result<Self> {
        if duration == 0 {
            return Err(Error::Configuration(
                "envelope duration must be nonzero".into()));
        }
        Ok(Self::Constant { duration })
    }

    /// Create a new lifted Gaussian envelope.
    pub fn gaussian(duration: usize, sigma: f64) -> Result<Self> {
        if duration == 0 {
            return Err(Error::Configuration(
                "envelope duration must be nonzero".into()));
        }
        if sigma <= 0.0 {
            return Err(Error::Configuration(format!(
                "envelope sigma must be positive, got {}", sigma)));
        }
        Ok(Self::Gaussian { duration, sigma })
    }

    /// Create a new flat-top envelope with Gaussian edges.
    pub fn gaussian_square(duration: usize, sigma: f64, width: usize)
        -> Result<Self>
    {
        if duration == 0 {
            return Err(Error::Configuration(
                "envelope duration must be nonzero".into()));
        }
        if sigma <= 0.0 {
            return Err(Error::Configuration(format!(
                "envelope sigma must be positive, got {}", sigma)));
        }
        if width > duration {
            return Err(Error::Configuration(format!(
                "flat-top width {} exceeds duration {}", width, duration)));
        }
        Ok(Self::GaussianSquare { duration, sigma, width })
    }

    /// Number of samples in the support.
    pub fn duration(&self) -> usize {
        match *self {
            Self::Constant { duration } => duration,
            Self::Gaussian { duration, .. } => duration,
            Self::GaussianSquare { duration, .. } => duration,
        }
    }

    /// Envelope value at sample index `k`; zero outside the support.
    pub fn sample(&self, k: usize) -> f64 {
        let t = k as f64;
        match *self {
            Self::Constant { duration } => {
                if k < duration { 1.0 } else { 0.0 }
            },
            Self::Gaussian { duration, sigma } => {
                if k >= duration { return 0.0; }
                let c = duration as f64 / 2.0;
                lifted_gaussian(t - c, sigma, c)
            },
            Self::GaussianSquare { duration, sigma, width } => {
                if k >= duration { return 0.0; }
                let rise = (duration - width) as f64 / 2.0;
                if t < rise {
                    lifted_gaussian(t - rise, sigma, rise)
                } else if t < rise + width as f64 {
                    1.0
                } else {
                    lifted_gaussian(t - rise - width as f64, sigma, rise)
                }
            },
        }
    }

    /// All samples over the support.
    pub fn samples(&self) -> nd::Array1<f64> {
        (0..self.duration()).map(|k| self.sample(k)).collect()
    }

    /// Sum of samples; multiply by the sample period for the pulse area.
    pub fn area(&self) -> f64 {
        (0..self.duration()).map(|k| self.sample(k)).sum()
    }
}
