//! Measurement models mapping final quantum states to readout results.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use crate::error::{ Error, Result };

/// Selects what kind of readout a simulation run produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeasSpec {
    /// Return the raw final statevector; only available for coherent
    /// (non-dissipative) evolution.
    RawStatevector,
    /// Sample per-shot outcomes with an explicitly seeded RNG.
    Counts {
        shots: usize,
        seed: u64,
    },
    /// Deterministic population-weighted IQ average; no sampling noise.
    AveragedIq {
        shots: usize,
    },
}

impl MeasSpec {
    /// Derive a per-sweep-point spec by offsetting the sampling seed, so that
    /// points are decorrelated but individually reproducible.
    pub fn with_seed_offset(self, offset: u64) -> Self {
        match self {
            Self::Counts { shots, seed } => Self::Counts {
                shots,
                seed: seed.wrapping_add(offset),
            },
            other => other,
        }
    }

    /// Configured shot count, if meaningful for the variant.
    pub fn shots(&self) -> Option<usize> {
        match *self {
            Self::RawStatevector => None,
            Self::Counts { shots, .. } => Some(shots),
            Self::AveragedIq { shots } => Some(shots),
        }
    }
}

/// Readout outcome, shaped per [`MeasSpec`] variant.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasOutcome {
    Statevector(nd::Array1<C64>),
    Counts {
        shots: usize,
        excited: usize,
    },
    AveragedIq(C64),
}

impl MeasOutcome {
    /// Extract the averaged IQ value, if this outcome carries one.
    pub fn averaged_iq(&self) -> Option<C64> {
        match self {
            Self::AveragedIq(iq) => Some(*iq),
            _ => None,
        }
    }
}

/// Final state of a single evolution run.
#[derive(Clone, Debug, PartialEq)]
pub enum FinalState {
    Pure(nd::Array1<C64>),
    Mixed(nd::Array2<C64>),
}

impl FinalState {
    /// Level populations of the state.
    pub fn populations(&self) -> nd::Array1<f64> {
        match self {
            Self::Pure(psi) => psi.mapv(|a| a.norm_sqr()),
            Self::Mixed(rho) => rho.diag().mapv(|p| p.re),
        }
    }
}

/// Apply the readout transformation for one qubit.
///
/// `centers` holds the calibrated IQ-plane centers for the ground and excited
/// states. Averaged IQ readout is deterministic; per-shot counts draw from an
/// RNG seeded exclusively by the spec.
pub fn measure(
    state: &FinalState,
    centers: [C64; 2],
    spec: &MeasSpec,
) -> Result<MeasOutcome>
{
    match *spec {
        MeasSpec::RawStatevector => {
            match state {
                FinalState::Pure(psi) => {
                    Ok(MeasOutcome::Statevector(psi.clone()))
                },
                FinalState::Mixed(_) => {
                    Err(Error::Configuration(
                        "raw statevector readout is unavailable for \
                        dissipative evolution".into()))
                },
            }
        },
        MeasSpec::Counts { shots, seed } => {
            if shots == 0 {
                return Err(Error::Configuration(
                    "shot count must be nonzero".into()));
            }
            let p = state.populations();
            let p1 = p[1].clamp(0.0, 1.0);
            let mut rng = StdRng::seed_from_u64(seed);
            let excited: usize
                = (0..shots)
                .filter(|_| rng.gen::<f64>() < p1)
                .count();
            Ok(MeasOutcome::Counts { shots, excited })
        },
        MeasSpec::AveragedIq { shots } => {
            if shots == 0 {
                return Err(Error::Configuration(
                    "shot count must be nonzero".into()));
            }
            let p = state.populations();
            let iq = centers[0] * p[0] + centers[1] * p[1];
            Ok(MeasOutcome::AveragedIq(iq))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{ One, Zero };

    fn superposition() -> FinalState {
        let a = C64::from(0.6);
        let b = C64::new(0.0, 0.8);
        FinalState::Pure(nd::array![a, b])
    }

    #[test]
    fn averaged_iq_is_deterministic_and_bounded() {
        let centers = [C64::zero(), C64::one()];
        let spec = MeasSpec::AveragedIq { shots: 512 };
        let state = superposition();
        let a = measure(&state, centers, &spec).unwrap();
        let b = measure(&state, centers, &spec).unwrap();
        assert_eq!(a, b);
        let iq = a.averaged_iq().unwrap();
        assert!((iq.re - 0.64).abs() < 1e-12);
        let bound = centers.iter().map(|c| c.norm()).fold(0.0, f64::max);
        assert!(iq.norm() >= 0.0);
        assert!(iq.norm() <= bound + 1e-12);
    }

    #[test]
    fn counts_reproducible_under_the_same_seed() {
        let centers = [C64::zero(), C64::one()];
        let state = superposition();
        let spec = MeasSpec::Counts { shots: 512, seed: 17 };
        let a = measure(&state, centers, &spec).unwrap();
        let b = measure(&state, centers, &spec).unwrap();
        assert_eq!(a, b);
        let MeasOutcome::Counts { shots, excited } = a else {
            panic!("expected counts");
        };
        assert_eq!(shots, 512);
        // p1 = 0.64; a wild miss here means the sampling is broken
        assert!((excited as f64 / 512.0 - 0.64).abs() < 0.1);
    }

    #[test]
    fn seed_offset_changes_counts_variant_only() {
        let spec = MeasSpec::Counts { shots: 8, seed: 3 };
        assert_eq!(
            spec.with_seed_offset(4),
            MeasSpec::Counts { shots: 8, seed: 7 },
        );
        let avg = MeasSpec::AveragedIq { shots: 8 };
        assert_eq!(avg.with_seed_offset(4), avg);
    }

    #[test]
    fn statevector_readout_rejects_mixed_states() {
        let rho = nd::Array2::<C64>::eye(2) / 2.0;
        let state = FinalState::Mixed(rho);
        let res = measure(&state, [C64::zero(), C64::one()],
            &MeasSpec::RawStatevector);
        assert!(matches!(res, Err(Error::Configuration(_))));
    }
}
