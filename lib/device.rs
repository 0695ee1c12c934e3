//! Device descriptors and the immutable Hamiltonian parameter model built
//! from them.
//!
//! A [`DeviceDescriptor`] mirrors what a backend advertises publicly; some
//! physical constants may be absent. [`DeviceModel::build`] combines the
//! descriptor with an explicit [`ParamOverrides`] set and fails with a
//! configuration error when a required constant is still missing, rather than
//! allowing the descriptor to be patched in place.

use indexmap::IndexMap;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use rustc_hash::FxHashMap as HashMap;
use crate::error::{ Error, Result };

/// Explicit overrides for named Hamiltonian parameters, applied once at model
/// construction.
#[derive(Clone, Debug, Default)]
pub struct ParamOverrides {
    frequencies: HashMap<usize, f64>,
    drive_strengths: HashMap<usize, f64>,
}

impl ParamOverrides {
    pub fn new() -> Self { Self::default() }

    /// Override the qubit frequency (angular, rad per time unit).
    pub fn frequency(mut self, qubit: usize, value: f64) -> Self {
        self.frequencies.insert(qubit, value);
        self
    }

    /// Override the drive strength (rad per sample per unit amplitude).
    pub fn drive_strength(mut self, qubit: usize, value: f64) -> Self {
        self.drive_strengths.insert(qubit, value);
        self
    }
}

/// Raw device data as advertised by a backend.
///
/// Any of the per-qubit constant maps may be incomplete.
#[derive(Clone, Debug)]
pub struct DeviceDescriptor {
    /// Sample period of the drive channels.
    pub dt: f64,
    /// Qubit indices present on the device.
    pub qubits: Vec<usize>,
    /// Qubit frequencies (angular), possibly incomplete.
    pub frequencies: HashMap<usize, f64>,
    /// Drive strengths (rad per sample per unit amplitude), possibly
    /// incomplete.
    pub drive_strengths: HashMap<usize, f64>,
    /// Drive channel name to driven qubit.
    pub channels: IndexMap<String, usize>,
    /// Groups of qubits that must be measured simultaneously.
    pub meas_map: Vec<Vec<usize>>,
    /// Readout IQ-plane centers for the ground and excited states.
    pub readout: HashMap<usize, [C64; 2]>,
    /// Relaxation rates Γ₁ (excited → ground), angular frequency units.
    pub decay: HashMap<usize, f64>,
}

impl DeviceDescriptor {
    /// A single-transmon descriptor with the drive strength withheld, as on
    /// backends that do not publish their full system Hamiltonian.
    pub fn one_qubit(dt: f64) -> Self {
        Self {
            dt,
            qubits: vec![0],
            frequencies: [(0, 2.0 * std::f64::consts::PI * 4.97e9)]
                .into_iter()
                .collect(),
            drive_strengths: HashMap::default(),
            channels: [("d0".to_string(), 0)].into_iter().collect(),
            meas_map: vec![vec![0]],
            readout: [(0, [C64::zero(), C64::one()])].into_iter().collect(),
            decay: HashMap::default(),
        }
    }
}

/// Immutable, fully-resolved physical model of the device.
///
/// Construction validates that every constant the engine will reference is
/// present; afterward the model is read-only and may be shared freely across
/// concurrent evolution runs.
#[derive(Clone, Debug)]
pub struct DeviceModel {
    dt: f64,
    qubits: Vec<usize>,
    frequencies: HashMap<usize, f64>,
    drive_strengths: HashMap<usize, f64>,
    channels: IndexMap<String, usize>,
    meas_map: Vec<Vec<usize>>,
    readout: HashMap<usize, [C64; 2]>,
    decay: HashMap<usize, f64>,
}

impl DeviceModel {
    /// Resolve a descriptor against an override set.
    ///
    /// Fails if `dt` is non-positive, if a channel or measurement group names
    /// an unknown qubit, or if any qubit is left without a frequency or drive
    /// strength after overrides are applied.
    pub fn build(desc: DeviceDescriptor, ovr: &ParamOverrides) -> Result<Self> {
        if desc.dt <= 0.0 {
            return Err(Error::Configuration(format!(
                "sample period must be positive, got {}", desc.dt)));
        }
        let mut frequencies: HashMap<usize, f64> = HashMap::default();
        let mut drive_strengths: HashMap<usize, f64> = HashMap::default();
        for &q in desc.qubits.iter() {
            let f = ovr.frequencies.get(&q)
                .or_else(|| desc.frequencies.get(&q))
                .copied()
                .ok_or_else(|| Error::missing_constant(q, "frequency"))?;
            let w = ovr.drive_strengths.get(&q)
                .or_else(|| desc.drive_strengths.get(&q))
                .copied()
                .ok_or_else(|| Error::missing_constant(q, "drive_strength"))?;
            frequencies.insert(q, f);
            drive_strengths.insert(q, w);
        }
        for (ch, q) in desc.channels.iter() {
            if !desc.qubits.contains(q) {
                return Err(Error::Configuration(format!(
                    "channel '{}' targets unknown qubit {}", ch, q)));
            }
        }
        for group in desc.meas_map.iter() {
            for q in group.iter() {
                if !desc.qubits.contains(q) {
                    return Err(Error::Configuration(format!(
                        "meas_map group names unknown qubit {}", q)));
                }
            }
        }
        Ok(Self {
            dt: desc.dt,
            qubits: desc.qubits,
            frequencies,
            drive_strengths,
            channels: desc.channels,
            meas_map: desc.meas_map,
            readout: desc.readout,
            decay: desc.decay,
        })
    }

    /// Sample period of the drive channels.
    pub fn dt(&self) -> f64 { self.dt }

    /// Qubit indices present on the device.
    pub fn qubits(&self) -> &[usize] { &self.qubits }

    /// Return `true` if the qubit index exists on the device.
    pub fn has_qubit(&self, qubit: usize) -> bool {
        self.qubits.contains(&qubit)
    }

    /// Qubit frequency (angular).
    pub fn frequency(&self, qubit: usize) -> Option<f64> {
        self.frequencies.get(&qubit).copied()
    }

    /// Drive strength (rad per sample per unit amplitude).
    pub fn drive_strength(&self, qubit: usize) -> Option<f64> {
        self.drive_strengths.get(&qubit).copied()
    }

    /// Qubit driven by a named channel.
    pub fn channel_qubit(&self, channel: &str) -> Option<usize> {
        self.channels.get(channel).copied()
    }

    /// All drive channels targeting a particular qubit.
    pub fn qubit_channels(&self, qubit: usize)
        -> impl Iterator<Item = &str> + '_
    {
        self.channels.iter()
            .filter(move |(_, q)| **q == qubit)
            .map(|(ch, _)| ch.as_str())
    }

    /// Measurement group containing a particular qubit.
    pub fn meas_group(&self, qubit: usize) -> Option<&[usize]> {
        self.meas_map.iter()
            .find(|group| group.contains(&qubit))
            .map(|group| group.as_slice())
    }

    /// Readout IQ centers for the ground and excited states.
    ///
    /// Defaults to (0, 1) on the IQ plane when the device does not advertise
    /// calibrated centers.
    pub fn readout_centers(&self, qubit: usize) -> [C64; 2] {
        self.readout.get(&qubit).copied()
            .unwrap_or([C64::zero(), C64::one()])
    }

    /// Relaxation rate Γ₁ for a qubit; zero when the model is coherent.
    pub fn decay_rate(&self, qubit: usize) -> f64 {
        self.decay.get(&qubit).copied().unwrap_or(0.0)
    }
}
