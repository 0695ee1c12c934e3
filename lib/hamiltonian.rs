//! Hamiltonian construction for a driven transmon from a compiled schedule.
//!
//! All Hamiltonians are expressed in the frame co-rotating with the drive
//! under the rotating wave approximation; on resonance only the drive term
//! survives.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    device::DeviceModel,
    error::{ Error, Result },
    schedule::CompiledSchedule,
};

/// Interface for producing Hamiltonian arrays at given times.
pub trait HBuild {
    /// Compute a time-independent Hamiltonian, if the builder admits one.
    fn build_static(&self) -> Option<nd::Array2<C64>>;

    /// Compute the Hamiltonian at a given time as a 2D array.
    fn build_at(&self, t: f64) -> nd::Array2<C64>;

    /// Compute the Hamiltonian over an array of times as a 3D array, with
    /// the last axis corresponding to time.
    fn build(&self, time: &nd::Array1<f64>) -> nd::Array3<C64> {
        let arrays: Vec<nd::Array2<C64>>
            = time.iter().map(|&t| self.build_at(t)).collect();
        let views: Vec<nd::ArrayView2<C64>>
            = arrays.iter().map(|h| h.view()).collect();
        nd::stack(nd::Axis(2), &views)
            .expect("HBuild::build: inconsistent Hamiltonian shapes")
    }
}

/// Hamiltonian builder for a single driven transmon under a compiled
/// schedule.
#[derive(Clone, Debug)]
pub struct HBuilderTransmon<'a> {
    model: &'a DeviceModel,
    sched: &'a CompiledSchedule,
    qubit: usize,
    drive_strength: f64,
    detuning: f64,
    channels: Vec<&'a str>,
}

impl<'a> HBuilderTransmon<'a> {
    /// Create a new builder for a target qubit.
    ///
    /// Fails if the qubit is not in the model, if its drive strength is
    /// unresolved, or if the compiled schedule drives a channel that does not
    /// map onto the target qubit (a single-qubit engine has no operator for
    /// it).
    pub fn new(
        model: &'a DeviceModel,
        sched: &'a CompiledSchedule,
        qubit: usize,
    ) -> Result<Self>
    {
        if !model.has_qubit(qubit) {
            return Err(Error::Configuration(format!(
                "unknown qubit {}", qubit)));
        }
        let drive_strength = model.drive_strength(qubit)
            .ok_or_else(|| Error::missing_constant(qubit, "drive_strength"))?;
        let mut channels: Vec<&str> = Vec::new();
        for ch in sched.channels() {
            match model.channel_qubit(ch) {
                Some(q) if q == qubit => { channels.push(ch); },
                Some(_) => {
                    return Err(Error::UnsupportedInstruction {
                        channel: ch.to_string(),
                        reason: format!(
                            "channel drives a qubit other than {}; no \
                            operator available in a single-qubit evolution",
                            qubit),
                    });
                },
                None => {
                    return Err(Error::UnsupportedInstruction {
                        channel: ch.to_string(),
                        reason: "channel has no drive term in the device \
                            model".into(),
                    });
                },
            }
        }
        Ok(Self {
            model,
            sched,
            qubit,
            drive_strength,
            detuning: 0.0,
            channels,
        })
    }

    /// Set a drive-qubit detuning Δ = ω_q - ω_d (angular).
    pub fn with_detuning(mut self, detuning: f64) -> Self {
        self.detuning = detuning;
        self
    }

    /// Target qubit index.
    pub fn qubit(&self) -> usize { self.qubit }

    /// Total drive signal at time `t`, summed over the channels targeting the
    /// qubit.
    ///
    /// Signals are held piecewise constant over each sample period.
    pub fn drive_at(&self, t: f64) -> f64 {
        let k = ((t / self.sched.dt()).floor() as usize)
            .min(self.sched.duration().saturating_sub(1));
        self.channels.iter()
            .filter_map(|ch| self.sched.signal(ch))
            .map(|signal| signal[k])
            .sum()
    }
}

impl HBuild for HBuilderTransmon<'_> {
    fn build_static(&self) -> Option<nd::Array2<C64>> {
        // only an undriven schedule is time-independent in this frame
        let driven = self.channels.iter()
            .filter_map(|ch| self.sched.signal(ch))
            .any(|signal| signal.iter().any(|v| *v != 0.0));
        if driven { return None; }
        let z = 0.5 * self.detuning;
        Some(nd::array![
            [C64::from(-z), C64::from(0.0)],
            [C64::from(0.0), C64::from(z)],
        ])
    }

    fn build_at(&self, t: f64) -> nd::Array2<C64> {
        let w = 0.5 * self.drive_strength * self.drive_at(t);
        let z = 0.5 * self.detuning;
        nd::array![
            [C64::from(-z), C64::from(w)],
            [C64::from(w), C64::from(z)],
        ]
    }
}
