//! Pulse schedules and their compilation to discretized drive signals.

use ndarray as nd;
use rustc_hash::FxHashMap as HashMap;
use crate::{
    device::DeviceModel,
    error::{ Error, Result },
    pulse::Envelope,
};

/// A single timed instruction on the device.
#[derive(Clone, Debug, PartialEq)]
pub enum Instr {
    /// Play an amplitude-scaled envelope on a drive channel.
    Play {
        channel: String,
        amp: f64,
        envelope: Envelope,
        t0: usize,
    },
    /// Acquire measurement results for a set of qubits.
    Acquire {
        qubits: Vec<usize>,
        t0: usize,
    },
}

/// An ordered, immutable sequence of instructions over a finite horizon.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    name: String,
    instrs: Vec<Instr>,
}

impl Schedule {
    /// Create a new, empty schedule.
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self { name: name.into(), instrs: Vec::new() }
    }

    /// Append a play instruction.
    pub fn play<T: Into<String>>(
        mut self,
        channel: T,
        amp: f64,
        envelope: Envelope,
        t0: usize,
    ) -> Self
    {
        self.instrs.push(
            Instr::Play { channel: channel.into(), amp, envelope, t0 });
        self
    }

    /// Append an acquire instruction.
    pub fn acquire(mut self, qubits: Vec<usize>, t0: usize) -> Self {
        self.instrs.push(Instr::Acquire { qubits, t0 });
        self
    }

    /// Name of the schedule.
    pub fn name(&self) -> &str { &self.name }

    /// Instructions in program order.
    pub fn instrs(&self) -> &[Instr] { &self.instrs }

    /// Total horizon in samples.
    pub fn duration(&self) -> usize {
        self.instrs.iter()
            .map(|instr| {
                match instr {
                    Instr::Play { envelope, t0, .. }
                        => t0 + envelope.duration(),
                    Instr::Acquire { t0, .. } => *t0,
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// Discretize all plays into per-channel drive signals sampled at the
    /// device period.
    ///
    /// Checks that every channel resolves to a drive term in the model, that
    /// scaled amplitudes stay within [-1, 1], that the schedule carries
    /// exactly one acquire, and that acquired qubits respect the device's
    /// simultaneous-measurement grouping.
    pub fn compile(&self, model: &DeviceModel) -> Result<CompiledSchedule> {
        let duration = self.duration();
        if duration == 0 {
            return Err(Error::Configuration(format!(
                "schedule '{}' is empty", self.name)));
        }
        let mut signals: HashMap<String, nd::Array1<f64>> = HashMap::default();
        let mut acquire: Option<(Vec<usize>, usize)> = None;
        for instr in self.instrs.iter() {
            match instr {
                Instr::Play { channel, amp, envelope, t0 } => {
                    if model.channel_qubit(channel).is_none() {
                        return Err(Error::UnsupportedInstruction {
                            channel: channel.clone(),
                            reason: "channel has no drive term in the device \
                                model".into(),
                        });
                    }
                    if amp.abs() > 1.0 {
                        return Err(Error::Configuration(format!(
                            "amplitude {} on channel '{}' is outside [-1, 1]",
                            amp, channel)));
                    }
                    let signal = signals.entry(channel.clone())
                        .or_insert_with(|| nd::Array1::zeros(duration));
                    for k in 0..envelope.duration() {
                        signal[t0 + k] += amp * envelope.sample(k);
                    }
                },
                Instr::Acquire { qubits, t0 } => {
                    if acquire.is_some() {
                        return Err(Error::Configuration(format!(
                            "schedule '{}' has more than one acquire",
                            self.name)));
                    }
                    acquire = Some((qubits.clone(), *t0));
                },
            }
        }
        let (acquire_qubits, acquire_at) = acquire
            .ok_or_else(|| Error::Configuration(format!(
                "schedule '{}' has no acquire instruction", self.name)))?;
        if acquire_at == 0 {
            return Err(Error::Configuration(format!(
                "schedule '{}' acquires at t = 0", self.name)));
        }
        for &q in acquire_qubits.iter() {
            let group = model.meas_group(q)
                .ok_or_else(|| Error::Configuration(format!(
                    "qubit {} is not in any measurement group", q)))?;
            for member in group.iter() {
                if !acquire_qubits.contains(member) {
                    return Err(Error::Configuration(format!(
                        "qubit {} must be acquired together with qubit {} \
                        (meas_map constraint)",
                        q, member)));
                }
            }
        }
        // summed overlapping plays can exceed the drive's dynamic range
        for (channel, signal) in signals.iter() {
            if signal.iter().any(|v| v.abs() > 1.0 + 1e-12) {
                return Err(Error::Configuration(format!(
                    "summed signal on channel '{}' exceeds unit amplitude",
                    channel)));
            }
        }
        Ok(CompiledSchedule {
            duration,
            dt: model.dt(),
            signals,
            acquire_qubits,
            acquire_at,
        })
    }
}

/// A schedule discretized onto the device sample grid.
#[derive(Clone, Debug)]
pub struct CompiledSchedule {
    pub(crate) duration: usize,
    pub(crate) dt: f64,
    pub(crate) signals: HashMap<String, nd::Array1<f64>>,
    pub(crate) acquire_qubits: Vec<usize>,
    pub(crate) acquire_at: usize,
}

impl CompiledSchedule {
    /// Total horizon in samples.
    pub fn duration(&self) -> usize { self.duration }

    /// Sample period.
    pub fn dt(&self) -> f64 { self.dt }

    /// Drive signal for a channel, if any play touched it.
    pub fn signal(&self, channel: &str) -> Option<nd::ArrayView1<f64>> {
        self.signals.get(channel).map(|s| s.view())
    }

    /// Channels carrying a compiled signal.
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.signals.keys().map(|ch| ch.as_str())
    }

    /// Qubits named by the acquire instruction.
    pub fn acquire_qubits(&self) -> &[usize] { &self.acquire_qubits }

    /// Sample index of the acquire instruction.
    pub fn acquire_at(&self) -> usize { self.acquire_at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ DeviceDescriptor, DeviceModel, ParamOverrides };

    fn model() -> DeviceModel {
        let desc = DeviceDescriptor::one_qubit(1.0);
        let ovr = ParamOverrides::new().drive_strength(0, 0.005);
        DeviceModel::build(desc, &ovr).unwrap()
    }

    fn flat(duration: usize) -> Envelope {
        Envelope::constant(duration).unwrap()
    }

    #[test]
    fn zero_amplitude_still_compiles_to_a_signal() {
        let model = model();
        let sched = Schedule::new("zero")
            .play("d0", 0.0, flat(16), 0)
            .acquire(vec![0], 16);
        let comp = sched.compile(&model).unwrap();
        let signal = comp.signal("d0").unwrap();
        assert_eq!(signal.len(), 16);
        assert!(signal.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn unknown_channel_is_unsupported() {
        let model = model();
        let sched = Schedule::new("bad")
            .play("d7", 0.5, flat(16), 0)
            .acquire(vec![0], 16);
        let res = sched.compile(&model);
        assert!(matches!(
            res,
            Err(Error::UnsupportedInstruction { channel, .. }) if channel == "d7"
        ));
    }

    #[test]
    fn overrange_amplitude_rejected() {
        let model = model();
        let sched = Schedule::new("hot")
            .play("d0", 1.5, flat(16), 0)
            .acquire(vec![0], 16);
        assert!(matches!(sched.compile(&model), Err(Error::Configuration(_))));
    }

    #[test]
    fn acquire_must_cover_meas_group() {
        let mut desc = DeviceDescriptor::one_qubit(1.0);
        desc.qubits.push(1);
        desc.frequencies.insert(1, 1.0);
        desc.drive_strengths.insert(1, 0.005);
        desc.meas_map = vec![vec![0, 1]];
        let ovr = ParamOverrides::new().drive_strength(0, 0.005);
        let model = DeviceModel::build(desc, &ovr).unwrap();
        let sched = Schedule::new("partial")
            .play("d0", 0.5, flat(16), 0)
            .acquire(vec![0], 16);
        assert!(matches!(sched.compile(&model), Err(Error::Configuration(_))));
        let sched = Schedule::new("full")
            .play("d0", 0.5, flat(16), 0)
            .acquire(vec![0, 1], 16);
        assert!(sched.compile(&model).is_ok());
    }

    #[test]
    fn missing_acquire_rejected() {
        let model = model();
        let sched = Schedule::new("no-acq").play("d0", 0.5, flat(16), 0);
        assert!(matches!(sched.compile(&model), Err(Error::Configuration(_))));
    }

    #[test]
    fn compilation_is_deterministic() {
        let model = model();
        let sched = Schedule::new("det")
            .play("d0", 0.37, Envelope::gaussian(64, 16.0).unwrap(), 0)
            .acquire(vec![0], 64);
        let a = sched.compile(&model).unwrap();
        let b = sched.compile(&model).unwrap();
        assert_eq!(a.signals.get("d0"), b.signals.get("d0"));
    }
}
