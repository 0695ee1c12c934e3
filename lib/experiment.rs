//! Sweep construction, parallel execution, and the Rabi amplitude
//! calibration workflow.

use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::prelude::*;
use crate::{
    basis::{ Level, transmon_basis },
    device::DeviceModel,
    error::{ Error, Result },
    evolve::{ lindblad, schrodinger },
    fit::{ CosineFit, fit_cosine },
    hamiltonian::HBuilderTransmon,
    measure::{ FinalState, MeasOutcome, MeasSpec, measure },
    pulse::Envelope,
    schedule::Schedule,
};

/// A family of schedules differing only in drive amplitude, paired with the
/// swept values.
#[derive(Clone, Debug)]
pub struct AmplitudeSweep {
    pub xdata: nd::Array1<f64>,
    pub schedules: Vec<Schedule>,
}

/// Build one schedule per amplitude in `count` linearly spaced values over
/// `[lo, hi]`, each playing the scaled envelope on `channel` and acquiring
/// `qubits` at the end of the pulse.
///
/// Amplitude zero produces a valid zero-signal schedule like any other sweep
/// point.
pub fn amplitude_sweep(
    channel: &str,
    qubits: &[usize],
    envelope: &Envelope,
    count: usize,
    lo: f64,
    hi: f64,
) -> Result<AmplitudeSweep>
{
    if count == 0 {
        return Err(Error::Configuration(
            "sweep must contain at least one point".into()));
    }
    if lo.abs() > 1.0 || hi.abs() > 1.0 {
        return Err(Error::Configuration(format!(
            "sweep range [{}, {}] leaves the unit amplitude interval",
            lo, hi)));
    }
    let xdata: nd::Array1<f64>
        = if count == 1 {
            nd::array![lo]
        } else {
            nd::Array1::linspace(lo, hi, count)
        };
    let schedules: Vec<Schedule>
        = xdata.iter().enumerate()
        .map(|(k, &amp)| {
            Schedule::new(format!("rabi_{:03}", k))
                .play(channel, amp, envelope.clone(), 0)
                .acquire(qubits.to_vec(), envelope.duration())
        })
        .collect();
    Ok(AmplitudeSweep { xdata, schedules })
}

/// Outcomes of one executed sweep.
///
/// Point failures are kept per point so that one divergent integration does
/// not discard its siblings.
#[derive(Clone, Debug)]
pub struct SweepResult {
    pub qubit: usize,
    pub xdata: nd::Array1<f64>,
    pub outcomes: Vec<std::result::Result<MeasOutcome, String>>,
}

impl SweepResult {
    /// Collect the averaged IQ value of every point.
    ///
    /// Fails with the first per-point error, or if any outcome is not an
    /// averaged-IQ readout.
    pub fn averaged_iq(&self) -> Result<nd::Array1<C64>> {
        self.xdata.iter().zip(self.outcomes.iter())
            .map(|(&amp, outcome)| {
                match outcome {
                    Ok(out) => out.averaged_iq()
                        .ok_or_else(|| Error::Configuration(
                            "sweep was not run with averaged-IQ readout"
                                .into())),
                    Err(msg) => Err(Error::Configuration(format!(
                        "sweep point at amplitude {} failed: {}", amp, msg))),
                }
            })
            .collect()
    }

    /// Magnitudes of the averaged IQ values.
    pub fn iq_magnitudes(&self) -> Result<nd::Array1<f64>> {
        Ok(self.averaged_iq()?.mapv(|iq| iq.norm()))
    }

    /// Excited-state fraction of every point of a counts-mode sweep.
    pub fn excited_fractions(&self) -> Result<nd::Array1<f64>> {
        self.xdata.iter().zip(self.outcomes.iter())
            .map(|(&amp, outcome)| {
                match outcome {
                    Ok(MeasOutcome::Counts { shots, excited }) => {
                        Ok(*excited as f64 / *shots as f64)
                    },
                    Ok(_) => Err(Error::Configuration(
                        "sweep was not run with counts readout".into())),
                    Err(msg) => Err(Error::Configuration(format!(
                        "sweep point at amplitude {} failed: {}", amp, msg))),
                }
            })
            .collect()
    }
}

/// Simulate a single schedule on one qubit and apply the readout
/// transformation.
///
/// Uses coherent Schrödinger evolution when the model has no decay term for
/// the qubit and Lindblad evolution of the density matrix otherwise; in both
/// cases the state is sampled at the acquire instruction.
pub fn run_point(
    model: &DeviceModel,
    sched: &Schedule,
    qubit: usize,
    meas: &MeasSpec,
) -> Result<MeasOutcome>
{
    let comp = sched.compile(model)?;
    if !comp.acquire_qubits().contains(&qubit) {
        return Err(Error::Configuration(format!(
            "qubit {} is not acquired by schedule '{}'",
            qubit, sched.name())));
    }
    let hb = HBuilderTransmon::new(model, &comp, qubit)?;
    let n = comp.acquire_at();
    let t: nd::Array1<f64>
        = nd::Array1::linspace(0.0, n as f64 * comp.dt(), n + 1);
    let basis = transmon_basis(
        model.frequency(qubit)
            .ok_or_else(|| Error::missing_constant(qubit, "frequency"))?
    );
    let gamma = model.decay_rate(qubit);
    let state
        = if gamma > 0.0 {
            let rho0 = basis.get_density(&Level::G)
                .ok_or_else(|| Error::Configuration(
                    "basis has no ground state".into()))?;
            let mut y: nd::Array2<f64> = nd::Array2::zeros((2, 2));
            y[[Level::E.index(), Level::G.index()]] = gamma;
            let rho = lindblad::evolve_final_with(&rho0, &hb, &y, &t)?;
            FinalState::Mixed(rho)
        } else {
            let psi0 = basis.get_vector(&Level::G)
                .ok_or_else(|| Error::Configuration(
                    "basis has no ground state".into()))?;
            let psi = schrodinger::evolve_final_with(&psi0, &hb, &t)?;
            FinalState::Pure(psi)
        };
    measure(&state, model.readout_centers(qubit), meas)
}

/// Execute every point of a sweep, in parallel.
///
/// Points share only the read-only model and schedules; each gets a
/// seed-offset copy of the measurement spec so that per-shot sampling stays
/// reproducible point by point.
pub fn run_sweep(
    model: &DeviceModel,
    sweep: &AmplitudeSweep,
    qubit: usize,
    meas: &MeasSpec,
) -> SweepResult
{
    let outcomes: Vec<std::result::Result<MeasOutcome, String>>
        = sweep.schedules.par_iter().enumerate()
        .map(|(k, sched)| {
            run_point(model, sched, qubit, &meas.with_seed_offset(k as u64))
                .map_err(|err| err.to_string())
        })
        .collect();
    SweepResult { qubit, xdata: sweep.xdata.clone(), outcomes }
}

/// Result of a full Rabi amplitude calibration.
#[derive(Clone, Debug)]
pub struct RabiCalibration {
    pub fit: CosineFit,
    pub pi_amplitude: f64,
    pub xdata: nd::Array1<f64>,
    pub ydata: nd::Array1<f64>,
}

/// Sweep the drive amplitude, fit the readout signal to the oscillation
/// model, and extract the pi-pulse amplitude.
///
/// Averaged-IQ sweeps fit the IQ magnitude and counts sweeps fit the excited
/// fraction; a raw statevector sweep has no scalar signal to fit and is
/// rejected. Any failed sweep point aborts the analysis since the fit depends
/// on the full sweep.
pub fn calibrate_pi_amplitude(
    model: &DeviceModel,
    qubit: usize,
    channel: &str,
    envelope: &Envelope,
    count: usize,
    lo: f64,
    hi: f64,
    meas: &MeasSpec,
    guess: [f64; 4],
) -> Result<RabiCalibration>
{
    let group: Vec<usize> = model.meas_group(qubit)
        .ok_or_else(|| Error::Configuration(format!(
            "qubit {} is not in any measurement group", qubit)))?
        .to_vec();
    let sweep = amplitude_sweep(channel, &group, envelope, count, lo, hi)?;
    let result = run_sweep(model, &sweep, qubit, meas);
    let ydata
        = match meas {
            MeasSpec::AveragedIq { .. } => result.iq_magnitudes()?,
            MeasSpec::Counts { .. } => result.excited_fractions()?,
            MeasSpec::RawStatevector => {
                return Err(Error::Configuration(
                    "calibration needs a scalar readout signal; \
                    use averaged-IQ or counts measurement".into()));
            },
        };
    let fit = fit_cosine(&result.xdata, &ydata, guess)?;
    Ok(RabiCalibration {
        fit,
        pi_amplitude: fit.pi_amplitude(),
        xdata: result.xdata,
        ydata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{ DeviceDescriptor, DeviceModel, ParamOverrides };

    // rad per sample per unit amplitude; chosen so that the reference pulse
    // reaches a pi rotation near amplitude 0.3467
    const DRIVE_STRENGTH: f64 = 5.7639211e-3;

    fn model_with_strength(w: f64) -> DeviceModel {
        let desc = DeviceDescriptor::one_qubit(1.0);
        let ovr = ParamOverrides::new().drive_strength(0, w);
        DeviceModel::build(desc, &ovr).unwrap()
    }

    fn reference_envelope() -> Envelope {
        Envelope::gaussian_square(2048, 256.0, 1024).unwrap()
    }

    #[test]
    fn zero_amplitude_point_is_identity() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let sched = Schedule::new("zero")
            .play("d0", 0.0, reference_envelope(), 0)
            .acquire(vec![0], 2048);
        let out = run_point(
            &model, &sched, 0, &MeasSpec::AveragedIq { shots: 512 },
        ).unwrap();
        let iq = out.averaged_iq().unwrap();
        // readout centers are (0, 1): ground population maps to the origin
        assert!(iq.norm() < 1e-12);
    }

    #[test]
    fn sweep_points_are_deterministic() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let sweep = amplitude_sweep(
            "d0", &[0], &reference_envelope(), 5, 0.0, 0.5,
        ).unwrap();
        let meas = MeasSpec::AveragedIq { shots: 512 };
        let a = run_sweep(&model, &sweep, 0, &meas);
        let b = run_sweep(&model, &sweep, 0, &meas);
        assert_eq!(a.averaged_iq().unwrap(), b.averaged_iq().unwrap());
    }

    #[test]
    fn iq_magnitudes_stay_within_readout_bounds() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let sweep = amplitude_sweep(
            "d0", &[0], &reference_envelope(), 8, 0.0, 1.0,
        ).unwrap();
        let meas = MeasSpec::AveragedIq { shots: 512 };
        let result = run_sweep(&model, &sweep, 0, &meas);
        let bound = model.readout_centers(0).iter()
            .map(|c| c.norm())
            .fold(0.0, f64::max);
        for m in result.iq_magnitudes().unwrap().iter() {
            assert!(*m >= 0.0);
            assert!(*m <= bound + 1e-9);
        }
    }

    #[test]
    fn reference_scenario_calibrates_the_pi_pulse() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let cal = calibrate_pi_amplitude(
            &model,
            0,
            "d0",
            &reference_envelope(),
            64,
            0.0,
            1.0,
            &MeasSpec::AveragedIq { shots: 512 },
            [1.5, 2.0, 0.0, 0.0],
        ).unwrap();
        assert!((cal.pi_amplitude - 0.3467).abs() / 0.3467 < 0.01);
        assert!((cal.fit.frequency - 1.4423).abs() / 1.4423 < 0.01);
        // the fitted curve should track the data closely
        assert!(cal.fit.sse < 1e-6);
    }

    #[test]
    fn dissipative_model_damps_the_oscillation() {
        let mut desc = DeviceDescriptor::one_qubit(1.0);
        desc.decay.insert(0, 2.0e-3);
        let ovr = ParamOverrides::new().drive_strength(0, DRIVE_STRENGTH);
        let model = DeviceModel::build(desc, &ovr).unwrap();
        let sched = Schedule::new("damped")
            .play("d0", 0.3467, reference_envelope(), 0)
            .acquire(vec![0], 2048);
        let out = run_point(
            &model, &sched, 0, &MeasSpec::AveragedIq { shots: 512 },
        ).unwrap();
        let p1 = out.averaged_iq().unwrap().norm();
        // relaxation keeps the excited population far below a full flip;
        // reference value from an independent integration is about 0.134
        assert!((p1 - 0.134).abs() < 0.02);
    }

    #[test]
    fn run_point_requires_the_qubit_to_be_acquired() {
        let mut desc = DeviceDescriptor::one_qubit(1.0);
        desc.qubits.push(1);
        desc.frequencies.insert(1, 1.0);
        desc.drive_strengths.insert(1, DRIVE_STRENGTH);
        desc.meas_map = vec![vec![0], vec![1]];
        let ovr = ParamOverrides::new().drive_strength(0, DRIVE_STRENGTH);
        let model = DeviceModel::build(desc, &ovr).unwrap();
        let sched = Schedule::new("other")
            .play("d0", 0.1, reference_envelope(), 0)
            .acquire(vec![1], 2048);
        let res = run_point(
            &model, &sched, 0, &MeasSpec::AveragedIq { shots: 512 },
        );
        assert!(matches!(res, Err(Error::Configuration(_))));
    }

    #[test]
    fn counts_sweep_is_seeded_and_bounded() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let sweep = amplitude_sweep(
            "d0", &[0], &reference_envelope(), 6, 0.0, 1.0,
        ).unwrap();
        let meas = MeasSpec::Counts { shots: 1024, seed: 7 };
        let a = run_sweep(&model, &sweep, 0, &meas);
        let b = run_sweep(&model, &sweep, 0, &meas);
        let fa = a.excited_fractions().unwrap();
        assert_eq!(fa, b.excited_fractions().unwrap());
        for f in fa.iter() {
            assert!((0.0..=1.0).contains(f));
        }
    }

    #[test]
    fn under_determined_sweep_raises_fit_error() {
        let model = model_with_strength(DRIVE_STRENGTH);
        let res = calibrate_pi_amplitude(
            &model,
            0,
            "d0",
            &reference_envelope(),
            3,
            0.0,
            1.0,
            &MeasSpec::AveragedIq { shots: 512 },
            [1.5, 2.0, 0.0, 0.0],
        );
        assert!(matches!(res, Err(Error::FitConvergence(_))));
    }
}
