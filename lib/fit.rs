//! Nonlinear least-squares fitting of Rabi oscillation data.
//!
//! The model is `f(x) = a cos(2π f x + φ) + c`. Fitting runs in two stages:
//! a coarse frequency scan in which the remaining three parameters are solved
//! linearly (the model is linear in `a cos φ`, `a sin φ`, and `c` at fixed
//! frequency), followed by a Levenberg-Marquardt polish over all four
//! parameters. Both stages are deterministic.

use std::f64::consts::PI;
use itertools::Itertools;
use ndarray as nd;
use ndarray_linalg::Solve;
use crate::error::{ Error, Result };

const SCAN_POINTS: usize = 64;
const MAX_ITER: usize = 200;
const FTOL: f64 = 1e-12;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e10;

/// Fitted parameters of the oscillation model `a cos(2π f x + φ) + c`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CosineFit {
    pub amplitude: f64,
    pub frequency: f64,
    pub phase: f64,
    pub offset: f64,
    /// Sum of squared residuals at the optimum.
    pub sse: f64,
    /// Levenberg-Marquardt iterations used.
    pub iterations: usize,
}

impl CosineFit {
    /// Evaluate the fitted model at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * x + self.phase).cos()
            + self.offset
    }

    /// Drive amplitude producing a half-cycle phase shift of the fitted
    /// oscillation.
    pub fn pi_amplitude(&self) -> f64 {
        0.5 / self.frequency
    }
}

fn model(p: &[f64; 4], x: f64) -> f64 {
    p[0] * (2.0 * PI * p[1] * x + p[2]).cos() + p[3]
}

fn sse_of(p: &[f64; 4], x: &nd::Array1<f64>, y: &nd::Array1<f64>) -> f64 {
    x.iter().zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - model(p, xi);
            r * r
        })
        .sum()
}

// solve for (a cos phi, a sin phi, c) at fixed frequency by 3x3 normal
// equations; returns the equivalent four-parameter vector and its SSE
fn linear_subfit(f: f64, x: &nd::Array1<f64>, y: &nd::Array1<f64>)
    -> Option<([f64; 4], f64)>
{
    let n = x.len() as f64;
    let mut m: nd::Array2<f64> = nd::Array2::zeros((3, 3));
    let mut b: nd::Array1<f64> = nd::Array1::zeros(3);
    for (&xi, &yi) in x.iter().zip(y) {
        let c = (2.0 * PI * f * xi).cos();
        let s = (2.0 * PI * f * xi).sin();
        m[[0, 0]] += c * c;
        m[[0, 1]] += c * s;
        m[[0, 2]] += c;
        m[[1, 1]] += s * s;
        m[[1, 2]] += s;
        b[0] += yi * c;
        b[1] += yi * s;
        b[2] += yi;
    }
    m[[1, 0]] = m[[0, 1]];
    m[[2, 0]] = m[[0, 2]];
    m[[2, 1]] = m[[1, 2]];
    m[[2, 2]] = n;
    let sol = m.solve(&b).ok()?;
    let (big_a, big_b, c) = (sol[0], sol[1], sol[2]);
    // A cos(wx) + B sin(wx) = a cos(wx + phi)
    let p = [big_a.hypot(big_b), f, (-big_b).atan2(big_a), c];
    let sse = sse_of(&p, x, y);
    Some((p, sse))
}

fn wrap_phase(phi: f64) -> f64 {
    let mut w = phi.rem_euclid(2.0 * PI);
    if w > PI { w -= 2.0 * PI; }
    w
}

/// Fit the oscillation model to `(x, y)` data starting from
/// `guess = [amplitude, frequency, phase, offset]`.
///
/// Fails with a convergence error when fewer than 4 distinct abscissae are
/// supplied (the model is under-determined) or when the optimizer does not
/// converge within a bounded iteration count.
pub fn fit_cosine(
    x: &nd::Array1<f64>,
    y: &nd::Array1<f64>,
    guess: [f64; 4],
) -> Result<CosineFit>
{
    if x.len() != y.len() {
        return Err(Error::Configuration(format!(
            "xdata and ydata lengths differ: {} vs {}", x.len(), y.len())));
    }
    let distinct = x.iter().map(|xi| xi.to_bits()).unique().count();
    if distinct < 4 {
        return Err(Error::FitConvergence(format!(
            "{} distinct sweep points cannot determine a 4-parameter model",
            distinct)));
    }

    // stage 1: coarse frequency scan seeded by the guess
    let span = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
        - x.iter().cloned().fold(f64::INFINITY, f64::min);
    let f0 = guess[1].abs();
    let (f_lo, f_hi)
        = if f0.is_finite() && f0 > f64::EPSILON {
            (0.25 * f0, 4.0 * f0)
        } else {
            (0.25 / span, 8.0 / span)
        };
    let mut best: ([f64; 4], f64) = (guess, sse_of(&guess, x, y));
    let scan = nd::Array1::linspace(f_lo, f_hi, SCAN_POINTS);
    for &f in scan.iter() {
        if let Some((p, sse)) = linear_subfit(f, x, y) {
            if sse < best.1 { best = (p, sse); }
        }
    }
    let (mut p, mut sse) = best;

    // stage 2: Levenberg-Marquardt polish
    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0;
    let mut converged = false;
    'outer: for _ in 0..MAX_ITER {
        iterations += 1;
        let mut jtj: nd::Array2<f64> = nd::Array2::zeros((4, 4));
        let mut jtr: nd::Array1<f64> = nd::Array1::zeros(4);
        for (&xi, &yi) in x.iter().zip(y) {
            let psi = 2.0 * PI * p[1] * xi + p[2];
            let (sin, cos) = psi.sin_cos();
            let j = [cos, -p[0] * 2.0 * PI * xi * sin, -p[0] * sin, 1.0];
            let r = yi - (p[0] * cos + p[3]);
            for a in 0..4 {
                jtr[a] += j[a] * r;
                for b in a..4 {
                    jtj[[a, b]] += j[a] * j[b];
                }
            }
        }
        for a in 0..4 {
            for b in 0..a {
                jtj[[a, b]] = jtj[[b, a]];
            }
        }
        loop {
            let mut aug = jtj.clone();
            for d in 0..4 {
                aug[[d, d]] += lambda * jtj[[d, d]].max(1e-12);
            }
            let trial_sse;
            let trial_p;
            match aug.solve(&jtr) {
                Ok(delta) => {
                    let q = [
                        p[0] + delta[0],
                        p[1] + delta[1],
                        p[2] + delta[2],
                        p[3] + delta[3],
                    ];
                    trial_sse = sse_of(&q, x, y);
                    trial_p = q;
                },
                Err(_) => {
                    trial_sse = f64::INFINITY;
                    trial_p = p;
                },
            }
            if trial_sse < sse {
                let improvement = sse - trial_sse;
                p = trial_p;
                sse = trial_sse;
                lambda = (lambda / 10.0).max(1e-12);
                if improvement <= FTOL * (sse + 1e-30) {
                    converged = true;
                    break 'outer;
                }
                break;
            }
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // no descent direction left; the current point is the local
                // optimum if the last improvements were already marginal
                converged = true;
                break 'outer;
            }
        }
    }
    if !converged {
        return Err(Error::FitConvergence(format!(
            "no convergence after {} iterations (sse = {:.3e})",
            iterations, sse)));
    }

    let [mut amplitude, mut frequency, mut phase, offset] = p;
    if frequency < 0.0 {
        frequency = -frequency;
        phase = -phase;
    }
    if amplitude < 0.0 {
        amplitude = -amplitude;
        phase += PI;
    }
    let phase = wrap_phase(phase);
    if !frequency.is_finite() || frequency <= f64::EPSILON {
        return Err(Error::FitConvergence(
            "fitted frequency is degenerate".into()));
    }
    Ok(CosineFit { amplitude, frequency, phase, offset, sse, iterations })
}
