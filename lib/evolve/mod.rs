//! Numerical integration of the Schrödinger and Lindblad equations over a
//! compiled drive schedule.
//!
//! Integration is via fourth-order Runge-Kutta with the time step set by the
//! channel sample period. The state norm (or density-matrix trace) is checked
//! against [`NORM_TOL`] every step; a drifting integration is retried once at
//! half step before being reported as divergent.

use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::error::{ Error, Result };

pub mod schrodinger;
pub mod lindblad;

/// Allowed norm/trace drift per unit time.
pub const NORM_TOL: f64 = 1e-8;

// absolute slack so that zero-length steps never trip the check
const DRIFT_FLOOR: f64 = 1e-12;

/// Compute a norm of an object, treating it as a representation of a quantum
/// state.
pub trait StateNorm {
    fn state_norm(&self) -> f64;
}

/// The norm of a state vector is the quadrature sum of its elements.
impl StateNorm for nd::Array1<C64> {
    fn state_norm(&self) -> f64 {
        self.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt()
    }
}

/// The norm of a density matrix is the real part of its trace.
impl StateNorm for nd::Array2<C64> {
    fn state_norm(&self) -> f64 {
        self.diag().iter().map(|p| p.re).sum()
    }
}

/// Compute the commutator `[A, B] = A B - B A`.
pub fn commutator(a: &nd::Array2<C64>, b: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    a.dot(b) - b.dot(a)
}

/// Compute the dissipative part of the RHS of the Lindblad master equation.
///
/// `y[[a, b]]` is the total decay rate from the `a`-th state to the `b`-th
/// state; both `y` and `rho` must be square with matching dimension.
pub fn dissipator(y: &nd::Array2<f64>, rho: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    let n = rho.shape()[0];
    let mut l: nd::Array2<C64> = nd::Array2::zeros(rho.raw_dim());
    for ((a, b), &rate) in y.indexed_iter() {
        if rate.abs() <= f64::EPSILON { continue; }
        l[[b, b]] += rate * rho[[a, a]];
        l[[a, a]] -= rate * rho[[a, a]];
        for i in 0..n {
            for j in 0..n {
                if i != j && (i == a || j == a) {
                    l[[i, j]] -= 0.5 * rate * rho[[i, j]];
                }
            }
        }
    }
    l
}

pub(crate) fn check_drift(norm: f64, t: f64, dtk: f64) -> Result<()> {
    let drift = (norm - 1.0).abs();
    if drift > NORM_TOL * dtk + DRIFT_FLOOR {
        Err(Error::SimulationDivergence { t, drift, tol: NORM_TOL })
    } else {
        Ok(())
    }
}

// midpoint-refined time grid; original points sit at even indices
pub(crate) fn refine_time(t: &nd::Array1<f64>) -> nd::Array1<f64> {
    let mut refined: Vec<f64> = Vec::with_capacity(2 * t.len() - 1);
    for (tk, tkp1) in t.iter().zip(t.iter().skip(1)) {
        refined.push(*tk);
        refined.push(0.5 * (*tk + *tkp1));
    }
    refined.push(t[t.len() - 1]);
    refined.into_iter().collect()
}
