//! Evolution functions for the Lindblad equation.

use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    error::{ Error, Result },
    hamiltonian::HBuild,
};
use super::{ StateNorm, check_drift, commutator, dissipator, refine_time };

fn rhs(
    h: &nd::Array2<C64>,
    y: &nd::Array2<f64>,
    rho: &nd::Array2<C64>,
) -> nd::Array2<C64>
{
    -C64::i() * commutator(h, rho) + dissipator(y, rho)
}

fn step<H>(
    z_old: &nd::Array2<C64>,
    h: &H,
    y: &nd::Array2<f64>,
    tk: f64,
    dtk: f64,
) -> nd::Array2<C64>
where H: Fn(f64) -> nd::Array2<C64>
{
    let hk = h(tk);
    let hkh = h(tk + dtk / 2.0);
    let hk1 = h(tk + dtk);
    let k1 = rhs(&hk, y, z_old);
    let k2 = rhs(&hkh, y, &(z_old + &k1 * (dtk / 2.0)));
    let k3 = rhs(&hkh, y, &(z_old + &k2 * (dtk / 2.0)));
    let k4 = rhs(&hk1, y, &(z_old + &k3 * dtk));
    z_old + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dtk / 6.0)
}

fn try_evolve_final<H>(
    rho0: &nd::Array2<C64>,
    h: &H,
    y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
) -> Result<nd::Array2<C64>>
where H: Fn(f64) -> nd::Array2<C64>
{
    let mut z_old: nd::Array2<C64> = rho0.clone();
    let iter = t.iter().zip(t.iter().skip(1));
    for (&tk, &tkp1) in iter {
        let dtk = tkp1 - tk;
        let z_new = step(&z_old, h, y, tk, dtk);
        let norm = z_new.state_norm();
        check_drift(norm, tkp1, dtk)?;
        z_old = z_new / norm;
    }
    Ok(z_old)
}

/// Numerically integrate the Lindblad equation for a time-dependent
/// Hamiltonian given by a function, returning the full trajectory.
///
/// See [`dissipator`] for the meaning of the decay matrix `y`. The last index
/// of the output corresponds to time. A divergent integration is retried once
/// at half step before the error is returned.
pub fn evolve_fn<H>(
    rho0: &nd::Array2<C64>,
    h: H,
    y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
) -> Result<nd::Array3<C64>>
where H: Fn(f64) -> nd::Array2<C64>
{
    let run = |t: &nd::Array1<f64>| -> Result<nd::Array3<C64>> {
        let n = t.len();
        let d = rho0.shape()[0];
        let mut rho: nd::Array3<C64> = nd::Array3::zeros((d, d, n));
        rho.slice_mut(s![.., .., 0]).assign(rho0);
        let mut z_old: nd::Array2<C64> = rho0.clone();
        let iter = t.iter().zip(t.iter().skip(1)).enumerate();
        for (k, (&tk, &tkp1)) in iter {
            let dtk = tkp1 - tk;
            let z_new = step(&z_old, &h, y, tk, dtk);
            let norm = z_new.state_norm();
            check_drift(norm, tkp1, dtk)?;
            z_old = z_new / norm;
            rho.slice_mut(s![.., .., k + 1]).assign(&z_old);
        }
        Ok(rho)
    };
    match run(t) {
        Err(Error::SimulationDivergence { .. }) => {
            let refined = refine_time(t);
            run(&refined).map(|rho| rho.slice(s![.., .., ..;2]).to_owned())
        },
        res => res,
    }
}

/// Numerically integrate the Lindblad equation for a time-dependent
/// Hamiltonian given by a function, returning only the final density matrix.
pub fn evolve_fn_final<H>(
    rho0: &nd::Array2<C64>,
    h: H,
    y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
) -> Result<nd::Array2<C64>>
where H: Fn(f64) -> nd::Array2<C64>
{
    match try_evolve_final(rho0, &h, y, t) {
        Err(Error::SimulationDivergence { .. }) => {
            let refined = refine_time(t);
            try_evolve_final(rho0, &h, y, &refined)
        },
        res => res,
    }
}

/// Numerically integrate the Lindblad equation with the interface of
/// [`HBuild`], returning only the final density matrix.
pub fn evolve_final_with<H>(
    rho0: &nd::Array2<C64>,
    hbuilder: &H,
    y: &nd::Array2<f64>,
    t: &nd::Array1<f64>,
) -> Result<nd::Array2<C64>>
where H: HBuild
{
    evolve_fn_final(rho0, |t| hbuilder.build_at(t), y, t)
}
