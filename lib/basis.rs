//! Basis states for the simulated qubit and array representations thereof.

use std::{ hash::Hash, ops::Deref };
use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };

/// Computational basis state of a two-level transmon.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Ground state |0⟩.
    G,
    /// Excited state |1⟩.
    E,
}

impl Level {
    /// Position of the state in the standard array ordering.
    pub fn index(&self) -> usize {
        match *self {
            Self::G => 0,
            Self::E => 1,
        }
    }
}

/// An ordered collection of unique basis states with associated energies in
/// units of angular frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct Basis<S>
where S: Clone + Eq + Hash
{
    energies: IndexMap<S, f64>,
}

impl<S> Deref for Basis<S>
where S: Clone + Eq + Hash
{
    type Target = IndexMap<S, f64>;

    fn deref(&self) -> &Self::Target { &self.energies }
}

impl<S> FromIterator<(S, f64)> for Basis<S>
where S: Clone + Eq + Hash
{
    fn from_iter<I>(iter: I) -> Self
    where I: IntoIterator<Item = (S, f64)>
    {
        Self { energies: iter.into_iter().collect() }
    }
}

impl<S> Basis<S>
where S: Clone + Eq + Hash
{
    /// Number of states in the basis.
    pub fn num_states(&self) -> usize { self.energies.len() }

    /// Get an array representation of a particular basis state.
    pub fn get_vector(&self, state: &S) -> Option<nd::Array1<C64>> {
        self.energies.get_index_of(state)
            .map(|k| {
                let n = self.energies.len();
                (0..n).map(|j| if j == k { C64::one() } else { C64::zero() })
                    .collect()
            })
    }

    /// Get an array representation of the density matrix for a particular
    /// basis state.
    pub fn get_density(&self, state: &S) -> Option<nd::Array2<C64>> {
        self.get_vector(state)
            .map(|diag| nd::Array2::from_diag(&diag))
    }
}

/// The standard two-level basis with the excited state at energy splitting
/// `frequency` (angular) above the ground state.
pub fn transmon_basis(frequency: f64) -> Basis<Level> {
    [(Level::G, 0.0), (Level::E, frequency)].into_iter().collect()
}
