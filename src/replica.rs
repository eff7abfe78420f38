//! A replica and the λ-mixer used for thermodynamic integration
//! (SPEC_FULL.md §4.5 step 3/5, §9).
//!
//! A replica is the triple the teacher's `SpinLangevinWorkpad` models for a
//! single propagation stage: spin state, the Hamiltonian that reads it, and a
//! running energy accumulator kept in sync with it.

use nalgebra::Vector3;

use crate::hamiltonian::Hamiltonian;
use crate::spin::SpinStore;

/// One Hamiltonian's worth of spin state plus its incrementally tracked energy.
#[derive(Clone, Debug)]
pub struct Replica {
    pub spins: SpinStore,
    pub hamiltonian: Hamiltonian,
    pub energy: f64,
}

impl Replica {
    pub fn new(n: usize) -> Self {
        Replica {
            spins: SpinStore::new(n),
            hamiltonian: Hamiltonian::new(n),
            energy: 0.0,
        }
    }

    /// Recompute `energy` from scratch; used at construction and by the
    /// invariant tests that cross-check incremental accumulation (§8).
    pub fn recompute_energy(&mut self) {
        self.energy = self.hamiltonian.total_energy(&self.spins);
    }

    pub fn delta(&mut self, k: usize, s_new: Vector3<f64>, mu_new: f64) -> f64 {
        self.hamiltonian.delta(&self.spins, k, s_new, mu_new)
    }

    /// Commit a proposal already known to have been accepted, folding `delta`
    /// into the running energy rather than recomputing from scratch.
    pub fn commit(&mut self, k: usize, s_new: Vector3<f64>, mu_new: f64, delta: f64) {
        self.spins.set(k, s_new, mu_new);
        self.energy += delta;
    }
}

/// `(1 - λ)·Δ0 + λ·Δ1`, the mixed Δ-energy the acceptance rule samples from
/// when thermodynamic integration is active (λ > 0).
pub fn mix_delta(delta_0: f64, delta_1: f64, lambda: f64) -> f64 {
    (1.0 - lambda) * delta_0 + lambda * delta_1
}
