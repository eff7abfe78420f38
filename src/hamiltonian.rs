//! Heisenberg + Landau energy terms and the local Δ-energy evaluator
//! (SPEC_FULL.md §4.3).

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::error::{EngineError, Result};
use crate::spin::SpinStore;
use crate::topology::{Coupling, Topology};

/// The even exponents a Landau on-site term may use.
pub const VALID_LANDAU_EXPONENTS: [i32; 5] = [2, 4, 6, 8, 10];

fn check_exponent(n: i32) -> Result<()> {
    if VALID_LANDAU_EXPONENTS.contains(&n) {
        Ok(())
    } else {
        Err(EngineError::InvalidExponent(n))
    }
}

/// One replica's Hamiltonian: a Heisenberg bond term plus a Landau on-site
/// polynomial in the moment magnitude. Tagged-variant composition (§9) rather
/// than a trait-object hierarchy, since there are exactly two term kinds and
/// both need the full spin store to evaluate.
#[derive(Clone, Debug, Default)]
pub struct Hamiltonian {
    topology: Topology,
    landau: BTreeMap<i32, f64>,
}

impl Hamiltonian {
    pub fn new(n: usize) -> Self {
        Hamiltonian {
            topology: Topology::new(n),
            landau: BTreeMap::new(),
        }
    }

    pub fn n(&self) -> usize {
        self.topology.n()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    pub fn set_heisenberg_coeff(
        &mut self,
        coupling: Coupling<'_>,
        i: &[usize],
        j: &[usize],
    ) -> Result<()> {
        self.topology.append(coupling, i, j)
    }

    pub fn set_heisenberg_coeff_csr(
        &mut self,
        row_ptr: &[usize],
        col_idx: &[usize],
        data: &[f64],
    ) -> Result<()> {
        self.topology.append_csr(row_ptr, col_idx, data)
    }

    /// Overwrites the coefficient for exponent `n` (multiple exponents
    /// accumulate as independent terms; the same exponent set twice replaces).
    pub fn set_landau_coeff(&mut self, a: f64, n: i32) -> Result<()> {
        check_exponent(n)?;
        self.landau.insert(n, a);
        Ok(())
    }

    /// `E = E_H + E_L`, recomputed from scratch (§8's invariant baseline).
    pub fn total_energy(&self, spins: &SpinStore) -> f64 {
        let mut e_h = 0.0;
        for edge in self.topology.edges() {
            let m_i = spins.magnetic_moment(edge.i);
            let m_j = spins.magnetic_moment(edge.j);
            let dot = m_i.dot(&m_j);
            e_h += if edge.i == edge.j {
                edge.coupling * dot
            } else {
                0.5 * edge.coupling * dot
            };
        }

        let mut e_l = 0.0;
        for k in 0..spins.len() {
            let mu = spins.moment(k);
            for (&n, &a) in &self.landau {
                e_l += a * mu.powi(n);
            }
        }

        e_h + e_l
    }

    /// Δ-energy at site `k` for a proposed `(s_new, mu_new)`, using the per-site
    /// adjacency so the cost is `O(deg(k))` rather than a full recompute.
    pub fn delta(
        &mut self,
        spins: &SpinStore,
        k: usize,
        s_new: Vector3<f64>,
        mu_new: f64,
    ) -> f64 {
        let (s_old, mu_old) = spins.get(k);
        let m_old = s_old * mu_old;
        let m_new = s_new * mu_new;

        let adj = self.topology.adjacency();
        let mut delta_h = 0.0;
        for (j, coupling) in adj.neighbors(k) {
            let m_j = spins.magnetic_moment(j);
            delta_h += coupling * (m_new.dot(&m_j) - m_old.dot(&m_j));
        }
        let self_j = adj.self_coupling(k);
        if self_j != 0.0 {
            delta_h += self_j * (m_new.dot(&m_new) - m_old.dot(&m_old));
        }

        let mut delta_l = 0.0;
        for (&n, &a) in &self.landau {
            delta_l += a * (mu_new.powi(n) - mu_old.powi(n));
        }

        delta_h + delta_l
    }

    /// Builds (or reuses) the per-site adjacency cache without requiring the
    /// caller to discard the exclusive borrow afterward. Call once, sequentially,
    /// before fanning Δ-energy evaluation out across a `rayon` worker pool via
    /// [`Hamiltonian::delta_with_built_adjacency`] (§5's graph-colored sweep).
    pub fn ensure_adjacency(&mut self) {
        self.topology.adjacency();
    }

    /// Same contract as [`Hamiltonian::delta`], but takes `&self` rather than
    /// `&mut self` by assuming the adjacency cache is already built. Used by the
    /// graph-colored parallel sweep path, where non-adjacent sites in the same
    /// color class are evaluated concurrently and therefore cannot each hold an
    /// exclusive borrow of the Hamiltonian.
    pub fn delta_with_built_adjacency(
        &self,
        spins: &SpinStore,
        k: usize,
        s_new: Vector3<f64>,
        mu_new: f64,
    ) -> f64 {
        let (s_old, mu_old) = spins.get(k);
        let m_old = s_old * mu_old;
        let m_new = s_new * mu_new;

        let adj = self.topology.adjacency_ref();
        let mut delta_h = 0.0;
        for (j, coupling) in adj.neighbors(k) {
            let m_j = spins.magnetic_moment(j);
            delta_h += coupling * (m_new.dot(&m_j) - m_old.dot(&m_j));
        }
        let self_j = adj.self_coupling(k);
        if self_j != 0.0 {
            delta_h += self_j * (m_new.dot(&m_new) - m_old.dot(&m_old));
        }

        let mut delta_l = 0.0;
        for (&n, &a) in &self.landau {
            delta_l += a * (mu_new.powi(n) - mu_old.powi(n));
        }

        delta_h + delta_l
    }
}
