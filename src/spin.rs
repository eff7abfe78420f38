//! Per-replica spin store (SPEC_FULL.md §3, §4.2).

use nalgebra::Vector3;
use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1, Zip};

/// The single writable state advanced during a sweep: `N` unit spin vectors and
/// their (separately updatable) moment magnitudes.
///
/// Mirrors the teacher's `Array2<Vector3d4xf64>` site layout, despecialized from a
/// 4-wide SIMD lane down to one `Vector3<f64>` per site, since updates here are
/// single-site rather than batched.
#[derive(Clone, Debug)]
pub struct SpinStore {
    s: Vec<Vector3<f64>>,
    mu: Vec<f64>,
}

impl SpinStore {
    /// `n` sites, each initialized to `+z` with unit magnitude.
    pub fn new(n: usize) -> Self {
        SpinStore {
            s: vec![Vector3::z(); n],
            mu: vec![1.0; n],
        }
    }

    /// Randomize every spin direction, keeping magnitudes untouched.
    pub fn randomize(&mut self, rng: &mut crate::rng::RngService) {
        for s in self.s.iter_mut() {
            *s = rng.unit_sphere();
        }
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    pub fn get(&self, k: usize) -> (Vector3<f64>, f64) {
        (self.s[k], self.mu[k])
    }

    pub fn spin(&self, k: usize) -> Vector3<f64> {
        self.s[k]
    }

    pub fn moment(&self, k: usize) -> f64 {
        self.mu[k]
    }

    /// The physical moment vector `µ·s` at site `k`.
    pub fn magnetic_moment(&self, k: usize) -> Vector3<f64> {
        self.s[k] * self.mu[k]
    }

    /// Commit `(s, mu)` at site `k`, renormalizing `s` so the unit-norm invariant
    /// holds even if the caller passed a slightly denormalized direction.
    pub fn set(&mut self, k: usize, s: Vector3<f64>, mu: f64) {
        let norm = s.norm();
        self.s[k] = if norm > 0.0 { s / norm } else { Vector3::z() };
        self.mu[k] = mu.max(0.0);
    }

    /// `Σ µ·s / N`, the vector collective magnetization.
    pub fn magnetization_vector(&self) -> Vector3<f64> {
        let sum: Vector3<f64> = self
            .s
            .iter()
            .zip(self.mu.iter())
            .map(|(s, mu)| s * *mu)
            .sum();
        sum / (self.s.len() as f64)
    }

    /// All `µ·s` vectors, in site order, as an `[N, 3]` array. Rows are filled
    /// through `ndarray`'s `rayon` feature, the same `Zip::from(..).into_par_iter()`
    /// idiom the teacher uses to update per-site rows in `m_update`/`h_update`.
    pub fn moments(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.s.len(), 3));
        let s_view = ArrayView1::from(&self.s[..]);
        let mu_view = ArrayView1::from(&self.mu[..]);
        Zip::from(out.genrows_mut())
            .and(&s_view)
            .and(&mu_view)
            .into_par_iter()
            .for_each(|(mut row, s, mu)| {
                let m = *s * *mu;
                row[0] = m.x;
                row[1] = m.y;
                row[2] = m.z;
            });
        out
    }

    /// The maximum deviation of any spin's norm from 1, used by invariant checks.
    #[cfg(test)]
    pub(crate) fn max_norm_error(&self) -> f64 {
        self.s
            .iter()
            .map(|s| (s.norm() - 1.0).abs())
            .fold(0.0, f64::max)
    }
}
