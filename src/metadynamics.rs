//! History-dependent magnetization bias (SPEC_FULL.md §4.6).
//!
//! Convention chosen (DESIGN.md, Open Question 1): the collective variable `M` is
//! the z-component of the vector magnetization `Σ µ·s / N`, not its norm. This
//! keeps `M` signed, matching the symmetric `[-max_range, max_range]` bin range.

/// A 1-D histogram bias over the magnetization, deposited with a Gaussian kernel
/// once per sweep.
#[derive(Clone, Debug)]
pub struct MetadynamicsBias {
    max_range: f64,
    width: f64,
    height: f64,
    bias: Vec<f64>,
    bin_width: f64,
    visits: u64,
}

impl MetadynamicsBias {
    pub fn new(max_range: f64, n_bins: usize, height: f64, width: f64) -> Self {
        let n_bins = n_bins.max(1);
        MetadynamicsBias {
            max_range,
            width,
            height,
            bias: vec![0.0; n_bins],
            bin_width: 2.0 * max_range / n_bins as f64,
            visits: 0,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.bias.len()
    }

    /// The center of bin `m`.
    fn bin_center(&self, m: usize) -> f64 {
        -self.max_range + (m as f64 + 0.5) * self.bin_width
    }

    /// `V(M) = Σ_m B[m] exp(-(M - x_m)² / (2 width²))`.
    pub fn potential(&self, m: f64) -> f64 {
        if self.width <= 0.0 {
            return 0.0;
        }
        let two_w2 = 2.0 * self.width * self.width;
        self.bias
            .iter()
            .enumerate()
            .map(|(idx, &b)| {
                let dx = m - self.bin_center(idx);
                b * (-dx * dx / two_w2).exp()
            })
            .sum()
    }

    /// `V(M_new) - V(M_old)`, the bias contribution to a proposal's Δ (§4.5 step 3).
    pub fn delta(&self, m_old: f64, m_new: f64) -> f64 {
        self.potential(m_new) - self.potential(m_old)
    }

    /// Deposit a Gaussian kernel of height `height` centered at `m`, distributed
    /// across every bin (the smooth alternative of §4.6, chosen over single-bin
    /// deposition so `Δ_bias` stays differentiable in the collective variable).
    pub fn deposit(&mut self, m: f64) {
        if self.width <= 0.0 {
            return;
        }
        let two_w2 = 2.0 * self.width * self.width;
        for (idx, b) in self.bias.iter_mut().enumerate() {
            let dx = m - self.bin_center(idx);
            *b += self.height * (-dx * dx / two_w2).exp();
        }
        self.visits += 1;
    }

    /// Extracts the magnetization to bias this collective variable: the z-axis
    /// projection of the vector magnetization.
    pub fn collective_variable(m_vector: nalgebra::Vector3<f64>) -> f64 {
        m_vector.z
    }

    /// Bin centers and `-V(bin)` at each, for `get_metadynamics_free_energy`.
    pub fn free_energy(&self) -> FreeEnergy {
        let magnetization = ndarray::Array1::from_iter((0..self.n_bins()).map(|m| self.bin_center(m)));
        let free_energy = ndarray::Array1::from_iter(self.bias.iter().map(|&b| -b));
        FreeEnergy {
            magnetization,
            free_energy,
        }
    }
}

/// The bin coordinates and free energy reported by `get_metadynamics_free_energy`
/// (§6): `{magnetization: array, free_energy: array}`.
#[derive(Clone, Debug)]
pub struct FreeEnergy {
    pub magnetization: ndarray::Array1<f64>,
    pub free_energy: ndarray::Array1<f64>,
}
