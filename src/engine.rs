//! The public driver and API surface (SPEC_FULL.md §6, §4.8).
//!
//! Grounded on the teacher's `spin_langevin_step` as the model for a single
//! orchestration entry point that threads RNG, per-site state, and a multi-stage
//! update rule through one synchronous call — generalized here from one
//! deterministic SDE step to a full Metropolis sweep plus optional
//! precessional relaxation.

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{EngineError, Result};
use crate::metadynamics::MetadynamicsBias;
use crate::observables::Observables;
use crate::proposal::{Proposal, ProposalKernel, ProposalMode};
use crate::replica::{mix_delta, Replica};
use crate::rng::RngService;
use crate::topology::Coupling;

/// Evaluates a color class's Δ-energies concurrently: sites in the same class
/// share no edge (§5), so their Hamiltonian contributions are independent and
/// can be fanned out across `rayon`'s worker pool. The adjacency cache must
/// already be built (`Hamiltonian::ensure_adjacency`) before this is called.
fn colored_deltas(
    hamiltonian: &crate::hamiltonian::Hamiltonian,
    spins: &crate::spin::SpinStore,
    proposals: &[(usize, Proposal)],
) -> Vec<f64> {
    proposals
        .par_iter()
        .map(|&(k, p)| hamiltonian.delta_with_built_adjacency(spins, k, p.spin, p.moment))
        .collect()
}

/// Clamp `βΔ` before exponentiating, per §7: a large positive argument would
/// overflow `exp` towards `+inf`; the acceptance probability is `0` in that
/// regime regardless, so clamp to a value that cannot overflow `f64::exp`.
const MAX_BETA_DELTA: f64 = 700.0;

/// Boltzmann constant in eV/K, consistent with `original_source`'s convention of
/// `J` in eV and `temperature` in Kelvin (DESIGN.md, Open Question 3): `run`'s
/// `temperature` argument is Kelvin, not `kT` directly, so `beta = 1/(k_B * T)`
/// rather than `beta = 1/T`. Without this factor, `T = 300` against `J ~ 0.1`
/// (the scenarios of §8) gives `beta * J ~ 3e-4` — far too weak a bias for the
/// ferromagnetic `E < 0` equilibration property to hold robustly, rather than
/// by chance of the sampled seed.
const K_BOLTZMANN_EV_PER_KELVIN: f64 = 8.617_333_262e-5;

fn acceptance_probability(beta: f64, delta: f64) -> f64 {
    if delta <= 0.0 {
        return 1.0;
    }
    let x = beta * delta;
    if x > MAX_BETA_DELTA {
        0.0
    } else {
        (-x).exp()
    }
}

/// The Magnetic Monte Carlo engine: owns the spin configuration(s), both
/// Hamiltonians, the RNG, and every observable buffer (§5 — no state is shared
/// outside the engine; accessors are only meaningful between `run` calls).
pub struct Engine {
    n: usize,
    replicas: [Replica; 2],
    magnetization_vector: Vector3<f64>,
    lambda: f64,
    proposal: ProposalKernel,
    spin_dynamics: Option<crate::dynamics::SpinDynamics>,
    metadynamics: Option<MetadynamicsBias>,
    coloring: Option<Vec<Vec<usize>>>,
    rng: RngService,
    observables: Observables,
    has_run: bool,
}

impl Engine {
    /// `N >= 1` sites, seeded deterministically from `0` (use
    /// [`Engine::with_seed`] for a different seed).
    pub fn new(n: usize) -> Result<Self> {
        Self::with_seed(n, 0)
    }

    /// `N >= 1` sites, seeded from the given 64-bit value. Both replicas start
    /// from the same random configuration — they diverge only in which
    /// Hamiltonian scores it, not in the spins themselves (§9's "Replica
    /// coupling": the two replica spin stores are always committed identically).
    pub fn with_seed(n: usize, seed: u64) -> Result<Self> {
        if n == 0 {
            return Err(EngineError::invalid_parameter(
                "n",
                "engine requires at least one site",
            ));
        }
        let mut rng = RngService::new(seed);
        let mut replica0 = Replica::new(n);
        replica0.spins.randomize(&mut rng);
        let mut replica1 = Replica::new(n);
        replica1.spins = replica0.spins.clone();
        replica0.recompute_energy();
        replica1.recompute_energy();

        let magnetization_vector = replica0.spins.magnetization_vector();

        Ok(Engine {
            n,
            replicas: [replica0, replica1],
            magnetization_vector,
            lambda: 0.0,
            proposal: ProposalKernel::default(),
            spin_dynamics: None,
            metadynamics: None,
            coloring: None,
            rng,
            observables: Observables::new(),
            has_run: false,
        })
    }

    fn check_index(index: usize) -> Result<()> {
        if index > 1 {
            Err(EngineError::invalid_parameter(
                "index",
                "replica index must be 0 or 1",
            ))
        } else {
            Ok(())
        }
    }

    /// Append Heisenberg edges for replica `index` from scalar-or-per-edge `J`
    /// and parallel index arrays (the COO convention).
    pub fn set_heisenberg_coeff(
        &mut self,
        j: Coupling<'_>,
        i_array: &[usize],
        j_array: &[usize],
        index: usize,
    ) -> Result<()> {
        Self::check_index(index)?;
        self.replicas[index]
            .hamiltonian
            .set_heisenberg_coeff(j, i_array, j_array)?;
        self.replicas[index].recompute_energy();
        Ok(())
    }

    /// Append Heisenberg edges for replica `index` from a CSR representation
    /// (`row_ptr`, `col_idx`, `data`); equivalent to expanding to COO first.
    pub fn set_heisenberg_coeff_csr(
        &mut self,
        row_ptr: &[usize],
        col_idx: &[usize],
        data: &[f64],
        index: usize,
    ) -> Result<()> {
        Self::check_index(index)?;
        self.replicas[index]
            .hamiltonian
            .set_heisenberg_coeff_csr(row_ptr, col_idx, data)?;
        self.replicas[index].recompute_energy();
        Ok(())
    }

    pub fn set_landau_coeff(&mut self, a: f64, n: i32, index: usize) -> Result<()> {
        Self::check_index(index)?;
        self.replicas[index].hamiltonian.set_landau_coeff(a, n)?;
        self.replicas[index].recompute_energy();
        Ok(())
    }

    pub fn set_lambda(&mut self, lambda: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&lambda) {
            return Err(EngineError::invalid_parameter(
                "lambda",
                format!("lambda must be in [0, 1], got {lambda}"),
            ));
        }
        self.lambda = lambda;
        Ok(())
    }

    /// Enables the metadynamics bias over the magnetization (§4.6). Defaults
    /// mirror a modest, slowly-filling bias: 100 bins, height `0.01`,
    /// width `max_range / 20`.
    pub fn set_metadynamics(
        &mut self,
        max_range: f64,
        n_bins: Option<usize>,
        height: Option<f64>,
        width: Option<f64>,
    ) -> Result<()> {
        if max_range <= 0.0 {
            return Err(EngineError::invalid_parameter(
                "max_range",
                "max_range must be positive",
            ));
        }
        let n_bins = n_bins.unwrap_or(100);
        let height = height.unwrap_or(0.01);
        let width = width.unwrap_or(max_range / 20.0);
        self.metadynamics = Some(MetadynamicsBias::new(max_range, n_bins, height, width));
        Ok(())
    }

    /// Toggles spin-dynamics mode (§4.7): when enabled, a deterministic
    /// precessional step with a fixed timestep follows every Metropolis sweep,
    /// and the proposal kernel switches to the small-angle distribution (§4.4).
    pub fn switch_spin_dynamics(&mut self) {
        if self.spin_dynamics.is_some() {
            self.spin_dynamics = None;
            self.proposal.mode = ProposalMode::Isotropic;
        } else {
            self.spin_dynamics = Some(crate::dynamics::SpinDynamics::new(1e-3));
            self.proposal.mode = ProposalMode::SmallAngle { max_angle: 0.1 };
        }
    }

    /// Shared accept/reject logic (§4.5 steps 3-5) given a proposal and its
    /// already-evaluated per-replica Δ-energies, so both the default sequential
    /// sweep and the graph-colored parallel sweep commit identically.
    fn apply_trial(&mut self, beta: f64, k: usize, proposal: Proposal, delta0: f64, delta1: f64) {
        let (s_old, mu_old) = self.replicas[0].spins.get(k);
        let mixed = mix_delta(delta0, delta1, self.lambda);

        let candidate_magnetization = self.magnetization_vector
            + (proposal.spin * proposal.moment - s_old * mu_old) / self.n as f64;

        let bias_delta = match &self.metadynamics {
            Some(bias) => {
                let cv_old = MetadynamicsBias::collective_variable(self.magnetization_vector);
                let cv_new = MetadynamicsBias::collective_variable(candidate_magnetization);
                bias.delta(cv_old, cv_new)
            }
            None => 0.0,
        };

        let total_delta = mixed + bias_delta;
        let accept =
            total_delta <= 0.0 || self.rng.uniform() < acceptance_probability(beta, total_delta);

        if accept {
            self.replicas[0].commit(k, proposal.spin, proposal.moment, delta0);
            self.replicas[1].commit(k, proposal.spin, proposal.moment, delta1);
            self.magnetization_vector = candidate_magnetization;
            self.observables.record_accept();
        } else {
            self.observables.record_reject();
        }
    }

    /// Registers a graph coloring of the sites for intra-sweep parallelism (§5):
    /// each inner `Vec<usize>` must be a set of sites with no Heisenberg edge
    /// between any pair of them. When set, every sweep dispatches one color
    /// class at a time, evaluating that class's Δ-energies concurrently; when
    /// unset (the default), the sweep is the fully sequential §4.5 loop. Pass an
    /// empty `Vec` to disable coloring again.
    pub fn set_site_coloring(&mut self, coloring: Vec<Vec<usize>>) -> Result<()> {
        for class in &coloring {
            for &k in class {
                if k >= self.n {
                    return Err(EngineError::InvalidTopology {
                        index: k,
                        n_sites: self.n,
                    });
                }
            }
        }
        self.coloring = if coloring.is_empty() {
            None
        } else {
            Some(coloring)
        };
        Ok(())
    }

    fn metropolis_trial(&mut self, beta: f64) {
        let k = self.rng.site_index(self.n);
        let (s_old, mu_old) = self.replicas[0].spins.get(k);
        let proposal = self.proposal.propose(s_old, mu_old, &mut self.rng);

        let delta0 = self.replicas[0].delta(k, proposal.spin, proposal.moment);
        let delta1 = self.replicas[1].delta(k, proposal.spin, proposal.moment);
        self.apply_trial(beta, k, proposal, delta0, delta1);
    }

    /// Graph-colored variant of the sweep (§5, §9 "Sparse adjacency"): each color
    /// class is a set of mutually non-adjacent sites, so their proposals are
    /// drawn sequentially (the RNG stream must stay ordered) but their Δ-energy
    /// evaluation runs concurrently via `rayon` before accept/reject is applied
    /// one site at a time, in class order.
    fn sweep_colored(&mut self, beta: f64) {
        let coloring = self
            .coloring
            .clone()
            .expect("sweep_colored called without a coloring");
        for class in &coloring {
            let proposals: Vec<(usize, Proposal)> = class
                .iter()
                .map(|&k| {
                    let (s_old, mu_old) = self.replicas[0].spins.get(k);
                    (k, self.proposal.propose(s_old, mu_old, &mut self.rng))
                })
                .collect();

            self.replicas[0].hamiltonian.ensure_adjacency();
            self.replicas[1].hamiltonian.ensure_adjacency();
            let deltas0 = colored_deltas(
                &self.replicas[0].hamiltonian,
                &self.replicas[0].spins,
                &proposals,
            );
            let deltas1 = colored_deltas(
                &self.replicas[1].hamiltonian,
                &self.replicas[1].spins,
                &proposals,
            );

            for (idx, &(k, proposal)) in proposals.iter().enumerate() {
                self.apply_trial(beta, k, proposal, deltas0[idx], deltas1[idx]);
            }
        }
    }

    fn sweep(&mut self, beta: f64) {
        if self.coloring.is_some() {
            self.sweep_colored(beta);
        } else {
            for _ in 0..self.n {
                self.metropolis_trial(beta);
            }
        }
        if let Some(dynamics) = self.spin_dynamics {
            dynamics.step(&mut self.replicas[0].hamiltonian, &mut self.replicas[0].spins);
            self.replicas[1].spins = self.replicas[0].spins.clone();
            self.replicas[0].recompute_energy();
            self.replicas[1].recompute_energy();
            self.magnetization_vector = self.replicas[0].spins.magnetization_vector();
        }
        if let Some(bias) = &mut self.metadynamics {
            let cv = MetadynamicsBias::collective_variable(self.magnetization_vector);
            bias.deposit(cv);
        }
        self.observables
            .push_sweep([self.replicas[0].energy, self.replicas[1].energy], self.magnetization_vector.norm());
    }

    /// Advance the chain `number_of_iterations` sweeps at `temperature` (§4.8).
    /// Both must be positive; on success, every observable buffer grows by
    /// exactly `number_of_iterations`.
    pub fn run(&mut self, temperature: f64, number_of_iterations: usize) -> Result<()> {
        if !(temperature > 0.0) {
            return Err(EngineError::invalid_parameter(
                "temperature",
                "temperature must be positive",
            ));
        }
        if number_of_iterations == 0 {
            return Err(EngineError::invalid_parameter(
                "number_of_iterations",
                "number_of_iterations must be positive",
            ));
        }
        let beta = 1.0 / (K_BOLTZMANN_EV_PER_KELVIN * temperature);
        for _ in 0..number_of_iterations {
            self.sweep(beta);
        }
        self.has_run = true;
        Ok(())
    }

    pub fn get_energy(&self, index: usize) -> Result<f64> {
        Self::check_index(index)?;
        self.observables
            .last_energy(index)
            .ok_or(EngineError::NotInitialized("get_energy"))
    }

    pub fn get_energy_variance(&self, index: usize) -> Result<f64> {
        Self::check_index(index)?;
        self.observables
            .energy_variance(index)
            .ok_or(EngineError::NotInitialized("get_energy_variance"))
    }

    pub fn get_acceptance_ratio(&self) -> Result<f64> {
        self.observables
            .acceptance_ratio()
            .ok_or(EngineError::NotInitialized("get_acceptance_ratio"))
    }

    /// `[N, 3]` array of `µ·s` vectors for replica 0's current configuration.
    pub fn get_magnetic_moments(&self) -> Result<Vec<[f64; 3]>> {
        if !self.has_run {
            return Err(EngineError::NotInitialized("get_magnetic_moments"));
        }
        let moments = self.replicas[0].spins.moments();
        Ok(moments
            .outer_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect())
    }

    /// Per-sweep `‖Σ µ·s‖ / N`, one entry per sweep ever run (length grows by
    /// `number_of_iterations` each `run`).
    pub fn get_magnetization(&self) -> Result<&[f64]> {
        if !self.has_run {
            return Err(EngineError::NotInitialized("get_magnetization"));
        }
        Ok(self.observables.magnetization_history())
    }

    /// The `{magnetization, free_energy}` record of §6, one entry per bin.
    pub fn get_metadynamics_free_energy(&self) -> Result<crate::metadynamics::FreeEnergy> {
        self.metadynamics
            .as_ref()
            .map(|b| b.free_energy())
            .ok_or(EngineError::NotInitialized("get_metadynamics_free_energy"))
    }

    /// Resets the cumulative accept/reject counters only (§3's lifecycle note).
    pub fn reset_acceptance_counts(&mut self) {
        self.observables.reset_counts();
    }
}
