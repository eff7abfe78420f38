//! Proposal kernel (SPEC_FULL.md §4.4): trial moves fed into the Metropolis
//! sweep's accept/reject rule.

use nalgebra::{Rotation3, Unit, Vector3};

use crate::rng::RngService;

/// A proposed `(s', µ')` pair for one site.
#[derive(Clone, Copy, Debug)]
pub struct Proposal {
    pub spin: Vector3<f64>,
    pub moment: f64,
}

/// Which trial-move distribution the sweep draws from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProposalMode {
    /// `s' ~ Uniform(S²)`; the default, large-step move.
    Isotropic,
    /// Rotate the current spin by a small random angle about a random axis,
    /// used alongside the spin-dynamics precessional step (§4.7) where large
    /// jumps would fight the deterministic relaxation.
    SmallAngle { max_angle: f64 },
}

impl Default for ProposalMode {
    fn default() -> Self {
        ProposalMode::Isotropic
    }
}

/// Generates trial moves. `sigma_mu` is the standard deviation of the Gaussian
/// perturbation applied to the moment magnitude; it defaults to `0.0`, which
/// holds magnitudes fixed (§4.4).
#[derive(Clone, Copy, Debug)]
pub struct ProposalKernel {
    pub mode: ProposalMode,
    pub sigma_mu: f64,
}

impl Default for ProposalKernel {
    fn default() -> Self {
        ProposalKernel {
            mode: ProposalMode::default(),
            sigma_mu: 0.0,
        }
    }
}

impl ProposalKernel {
    pub fn new(mode: ProposalMode, sigma_mu: f64) -> Self {
        ProposalKernel { mode, sigma_mu }
    }

    /// Draw a trial `(s', µ')` for the spin currently `s_old`/`mu_old` at the
    /// selected site.
    pub fn propose(&self, s_old: Vector3<f64>, mu_old: f64, rng: &mut RngService) -> Proposal {
        let spin = match self.mode {
            ProposalMode::Isotropic => rng.unit_sphere(),
            ProposalMode::SmallAngle { max_angle } => {
                let angle = (2.0 * rng.uniform() - 1.0) * max_angle;
                let axis = rng.unit_sphere();
                let axis = Unit::new_normalize(axis);
                Rotation3::from_axis_angle(&axis, angle) * s_old
            }
        };
        let moment = (mu_old + rng.normal(self.sigma_mu)).max(0.0);
        Proposal { spin, moment }
    }
}
