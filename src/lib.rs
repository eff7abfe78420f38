//! An interactive Magnetic Monte Carlo (MMC) engine for lattice spin models.
//!
//! Given a fixed set of sites carrying classical magnetic moments and a
//! Hamiltonian composed of pairwise (Heisenberg) and on-site (Landau) terms,
//! [`Engine`] samples equilibrium configurations at a chosen temperature via
//! single-site Metropolis updates, producing time series of the magnetization
//! and energy plus derived estimators (acceptance ratio, variance). Two
//! advanced sampling modes are supported: metadynamics (a history-dependent
//! bias on the collective magnetization) and thermodynamic integration between
//! two Hamiltonians (λ-mixing), and optionally a deterministic precessional
//! update ("spin dynamics") interleaved with the stochastic moves.
//!
//! The engine consumes a neighbor topology as a plain edge list `(i, j, J_ij)`
//! and produces arrays of floats; it has no opinion on lattice geometry, I/O,
//! or how that edge list was produced (e.g. from a sparse-matrix container).

mod dynamics;
mod error;
mod hamiltonian;
mod metadynamics;
mod observables;
mod proposal;
mod replica;
mod rng;
mod spin;
mod topology;

mod engine;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use metadynamics::FreeEnergy;
pub use proposal::{Proposal, ProposalMode};
pub use topology::Coupling;
