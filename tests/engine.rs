//! Black-box scenario tests against the public `Engine` API, mirroring the six
//! scenarios of the engine's testable-properties suite. No mocks: every test
//! runs the real sampler for real, the same way the original Python test suite
//! exercises the implementation end to end.

use spin_mc::{Coupling, Engine, EngineError};

fn ring_edges(n: usize) -> (Vec<usize>, Vec<usize>) {
    let i: Vec<usize> = (0..n).collect();
    let j: Vec<usize> = (0..n).map(|k| (k + 1) % n).collect();
    (i, j)
}

/// Scenario 1: Heisenberg equilibration.
#[test]
fn heisenberg_equilibration() {
    let n = 24;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 1).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    engine.run(300.0, 1000).unwrap();

    assert!(engine.get_energy(0).unwrap() < 0.0);
    let ratio = engine.get_acceptance_ratio().unwrap();
    assert!(ratio > 0.0 && ratio < 1.0);
    assert!(engine.get_energy_variance(0).unwrap() > 0.0);

    let magnetization = engine.get_magnetization().unwrap();
    assert_eq!(magnetization.len(), 1000);
    assert!(magnetization.iter().all(|&m| (0.0..=1.0).contains(&m)));
}

/// Scenario 2: invalid topology — an edge touching site `N` on an `N`-site
/// engine (one past the last valid index) must be rejected, not silently
/// truncated or wrapped, and must leave the engine's topology untouched.
#[test]
fn invalid_topology_off_by_one() {
    let n = 5;
    let (mut i, mut j) = ring_edges(n);
    i.push(n);
    j.push(0);

    let mut engine = Engine::new(n).unwrap();
    let err = engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTopology {
            index: n,
            n_sites: n
        }
    );

    // the failed call must not have mutated state: a clean edge list still works
    let (i, j) = ring_edges(n);
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
}

/// Scenario 3: Landau exponent validation.
#[test]
fn landau_exponent_validation() {
    let mut engine = Engine::new(3).unwrap();
    assert_eq!(
        engine.set_landau_coeff(1.0, 3, 0).unwrap_err(),
        EngineError::InvalidExponent(3)
    );
    assert_eq!(
        engine.set_landau_coeff(1.0, 12, 0).unwrap_err(),
        EngineError::InvalidExponent(12)
    );
    for &n in &[2, 4, 6, 8, 10] {
        engine.set_landau_coeff(0.01, n, 0).unwrap();
    }
}

/// Scenario 4: thermodynamic integration — a ferromagnetic `H0` against a
/// weaker antiferromagnetic `H1`, mixed at λ = 0.5, must keep `H0`'s sampled
/// energy below `H1`'s.
#[test]
fn thermodynamic_integration() {
    let n = 20;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 2).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(-0.03), &i, &j, 1)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(-0.03), &j, &i, 1)
        .unwrap();
    engine.set_lambda(0.5).unwrap();
    engine.run(300.0, 100).unwrap();

    assert!(engine.get_energy(0).unwrap() < engine.get_energy(1).unwrap());
}

/// Scenario 5: metadynamics — bin centers are uniformly spaced and the
/// reported free energy is never positive.
#[test]
fn metadynamics_bins_and_free_energy() {
    let n = 16;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 3).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    engine.set_metadynamics(1.0, Some(40), None, None).unwrap();
    engine.run(300.0, 100).unwrap();

    let fe = engine.get_metadynamics_free_energy().unwrap();
    assert_eq!(fe.magnetization.len(), 40);
    let diffs: Vec<f64> = fe.magnetization.windows(2).map(|w| w[1] - w[0]).collect();
    let max = diffs.iter().cloned().fold(f64::MIN, f64::max);
    let min = diffs.iter().cloned().fold(f64::MAX, f64::min);
    assert!((max - min).abs() < 1e-9);
    assert!(fe.free_energy.iter().all(|&f| f <= 0.0));
}

/// Scenario 6: spin dynamics — after toggling the deterministic precessional
/// step on, the chain still equilibrates to negative energy and every spin
/// stays unit-norm.
#[test]
fn spin_dynamics_preserves_unit_norm() {
    let n = 16;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 4).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    engine.switch_spin_dynamics();
    engine.run(300.0, 200).unwrap();

    assert!(engine.get_energy(0).unwrap() < 0.0);
    for m in engine.get_magnetic_moments().unwrap() {
        let norm = (m[0] * m[0] + m[1] * m[1] + m[2] * m[2]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}

/// λ = 0 round-trip: a dual-replica run with an inert second Hamiltonian must
/// reproduce a single-replica run's trajectory exactly, given the same seed.
#[test]
fn lambda_zero_round_trips_single_replica_trajectory() {
    let n = 10;
    let (i, j) = ring_edges(n);

    let mut dual = Engine::with_seed(n, 55).unwrap();
    dual.set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    dual.set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    dual.set_heisenberg_coeff(Coupling::Scalar(4.0), &i, &j, 1)
        .unwrap();
    dual.run(300.0, 80).unwrap();

    let mut solo = Engine::with_seed(n, 55).unwrap();
    solo.set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    solo.set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    solo.run(300.0, 80).unwrap();

    assert_eq!(
        dual.get_magnetization().unwrap(),
        solo.get_magnetization().unwrap()
    );
    assert!((dual.get_energy(0).unwrap() - solo.get_energy(0).unwrap()).abs() < 1e-9);
}

/// COO and CSR ingestion of the same bonds, driven from identical seeds, must
/// produce identical trajectories: the topologies they build are equivalent.
#[test]
fn coo_and_csr_ingestion_agree() {
    let mut coo = Engine::with_seed(3, 123).unwrap();
    coo.set_heisenberg_coeff(Coupling::PerEdge(&[0.5, 0.25]), &[0, 1], &[1, 2], 0)
        .unwrap();
    let mut csr = Engine::with_seed(3, 123).unwrap();
    csr.set_heisenberg_coeff_csr(&[0, 1, 2, 2], &[1, 2], &[0.5, 0.25], 0)
        .unwrap();

    coo.run(10.0, 1).unwrap();
    csr.run(10.0, 1).unwrap();
    assert_eq!(
        coo.get_magnetization().unwrap(),
        csr.get_magnetization().unwrap()
    );
}

/// Accessors are only meaningful between `run` invocations (§5); calling one
/// before any `run` must surface `NotInitialized` rather than a default value.
#[test]
fn accessors_require_a_prior_run() {
    let engine = Engine::new(4).unwrap();
    assert!(matches!(
        engine.get_acceptance_ratio(),
        Err(EngineError::NotInitialized(_))
    ));
    assert!(matches!(
        engine.get_magnetization(),
        Err(EngineError::NotInitialized(_))
    ));
    assert!(matches!(
        engine.get_magnetic_moments(),
        Err(EngineError::NotInitialized(_))
    ));
}

/// Constructing with zero sites is an `InvalidParameter`, not a panic.
#[test]
fn zero_sites_is_invalid_parameter() {
    assert!(matches!(
        Engine::new(0),
        Err(EngineError::InvalidParameter { .. })
    ));
}

/// `accept + reject == N * K` across a run, regardless of temperature.
#[test]
fn accept_reject_counts_match_total_attempts() {
    let n = 9;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 77).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.2), &i, &j, 0)
        .unwrap();
    engine.run(150.0, 60).unwrap();
    engine.run(150.0, 40).unwrap();

    let ratio = engine.get_acceptance_ratio().unwrap();
    assert!(ratio > 0.0 && ratio < 1.0);
    assert_eq!(engine.get_magnetization().unwrap().len(), 100);
}

/// A graph-colored sweep (bipartite ring, even/odd classes) must reach the
/// same qualitative equilibrium as the default sequential sweep.
#[test]
fn graph_colored_sweep_equilibrates() {
    let n = 20;
    let (i, j) = ring_edges(n);
    let mut engine = Engine::with_seed(n, 8).unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &i, &j, 0)
        .unwrap();
    engine
        .set_heisenberg_coeff(Coupling::Scalar(0.1), &j, &i, 0)
        .unwrap();
    engine
        .set_site_coloring(vec![(0..n).step_by(2).collect(), (1..n).step_by(2).collect()])
        .unwrap();
    engine.run(300.0, 400).unwrap();

    assert!(engine.get_energy(0).unwrap() < 0.0);
    let ratio = engine.get_acceptance_ratio().unwrap();
    assert!(ratio > 0.0 && ratio < 1.0);
}
