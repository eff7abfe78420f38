//! Heisenberg edge-list ingestion and sparse adjacency (SPEC_FULL.md §3, §9).
//!
//! Edges are kept exactly as supplied — no implicit deduplication — and the ½
//! factor in the total-energy formula (§4.3) is applied unconditionally. A caller
//! that wants a symmetric bond graph is expected to supply both `(i, j)` and
//! `(j, i)`, which is also what makes per-site adjacency enumeration in §4.3 see
//! every bond from both endpoints. See DESIGN.md, Open Question 2.

use itertools::izip;

use crate::error::{EngineError, Result};

/// A single directed Heisenberg coupling `(i, j, J)`. `i == j` is an on-site term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub i: usize,
    pub j: usize,
    pub coupling: f64,
}

/// A per-edge coupling strength, either one scalar broadcast over every edge or
/// one value per edge — the two forms §6 calls out for `set_heisenberg_coeff`.
pub enum Coupling<'a> {
    Scalar(f64),
    PerEdge(&'a [f64]),
}

/// Per-site adjacency, built once from the edge list and invalidated on any
/// topology mutation (§9's "Sparse adjacency" design note), stored as a CSR-like
/// `(row_ptr, neighbor, coupling)` triple alongside a flat per-site self-coupling.
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
    row_ptr: Vec<usize>,
    neighbor: Vec<usize>,
    coupling: Vec<f64>,
    self_coupling: Vec<f64>,
}

impl Adjacency {
    /// The off-diagonal neighbors of site `k`, as `(j, J)` pairs.
    pub fn neighbors(&self, k: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.row_ptr[k];
        let end = self.row_ptr[k + 1];
        self.neighbor[start..end]
            .iter()
            .copied()
            .zip(self.coupling[start..end].iter().copied())
    }

    /// The accumulated `J` of self-loop edges `(k, k, J)`.
    pub fn self_coupling(&self, k: usize) -> f64 {
        self.self_coupling[k]
    }
}

impl Topology {
    /// Shared-reference access to an already-built adjacency index, used by the
    /// graph-colored parallel sweep path (§5) where the `rayon` worker closures
    /// only ever need read access. Panics if called before [`Topology::adjacency`]
    /// has built the cache at least once.
    pub fn adjacency_ref(&self) -> &Adjacency {
        self.adjacency
            .as_ref()
            .expect("adjacency not built; call Topology::adjacency() first")
    }
}

/// The edge list and (lazily built) adjacency for one replica's Heisenberg term.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    n: usize,
    edges: Vec<Edge>,
    adjacency: Option<Adjacency>,
}

impl Topology {
    pub fn new(n: usize) -> Self {
        Topology {
            n,
            edges: Vec::new(),
            adjacency: None,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Append edges from parallel index arrays plus a scalar-or-per-edge coupling
    /// (§6's `set_heisenberg_coeff`). Validates `max(i, j) < n` before committing
    /// any edge, so a failed call leaves the topology unchanged (§7).
    pub fn append(&mut self, coupling: Coupling<'_>, i: &[usize], j: &[usize]) -> Result<()> {
        if i.len() != j.len() {
            return Err(EngineError::invalid_parameter(
                "i_array/j_array",
                format!(
                    "index arrays must have equal length, got {} and {}",
                    i.len(),
                    j.len()
                ),
            ));
        }
        let values: Vec<f64> = match coupling {
            Coupling::Scalar(v) => vec![v; i.len()],
            Coupling::PerEdge(vs) => {
                if vs.len() != i.len() {
                    return Err(EngineError::invalid_parameter(
                        "coupling",
                        format!(
                            "per-edge coupling array must match edge count, got {} and {}",
                            vs.len(),
                            i.len()
                        ),
                    ));
                }
                vs.to_vec()
            }
        };

        for (&ii, &jj) in i.iter().zip(j.iter()) {
            let offender = ii.max(jj);
            if offender >= self.n {
                return Err(EngineError::InvalidTopology {
                    index: offender,
                    n_sites: self.n,
                });
            }
        }

        self.edges.extend(
            izip!(i.iter(), j.iter(), values.iter()).map(|(&ii, &jj, &v)| Edge {
                i: ii,
                j: jj,
                coupling: v,
            }),
        );
        self.adjacency = None;
        Ok(())
    }

    /// Append edges from a CSR representation (`row_ptr`, `col_idx`, `data`),
    /// expanding it to the same `(i, j, J)` triplets `append` takes directly. This
    /// is what makes COO and CSR ingestion agree (§8 round-trip property).
    pub fn append_csr(&mut self, row_ptr: &[usize], col_idx: &[usize], data: &[f64]) -> Result<()> {
        if row_ptr.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(col_idx.len());
        for row in 0..row_ptr.len() - 1 {
            let start = row_ptr[row];
            let end = row_ptr[row + 1];
            rows.resize(rows.len() + (end - start), row);
        }
        self.append(Coupling::PerEdge(data), &rows, col_idx)
    }

    /// Drop all edges, invalidating any cached adjacency.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.adjacency = None;
    }

    /// Build (or reuse) the CSR-like per-site adjacency index.
    pub fn adjacency(&mut self) -> &Adjacency {
        if self.adjacency.is_none() {
            self.adjacency = Some(self.build_adjacency());
        }
        self.adjacency.as_ref().unwrap()
    }

    fn build_adjacency(&self) -> Adjacency {
        let mut degree = vec![0usize; self.n];
        let mut self_coupling = vec![0.0f64; self.n];
        for e in &self.edges {
            if e.i == e.j {
                self_coupling[e.i] += e.coupling;
            } else {
                degree[e.i] += 1;
            }
        }
        let mut row_ptr = Vec::with_capacity(self.n + 1);
        row_ptr.push(0);
        for d in &degree {
            row_ptr.push(*row_ptr.last().unwrap() + d);
        }
        let total = *row_ptr.last().unwrap();
        let mut neighbor = vec![0usize; total];
        let mut coupling = vec![0.0f64; total];
        let mut cursor = row_ptr.clone();
        for e in &self.edges {
            if e.i == e.j {
                continue;
            }
            let slot = cursor[e.i];
            neighbor[slot] = e.j;
            coupling[slot] = e.coupling;
            cursor[e.i] += 1;
        }
        Adjacency {
            row_ptr,
            neighbor,
            coupling,
            self_coupling,
        }
    }
}
