use super::csr::RateGraph;
use super::solver::Relaxation;
use common::error::Error;

/// Where a relaxation run starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Single-source run: only nodes reachable from this node get a distance.
    Source(usize),
    /// Every node starts at distance 0, as if a zero-weight virtual source
    /// were connected to all of them. Finds cycles in every component.
    Virtual,
}

/// Trait for shortest-path solvers capable of detecting negative cycles.
pub trait GraphSolver {
    /// Runs the relaxation phase from `origin` and reports every edge still
    /// relaxable afterwards.
    ///
    /// Returns `Err(e)` if the origin is not a node of `graph`.
    fn relax(&self, graph: &RateGraph, origin: Origin) -> Result<Relaxation, Error>;
}
