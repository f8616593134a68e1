//! Query entry points: build a graph from a rate snapshot, look for
//! arbitrage loops, or find the best conversion between two currencies.
//!
//! Every call is a pure function of the graph it is handed. Nothing is
//! cached between calls, so the same graph can be queried from several
//! threads at once.

use super::csr::RateGraph;
use super::cycle::CycleExtractor;
use super::evaluator::ArbitrageEvaluator;
use super::path::{hop_bounded_path, reconstruct_path};
use super::rates::RateSource;
use super::solver::{BellmanFordSolver, Relaxation};
use super::traits::{GraphSolver, Origin};
use common::{
    error::Error,
    numeric_kernel::NumericPolicy,
    types::{ArbitrageResult, ConversionResult},
};
use tracing::{debug, info};

/// Runs arbitrage and best-rate queries with a pluggable solver.
pub struct ArbitrageEngine<S = BellmanFordSolver> {
    solver: S,
}

impl Default for ArbitrageEngine<BellmanFordSolver> {
    fn default() -> Self {
        Self::new(BellmanFordSolver)
    }
}

impl<S> ArbitrageEngine<S>
where
    S: GraphSolver,
{
    pub fn new(solver: S) -> Self {
        ArbitrageEngine { solver }
    }

    /// Accepted arbitrage loops reachable from `source`. Empty when none.
    pub fn detect(&self, graph: &RateGraph, source: &str) -> Result<Vec<ArbitrageResult>, Error> {
        let source = graph.index_of(source)?;
        let (_, accepted) = self.evaluate_from(graph, Origin::Source(source))?;
        Ok(accepted)
    }

    /// Accepted arbitrage loops anywhere in the graph, including components
    /// no single source can reach.
    pub fn detect_global(&self, graph: &RateGraph) -> Result<Vec<ArbitrageResult>, Error> {
        let (_, accepted) = self.evaluate_from(graph, Origin::Virtual)?;
        Ok(accepted)
    }

    /// Best path and rate from `source` to `target`.
    ///
    /// # Errors
    /// `Error::NoPathFound` when `target` is unreachable, or when an accepted
    /// arbitrage loop is reachable from `source` (best rates are unbounded
    /// then).
    pub fn best_conversion(
        &self,
        graph: &RateGraph,
        source: &str,
        target: &str,
    ) -> Result<ConversionResult, Error> {
        let source_idx = graph.index_of(source)?;
        let target_idx = graph.index_of(target)?;

        let (relaxation, accepted) = self.evaluate_from(graph, Origin::Source(source_idx))?;
        if !accepted.is_empty() {
            debug!(
                source,
                loops = accepted.len(),
                "arbitrage reachable from source, no bounded best rate"
            );
            return Err(Error::NoPathFound {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        // Loops below the gain tolerance may remain; route around them.
        let result = if relaxation.has_negative_cycle() {
            hop_bounded_path(graph, source_idx, target_idx)?
        } else {
            reconstruct_path(graph, &relaxation, source_idx, target_idx)?
        };
        debug!(path = ?result.path, rate = result.best_rate, "best conversion found");
        Ok(result)
    }

    /// Relax, extract every distinct cycle, keep the ones that pass the gain gate.
    fn evaluate_from(
        &self,
        graph: &RateGraph,
        origin: Origin,
    ) -> Result<(Relaxation, Vec<ArbitrageResult>), Error> {
        let relaxation = self.solver.relax(graph, origin)?;
        if !relaxation.has_negative_cycle() {
            return Ok((relaxation, Vec::new()));
        }

        let cycles = CycleExtractor::new(graph, &relaxation).extract_all()?;
        let evaluator = ArbitrageEvaluator::new(graph);

        let mut accepted = Vec::with_capacity(cycles.len());
        for cycle in &cycles {
            if let Some(result) = evaluator.evaluate(cycle)? {
                accepted.push(result);
            }
        }

        info!(
            ?origin,
            candidates = cycles.len(),
            accepted = accepted.len(),
            "negative cycle scan complete"
        );

        Ok((relaxation, accepted))
    }
}

/// Builds a graph under the default [`NumericPolicy`].
pub fn build_graph<S, R>(currencies: &[S], rates: &R) -> Result<RateGraph, Error>
where
    S: AsRef<str>,
    R: RateSource + ?Sized,
{
    RateGraph::build(currencies, rates, NumericPolicy::default())
}

pub fn build_graph_with_policy<S, R>(
    currencies: &[S],
    rates: &R,
    policy: NumericPolicy,
) -> Result<RateGraph, Error>
where
    S: AsRef<str>,
    R: RateSource + ?Sized,
{
    RateGraph::build(currencies, rates, policy)
}

pub fn detect_arbitrage(graph: &RateGraph, source: &str) -> Result<Vec<ArbitrageResult>, Error> {
    ArbitrageEngine::default().detect(graph, source)
}

pub fn detect_arbitrage_global(graph: &RateGraph) -> Result<Vec<ArbitrageResult>, Error> {
    ArbitrageEngine::default().detect_global(graph)
}

pub fn best_conversion(
    graph: &RateGraph,
    source: &str,
    target: &str,
) -> Result<ConversionResult, Error> {
    ArbitrageEngine::default().best_conversion(graph, source, target)
}
