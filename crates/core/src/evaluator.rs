use super::csr::RateGraph;
use common::{error::Error, types::ArbitrageResult};
use tracing::{debug, warn};

/// Decides whether an extracted cycle is real arbitrage.
///
/// Gains are computed on the original rates, not on the quantized log
/// weights, and must clear the graph policy's `1 + gain_tolerance` gate.
pub struct ArbitrageEvaluator<'a> {
    graph: &'a RateGraph,
}

impl<'a> ArbitrageEvaluator<'a> {
    pub fn new(graph: &'a RateGraph) -> Self {
        Self { graph }
    }

    /// Compounded rate product along a closed node cycle.
    ///
    /// # Errors
    /// `Error::InvalidGraph` if two consecutive nodes are not joined by an edge.
    pub fn rate_product(&self, cycle: &[usize]) -> Result<f64, Error> {
        let rates = cycle
            .windows(2)
            .map(|pair| self.graph.rate(pair[0], pair[1]).ok_or(Error::InvalidGraph))
            .collect::<Result<Vec<f64>, Error>>()?;

        Ok(self.graph.policy().compound(rates))
    }

    /// Returns `Ok(None)` when the cycle is only a rounding artifact.
    pub fn evaluate(&self, cycle: &[usize]) -> Result<Option<ArbitrageResult>, Error> {
        let product = self.rate_product(cycle)?;

        if !self.graph.policy().is_real_gain(product) {
            warn!(?cycle, product, "discarding cycle below gain tolerance");
            return Ok(None);
        }

        let currencies = cycle
            .iter()
            .map(|&node| self.graph.currency(node).cloned())
            .collect::<Result<Vec<_>, Error>>()?;

        debug!(cycle = ?currencies, product, "arbitrage accepted");

        Ok(Some(ArbitrageResult {
            cycle: currencies,
            rate_product: product,
        }))
    }
}
