use super::csr::RateGraph;
use super::traits::{GraphSolver, Origin};
use common::{error::Error, numeric_kernel::FixedWeight};
use tracing::{debug, trace};

/// Outcome of one relaxation run: the distance map, the predecessor map and
/// the witness edges that were still relaxable after the final pass.
///
/// Distances are fixed-point weights; `None` stands for +infinity.
#[derive(Debug, Clone)]
pub struct Relaxation {
    pub origin: Origin,
    distance: Vec<Option<FixedWeight>>,
    predecessor: Vec<Option<usize>>,
    witnesses: Vec<usize>,
    weight_quantum: f64,
}

impl Relaxation {
    /// Distance of `node` in nats, `f64::INFINITY` when unreached.
    pub fn distance(&self, node: usize) -> f64 {
        match self.distance.get(node).copied().flatten() {
            Some(weight) => weight as f64 * self.weight_quantum,
            None => f64::INFINITY,
        }
    }

    pub fn fixed_distance(&self, node: usize) -> Option<FixedWeight> {
        self.distance.get(node).copied().flatten()
    }

    pub fn predecessor(&self, node: usize) -> Option<usize> {
        self.predecessor.get(node).copied().flatten()
    }

    pub fn predecessors(&self) -> &[Option<usize>] {
        &self.predecessor
    }

    /// CSR indices of the edges still relaxable after the final pass, in scan order.
    pub fn witnesses(&self) -> &[usize] {
        &self.witnesses
    }

    pub fn has_negative_cycle(&self) -> bool {
        !self.witnesses.is_empty()
    }
}

/// Classic Bellman-Ford over the CSR graph.
///
/// Relaxation is a strict integer comparison on fixed-point weights, so ties
/// never relax and the outcome is fully deterministic for a given edge order.
pub struct BellmanFordSolver;

impl BellmanFordSolver {
    /// One pass over every edge. Returns whether any distance improved.
    fn relax_pass(
        graph: &RateGraph,
        distance: &mut [Option<FixedWeight>],
        predecessor: &mut [Option<usize>],
    ) -> bool {
        let mut changed = false;

        for u in 0..graph.num_nodes {
            let Some(du) = distance[u] else {
                continue;
            };

            // Traverse edges u -> v; 'i' is the CSR index of the edge.
            for i in graph.out_edges(u) {
                let v = graph.edge_targets[i];
                let candidate = du.saturating_add(graph.edge_weights[i]);

                if distance[v].is_none_or(|dv| candidate < dv) {
                    distance[v] = Some(candidate);
                    predecessor[v] = Some(u);
                    changed = true;
                }
            }
        }

        changed
    }

    fn is_relaxable(graph: &RateGraph, distance: &[Option<FixedWeight>], edge_idx: usize) -> bool {
        let u = graph.edge_source_by_index[edge_idx];
        let v = graph.edge_targets[edge_idx];
        match distance[u] {
            Some(du) => {
                let candidate = du.saturating_add(graph.edge_weights[edge_idx]);
                distance[v].is_none_or(|dv| candidate < dv)
            }
            None => false,
        }
    }
}

impl GraphSolver for BellmanFordSolver {
    /// Runs |V| - 1 passes from a source (|V| passes from the virtual
    /// source, which adds one node), then scans every edge once more.
    ///
    /// # Returns
    /// - `Ok(relaxation)` with `witnesses()` empty when no negative cycle is reachable.
    /// - `Err(Error::NodeIndexOutOfBounds)` if the source is not a node.
    fn relax(&self, graph: &RateGraph, origin: Origin) -> Result<Relaxation, Error> {
        let num_nodes = graph.num_nodes;
        let mut distance: Vec<Option<FixedWeight>> = vec![None; num_nodes];
        let mut predecessor = vec![None; num_nodes];

        let passes = match origin {
            Origin::Source(source) => {
                if source >= num_nodes {
                    return Err(Error::NodeIndexOutOfBounds(source));
                }
                distance[source] = Some(0);
                num_nodes - 1
            }
            Origin::Virtual => {
                distance.iter_mut().for_each(|d| *d = Some(0));
                num_nodes
            }
        };

        let mut passes_run = 0;
        for _ in 0..passes {
            passes_run += 1;
            // A pass without improvements means every later pass is a no-op too.
            if !Self::relax_pass(graph, &mut distance, &mut predecessor) {
                break;
            }
        }

        let witnesses: Vec<usize> = (0..graph.num_edges())
            .filter(|&i| Self::is_relaxable(graph, &distance, i))
            .collect();

        for &i in &witnesses {
            trace!(
                from = graph.edge_source_by_index[i],
                to = graph.edge_targets[i],
                "edge still relaxable after final pass"
            );
        }
        debug!(
            ?origin,
            passes = passes_run,
            witnesses = witnesses.len(),
            "relaxation finished"
        );

        Ok(Relaxation {
            origin,
            distance,
            predecessor,
            witnesses,
            weight_quantum: graph.policy().weight_quantum,
        })
    }
}
