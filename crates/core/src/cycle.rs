use std::collections::HashSet;

use super::csr::RateGraph;
use super::solver::Relaxation;
use common::error::Error;
use tracing::{trace, warn};

/// Recovers negative cycles from a relaxation's predecessor map.
pub struct CycleExtractor<'a> {
    graph: &'a RateGraph,
    relaxation: &'a Relaxation,
}

impl<'a> CycleExtractor<'a> {
    pub fn new(graph: &'a RateGraph, relaxation: &'a Relaxation) -> Self {
        Self { graph, relaxation }
    }

    /// Reconstructs the negative cycle behind one witness edge.
    ///
    /// The witness target `v` may only be downstream of the cycle, so the
    /// predecessor chain is first walked back |V| times to land on a node
    /// inside it (the anchor). The loop is then collected from the anchor
    /// until the anchor repeats, and reversed into forward order.
    ///
    /// The witness edge is treated as already relaxed, i.e. `u` is used as
    /// the predecessor of `v`.
    ///
    /// # Returns
    /// A closed node sequence: the first node repeats as the last.
    ///
    /// # Errors
    /// `Error::InvalidGraph` for an unknown edge index, and
    /// `Error::CycleExtractionFailed` if the chain breaks or does not close
    /// within |V| + 1 steps.
    pub fn extract(&self, witness_edge: usize) -> Result<Vec<usize>, Error> {
        let (u, v) = self.graph.edge_endpoints(witness_edge)?;
        let num_nodes = self.graph.num_nodes;

        let pred = |node: usize| -> Result<usize, Error> {
            if node == v {
                Ok(u)
            } else {
                self.relaxation
                    .predecessor(node)
                    .ok_or(Error::CycleExtractionFailed)
            }
        };

        let mut anchor = v;
        for _ in 0..num_nodes {
            anchor = pred(anchor)?;
        }

        let mut cycle = vec![anchor];
        let mut current = anchor;
        for _ in 0..=num_nodes {
            current = pred(current)?;
            cycle.push(current);

            if current == anchor {
                cycle.reverse();
                trace!(witness = witness_edge, ?cycle, "negative cycle extracted");
                return Ok(cycle);
            }
        }

        Err(Error::CycleExtractionFailed)
    }

    /// Extracts the cycle behind every witness edge, deduplicated by rotation.
    ///
    /// Cycles come back in canonical rotation (see [`canonical_rotation`]) and
    /// in the order their first witness was scanned.
    pub fn extract_all(&self) -> Result<Vec<Vec<usize>>, Error> {
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut cycles = Vec::new();

        for &witness in self.relaxation.witnesses() {
            let cycle = match self.extract(witness) {
                Ok(cycle) => canonical_rotation(&cycle),
                Err(e) => {
                    warn!(witness, error = %e, "cycle extraction failed");
                    return Err(e);
                }
            };

            if seen.insert(cycle.clone()) {
                cycles.push(cycle);
            }
        }

        Ok(cycles)
    }
}

/// Rotates a closed cycle so it starts (and ends) at its lowest node index.
///
/// Two cycles are the same loop exactly when their canonical rotations are equal.
pub fn canonical_rotation(cycle: &[usize]) -> Vec<usize> {
    let open = match cycle.split_last() {
        Some((_, open)) if !open.is_empty() => open,
        _ => return cycle.to_vec(),
    };

    let start = open
        .iter()
        .enumerate()
        .min_by_key(|&(_, node)| node)
        .map_or(0, |(i, _)| i);

    let mut rotated: Vec<usize> = open[start..].iter().chain(&open[..start]).copied().collect();
    rotated.push(rotated[0]);
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::BellmanFordSolver;
    use crate::traits::{GraphSolver, Origin};
    use common::numeric_kernel::NumericPolicy;
    use common::types::Edge;

    fn build_graph(edges: &mut [Edge], num_nodes: usize) -> RateGraph {
        let names = (0..num_nodes).map(|i| format!("N{i}")).collect();
        RateGraph::from_edges(names, edges, NumericPolicy::default()).unwrap()
    }

    fn extract_all(graph: &RateGraph, origin: Origin) -> Vec<Vec<usize>> {
        let relaxation = BellmanFordSolver.relax(graph, origin).unwrap();
        CycleExtractor::new(graph, &relaxation).extract_all().unwrap()
    }

    #[test]
    fn canonical_rotation_starts_at_lowest_node() {
        assert_eq!(canonical_rotation(&[2, 0, 1, 2]), vec![0, 1, 2, 0]);
        assert_eq!(canonical_rotation(&[0, 1, 2, 0]), vec![0, 1, 2, 0]);
        assert_eq!(canonical_rotation(&[1, 2, 0, 1]), vec![0, 1, 2, 0]);
        assert_eq!(canonical_rotation(&[]), Vec::<usize>::new());
    }

    #[test]
    fn canonical_rotation_keeps_direction() {
        // Reverse traversal is a different loop.
        assert_ne!(canonical_rotation(&[0, 1, 2, 0]), canonical_rotation(&[0, 2, 1, 0]));
    }

    #[test]
    fn extracts_three_node_cycle_in_forward_order() {
        // 0.5 * 0.9 * 2.3 = 1.035
        let mut edges = vec![(0, 1, 0.5), (1, 2, 0.9), (2, 0, 2.3)];
        let graph = build_graph(&mut edges, 3);

        let cycles = extract_all(&graph, Origin::Source(0));
        assert_eq!(cycles, vec![vec![0, 1, 2, 0]]);
    }

    #[test]
    fn witness_into_source_without_predecessor() {
        // With two nodes there is a single pass, and node 0 is scanned before
        // the source, so the source never gets a predecessor before the final scan.
        let mut edges = vec![(0, 1, 2.0), (1, 0, 2.0)];
        let graph = build_graph(&mut edges, 2);

        let relaxation = BellmanFordSolver.relax(&graph, Origin::Source(1)).unwrap();
        assert_eq!(relaxation.predecessor(1), None);
        assert_eq!(relaxation.witnesses().len(), 1);

        let cycles = CycleExtractor::new(&graph, &relaxation).extract_all().unwrap();
        assert_eq!(cycles, vec![vec![0, 1, 0]]);
    }

    #[test]
    fn tail_node_leads_back_into_cycle() {
        // Node 3 hangs off the cycle 0 -> 1 -> 2 -> 0.
        let mut edges = vec![(0, 1, 1.1), (1, 2, 1.1), (2, 0, 1.1), (2, 3, 1.0)];
        let graph = build_graph(&mut edges, 4);

        let cycles = extract_all(&graph, Origin::Source(0));
        assert_eq!(cycles, vec![vec![0, 1, 2, 0]]);
    }

    #[test]
    fn witnesses_on_same_cycle_yield_one_cycle() {
        // Loop 0 -> 1 -> 0 with a tail 0 -> 2; both edges leaving 0 stay relaxable.
        let mut edges = vec![(0, 1, 1.0), (1, 0, 1.5), (0, 2, 1.0)];
        let graph = build_graph(&mut edges, 3);

        let relaxation = BellmanFordSolver.relax(&graph, Origin::Source(0)).unwrap();
        assert_eq!(relaxation.witnesses().len(), 2);

        let extractor = CycleExtractor::new(&graph, &relaxation);
        let raw: Vec<Vec<usize>> = relaxation
            .witnesses()
            .iter()
            .map(|&w| extractor.extract(w).unwrap())
            .collect();
        for cycle in &raw {
            assert_eq!(canonical_rotation(cycle), vec![0, 1, 0]);
        }

        assert_eq!(extractor.extract_all().unwrap().len(), 1);
    }

    #[test]
    fn reports_independent_cycles() {
        let mut edges: Vec<Edge> = vec![
            (0, 1, 1.0),
            (1, 0, 1.1),
            (0, 2, 1.0),
            (2, 3, 1.0),
            (3, 2, 1.2),
        ];
        let graph = build_graph(&mut edges, 4);

        let cycles = extract_all(&graph, Origin::Source(0));
        assert!(cycles.contains(&vec![0, 1, 0]));
        assert!(cycles.contains(&vec![2, 3, 2]));
    }

    #[test]
    fn broken_chain_reports_failure() {
        // Hand-made relaxation where the witness chain dead-ends.
        let mut edges = vec![(0, 1, 1.0), (1, 2, 1.0)];
        let graph = build_graph(&mut edges, 3);
        let relaxation = BellmanFordSolver.relax(&graph, Origin::Source(0)).unwrap();

        // Edge 0 -> 1 is not really a witness; walking back from 1 reaches
        // node 0, which has no predecessor.
        let result = CycleExtractor::new(&graph, &relaxation).extract(0);
        assert!(matches!(result, Err(Error::CycleExtractionFailed)));
    }
}
