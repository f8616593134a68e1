use std::collections::HashMap;
use std::ops::Range;

use common::error::Error;
use common::numeric_kernel::{FixedWeight, NumericPolicy};
use common::types::{Currency, Edge};
use tracing::{debug, trace};

use super::rates::RateSource;

/// Currency conversion graph in Compressed Sparse Row (CSR) format.
///
/// CSR format stores outgoing edges of each node contiguously in memory:
/// - `node_pointers[u]..node_pointers[u+1]` → edges from node `u`
/// - `edge_targets[i]` -> target node of edge `i`
/// - `edge_weights[i]` -> fixed-point weight `-ln(rate)` of edge `i`
/// - `edge_rates[i]` -> original rate of edge `i`
/// - `edge_source_by_index[i]` -> source node of edge `i`
///
/// Within one node's block edges are sorted by target, so a pair lookup is a
/// binary search. The graph is immutable once built and carries the
/// [`NumericPolicy`] every query on it must use.
#[derive(Debug, Clone)]
pub struct RateGraph {
    pub(crate) num_nodes: usize,
    pub(crate) node_pointers: Vec<usize>,
    pub(crate) edge_targets: Vec<usize>,
    pub(crate) edge_weights: Vec<FixedWeight>,
    pub(crate) edge_rates: Vec<f64>,
    pub(crate) edge_source_by_index: Vec<usize>,
    currencies: Vec<Currency>,
    index: HashMap<Currency, usize>,
    policy: NumericPolicy,
}

impl RateGraph {
    /// Builds the graph for `currencies` from a rate snapshot.
    ///
    /// Every ordered pair `(u, v)` with `u != v` is queried exactly once. An
    /// absent rate leaves the edge out; a present but non-positive or
    /// non-finite rate aborts with `Error::InvalidRate`.
    ///
    /// # Errors
    /// `TooFewCurrencies` for fewer than two currencies, `DuplicateCurrency`
    /// for repeats, `InvalidRate` for bad rates and `InvalidPolicy` for a
    /// degenerate policy.
    pub fn build<S, R>(currencies: &[S], rates: &R, policy: NumericPolicy) -> Result<Self, Error>
    where
        S: AsRef<str>,
        R: RateSource + ?Sized,
    {
        if currencies.len() < 2 {
            return Err(Error::TooFewCurrencies(currencies.len()));
        }

        let currencies: Vec<Currency> = currencies.iter().map(|c| c.as_ref().to_string()).collect();
        let mut edges: Vec<Edge> = Vec::new();

        for (u, from) in currencies.iter().enumerate() {
            for (v, to) in currencies.iter().enumerate() {
                if u == v {
                    continue;
                }
                if let Some(rate) = rates.rate(from, to) {
                    edges.push((u, v, rate));
                }
            }
        }

        Self::from_edges(currencies, &mut edges, policy)
    }

    /// Creates a graph from raw index edges `(src, dst, rate)`.
    ///
    /// Edges are sorted by `(src, dst)`; self-loops are dropped and for a
    /// repeated pair the last supplied rate wins.
    ///
    /// # Errors
    /// `DuplicateCurrency`, `NodeIndexOutOfBounds` for an edge endpoint outside
    /// `currencies`, `InvalidRate`, and `InvalidPolicy` for a degenerate policy
    /// or one too coarse for this many currencies.
    pub fn from_edges(
        currencies: Vec<Currency>,
        edges: &mut [Edge],
        policy: NumericPolicy,
    ) -> Result<Self, Error> {
        policy.validate_for_nodes(currencies.len())?;

        let mut index = HashMap::with_capacity(currencies.len());
        for (i, currency) in currencies.iter().enumerate() {
            if index.insert(currency.clone(), i).is_some() {
                return Err(Error::DuplicateCurrency(currency.clone()));
            }
        }

        let num_nodes = currencies.len();
        for &(u, v, rate) in edges.iter() {
            let out_of_bounds = [u, v].into_iter().find(|&n| n >= num_nodes);
            if let Some(node) = out_of_bounds {
                return Err(Error::NodeIndexOutOfBounds(node));
            }
            if !(rate.is_finite() && rate > 0.0) {
                return Err(Error::InvalidRate {
                    from: currencies[u].clone(),
                    to: currencies[v].clone(),
                    rate,
                });
            }
        }

        edges.sort_by_key(|&(src, dst, _)| (src, dst));

        let mut unique: Vec<Edge> = Vec::with_capacity(edges.len());
        for &edge in edges.iter() {
            if edge.0 == edge.1 {
                trace!(node = edge.0, "dropping self-loop");
                continue;
            }
            match unique.last_mut() {
                Some(last) if (last.0, last.1) == (edge.0, edge.1) => *last = edge,
                _ => unique.push(edge),
            }
        }

        let (node_pointers, edge_targets, edge_weights, edge_rates, edge_source_by_index) =
            Self::build_csr_from_edges(num_nodes, &unique, &policy);

        debug!(
            nodes = num_nodes,
            edges = edge_targets.len(),
            "rate graph built"
        );

        Ok(Self {
            num_nodes,
            node_pointers,
            edge_targets,
            edge_weights,
            edge_rates,
            edge_source_by_index,
            currencies,
            index,
            policy,
        })
    }

    /// Two-pass counting construction of the CSR arrays.
    ///
    /// `edges` must already be sorted by source. Returns, in order,
    /// `node_pointers` (size |V| + 1), `edge_targets`, `edge_weights`
    /// (fixed-point `-ln(rate)`), `edge_rates` and `edge_source_by_index`,
    /// the last one giving O(1) edge-to-source lookups during cycle and path
    /// reconstruction.
    #[allow(clippy::type_complexity)]
    fn build_csr_from_edges(
        num_nodes: usize,
        edges: &[Edge],
        policy: &NumericPolicy,
    ) -> (Vec<usize>, Vec<usize>, Vec<FixedWeight>, Vec<f64>, Vec<usize>) {
        let m = edges.len();
        let mut node_pointers = vec![0; num_nodes + 1];

        for &(u, _, _) in edges {
            node_pointers[u + 1] += 1;
        }

        for i in 1..=num_nodes {
            node_pointers[i] += node_pointers[i - 1];
        }

        let mut edge_targets = vec![0; m];
        let mut edge_weights = vec![0; m];
        let mut edge_rates = vec![0.0; m];
        let mut edge_source_by_index = vec![0; m];

        let mut cursor = node_pointers.clone();

        for &(u, v, rate) in edges {
            let pos = cursor[u];
            edge_targets[pos] = v;
            edge_weights[pos] = policy.weight_of(rate);
            edge_rates[pos] = rate;
            edge_source_by_index[pos] = u;

            cursor[u] += 1;
        }

        (
            node_pointers,
            edge_targets,
            edge_weights,
            edge_rates,
            edge_source_by_index,
        )
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn node_pointers(&self) -> &[usize] {
        &self.node_pointers
    }

    pub fn edge_targets(&self) -> &[usize] {
        &self.edge_targets
    }

    /// Fixed-point weights, indexed like `edge_targets`.
    pub fn edge_weights(&self) -> &[FixedWeight] {
        &self.edge_weights
    }

    pub fn edge_rates(&self) -> &[f64] {
        &self.edge_rates
    }

    pub fn edge_source_by_index(&self) -> &[usize] {
        &self.edge_source_by_index
    }

    pub fn policy(&self) -> &NumericPolicy {
        &self.policy
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn num_edges(&self) -> usize {
        self.edge_targets.len()
    }

    /// Index of `currency` in the node set.
    ///
    /// # Errors
    /// Returns `Error::UnknownCurrency` if the currency is not a node.
    pub fn index_of(&self, currency: &str) -> Result<usize, Error> {
        self.index
            .get(currency)
            .copied()
            .ok_or_else(|| Error::UnknownCurrency(currency.to_string()))
    }

    /// Currency identifier of node `node`.
    pub fn currency(&self, node: usize) -> Result<&Currency, Error> {
        self.currencies
            .get(node)
            .ok_or(Error::NodeIndexOutOfBounds(node))
    }

    /// Range of CSR edge indices leaving `node`.
    pub fn out_edges(&self, node: usize) -> Range<usize> {
        self.node_pointers[node]..self.node_pointers[node + 1]
    }

    /// O(1) lookup for the source node of a given edge index.
    ///
    /// # Errors
    /// Returns `Error::InvalidGraph` if `edge_idx` is out of bounds.
    pub fn get_edge_source_node(&self, edge_idx: usize) -> Result<usize, Error> {
        self.edge_source_by_index
            .get(edge_idx)
            .copied()
            .ok_or(Error::InvalidGraph)
    }

    /// `(source, target)` of edge `edge_idx`.
    pub fn edge_endpoints(&self, edge_idx: usize) -> Result<(usize, usize), Error> {
        let source = self.get_edge_source_node(edge_idx)?;
        Ok((source, self.edge_targets[edge_idx]))
    }

    fn find_edge(&self, from: usize, to: usize) -> Option<usize> {
        if from >= self.num_nodes {
            return None;
        }
        let range = self.out_edges(from);
        let start = range.start;
        self.edge_targets[range]
            .binary_search(&to)
            .ok()
            .map(|offset| start + offset)
    }

    /// Original rate of the edge `from -> to`, if present.
    pub fn rate(&self, from: usize, to: usize) -> Option<f64> {
        self.find_edge(from, to).map(|i| self.edge_rates[i])
    }

    /// Fixed-point weight of the edge `from -> to`, if present.
    pub fn weight(&self, from: usize, to: usize) -> Option<FixedWeight> {
        self.find_edge(from, to).map(|i| self.edge_weights[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateTable;

    fn names(n: usize) -> Vec<Currency> {
        (0..n).map(|i| format!("C{i}")).collect()
    }

    fn graph(n: usize, edges: &mut [Edge]) -> RateGraph {
        RateGraph::from_edges(names(n), edges, NumericPolicy::default()).unwrap()
    }

    #[test]
    fn from_edges_creates_correct_csr_for_small_graph() {
        let mut edges = vec![(2, 1, 0.99), (0, 2, 1.1), (0, 1, 0.9)]; // Un-sorted edges
        let csr = graph(3, &mut edges);

        assert_eq!(csr.node_pointers, vec![0, 2, 2, 3]);
        assert_eq!(csr.edge_targets, vec![1, 2, 1]);
        assert_eq!(csr.edge_rates, vec![0.9, 1.1, 0.99]);
        assert_eq!(csr.edge_source_by_index, vec![0, 0, 2]);

        let policy = csr.policy();
        let expected_weights: Vec<FixedWeight> =
            csr.edge_rates.iter().map(|&r| policy.weight_of(r)).collect();
        assert_eq!(csr.edge_weights, expected_weights);
        assert_eq!(csr.num_nodes, 3);
    }

    #[test]
    fn node_with_no_outgoing_edges() {
        let mut edges = vec![(0, 2, 1.0)];
        let csr = graph(3, &mut edges);

        assert_eq!(csr.node_pointers, vec![0, 1, 1, 1]);
        assert_eq!(csr.edge_targets, vec![2]);
        assert_eq!(csr.edge_weights, vec![0]);
    }

    #[test]
    fn empty_graph() {
        let csr = graph(0, &mut []);

        assert_eq!(csr.num_nodes, 0);
        assert_eq!(csr.node_pointers, vec![0]);
        assert!(csr.edge_targets.is_empty());
    }

    #[test]
    fn self_loops_are_dropped() {
        let csr = graph(2, &mut [(0, 0, 2.0), (0, 1, 1.0)]);
        assert_eq!(csr.num_edges(), 1);
        assert_eq!(csr.rate(0, 0), None);
    }

    #[test]
    fn repeated_pair_keeps_latest_rate() {
        let csr = graph(2, &mut [(0, 1, 1.0), (0, 1, 2.0)]);

        assert_eq!(csr.edge_targets, vec![1]);
        assert_eq!(csr.rate(0, 1), Some(2.0));
    }

    #[test]
    fn edge_out_of_bounds_is_rejected() {
        let result = RateGraph::from_edges(names(2), &mut [(0, 5, 1.0)], NumericPolicy::default());
        assert!(matches!(result, Err(Error::NodeIndexOutOfBounds(5))));
    }

    #[test]
    fn pair_lookups() {
        let csr = graph(4, &mut [(0, 3, 3.0), (0, 1, 1.0), (0, 2, 2.0)]);

        assert_eq!(csr.rate(0, 2), Some(2.0));
        assert_eq!(csr.rate(2, 0), None);
        assert_eq!(csr.rate(9, 0), None);
        assert_eq!(csr.weight(0, 1), Some(0));
        assert_eq!(csr.edge_endpoints(2).unwrap(), (0, 3));
        assert!(matches!(csr.get_edge_source_node(3), Err(Error::InvalidGraph)));
    }

    #[test]
    fn build_queries_every_ordered_pair() {
        let table: RateTable = [
            ("USD", "EUR", 0.85),
            ("EUR", "USD", 1.17),
            ("EUR", "JPY", 130.0),
        ]
        .into_iter()
        .collect();

        let csr = RateGraph::build(&["USD", "EUR", "JPY"], &table, NumericPolicy::default()).unwrap();

        assert_eq!(csr.num_edges(), 3);
        assert_eq!(csr.index_of("JPY").unwrap(), 2);
        assert_eq!(csr.currency(1).unwrap(), "EUR");
        assert_eq!(csr.rate(1, 2), Some(130.0));
        assert_eq!(csr.rate(2, 0), None);
    }

    #[test]
    fn build_rejects_duplicate_currency() {
        let result = RateGraph::build(&["USD", "EUR", "USD"], &RateTable::new(), NumericPolicy::default());
        assert!(matches!(result, Err(Error::DuplicateCurrency(ref c)) if c == "USD"));
    }

    #[test]
    fn build_rejects_single_currency() {
        let result = RateGraph::build(&["USD"], &RateTable::new(), NumericPolicy::default());
        assert!(matches!(result, Err(Error::TooFewCurrencies(1))));
    }

    #[test]
    fn build_rejects_non_positive_and_non_finite_rates() {
        for bad in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let lookup = move |from: &str, _: &str| (from == "A").then_some(bad);
            let result = RateGraph::build(&["A", "B"], &lookup, NumericPolicy::default());
            assert!(
                matches!(result, Err(Error::InvalidRate { ref from, ref to, .. }) if from == "A" && to == "B"),
                "rate {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn build_rejects_invalid_policy() {
        let policy = NumericPolicy {
            weight_quantum: 0.0,
            gain_tolerance: 1e-9,
        };
        let result = RateGraph::build(&["A", "B"], &RateTable::new(), policy);
        assert!(matches!(result, Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn build_rejects_quantum_coarser_than_tolerance() {
        let coarse = NumericPolicy::new(1e-3, 1e-9).unwrap();
        let table: RateTable = [("A", "B", 1.0 + 2e-9), ("B", "A", 1.0)].into_iter().collect();

        let result = RateGraph::build(&["A", "B"], &table, coarse);
        assert!(matches!(result, Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn unknown_currency_lookup_fails() {
        let csr = graph(2, &mut []);
        assert!(matches!(csr.index_of("XYZ"), Err(Error::UnknownCurrency(ref c)) if c == "XYZ"));
    }
}
