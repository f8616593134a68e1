use super::csr::RateGraph;
use super::solver::Relaxation;
use common::{error::Error, numeric_kernel::FixedWeight, types::ConversionResult};

/// Walks the predecessor map back from `target` to `source`.
///
/// `best_rate` is `e^(-distance[target])`, i.e. the inverse of the weight
/// transform under the graph's policy.
///
/// # Errors
/// `Error::NoPathFound` when the target was never reached, or the chain
/// breaks or runs longer than |V| steps without reaching `source`.
pub fn reconstruct_path(
    graph: &RateGraph,
    relaxation: &Relaxation,
    source: usize,
    target: usize,
) -> Result<ConversionResult, Error> {
    let Some(distance) = relaxation.fixed_distance(target) else {
        return Err(no_path(graph, source, target));
    };

    let mut nodes = vec![target];
    let mut current = target;
    while current != source {
        if nodes.len() > graph.num_nodes {
            return Err(no_path(graph, source, target));
        }
        current = relaxation
            .predecessor(current)
            .ok_or_else(|| no_path(graph, source, target))?;
        nodes.push(current);
    }
    nodes.reverse();

    let path = nodes
        .iter()
        .map(|&node| graph.currency(node).cloned())
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(ConversionResult {
        path,
        best_rate: graph.policy().rate_of(distance),
    })
}

/// Best conversion using at most |V| - 1 conversions.
///
/// Used when the relaxation still holds loops below the gain tolerance, which
/// can tangle its predecessor map. One distance row and one predecessor row
/// are kept per hop count, so walking back from `target` through the rows
/// always ends at `source`. Any loop left in the walk is cut out, and the rate
/// is the product of the original rates along the remaining path.
///
/// # Errors
/// `Error::NoPathFound` when `target` is not reachable from `source`, and
/// `Error::NodeIndexOutOfBounds` for an unknown node.
pub fn hop_bounded_path(
    graph: &RateGraph,
    source: usize,
    target: usize,
) -> Result<ConversionResult, Error> {
    let num_nodes = graph.num_nodes;
    if let Some(node) = [source, target].into_iter().find(|&n| n >= num_nodes) {
        return Err(Error::NodeIndexOutOfBounds(node));
    }
    let max_hops = num_nodes - 1;

    let mut first = vec![None; num_nodes];
    first[source] = Some(0);
    let mut distance: Vec<Vec<Option<FixedWeight>>> = vec![first];
    let mut predecessor: Vec<Vec<Option<usize>>> = vec![vec![None; num_nodes]];

    for hop in 1..=max_hops {
        let previous = &distance[hop - 1];
        let mut row = previous.clone();
        // `None` means the node kept its distance from the previous row.
        let mut pred_row = vec![None; num_nodes];

        for u in 0..num_nodes {
            let Some(du) = previous[u] else {
                continue;
            };
            for i in graph.out_edges(u) {
                let v = graph.edge_targets[i];
                let candidate = du.saturating_add(graph.edge_weights[i]);
                if row[v].is_none_or(|dv| candidate < dv) {
                    row[v] = Some(candidate);
                    pred_row[v] = Some(u);
                }
            }
        }

        distance.push(row);
        predecessor.push(pred_row);
    }

    if distance[max_hops][target].is_none() {
        return Err(no_path(graph, source, target));
    }

    let mut walk = vec![target];
    let mut current = target;
    for hop in (1..=max_hops).rev() {
        if let Some(u) = predecessor[hop][current] {
            walk.push(u);
            current = u;
        }
    }
    if current != source {
        return Err(no_path(graph, source, target));
    }
    walk.reverse();

    let mut nodes: Vec<usize> = Vec::with_capacity(walk.len());
    for node in walk {
        match nodes.iter().position(|&n| n == node) {
            Some(pos) => nodes.truncate(pos + 1),
            None => nodes.push(node),
        }
    }

    let rates = nodes
        .windows(2)
        .map(|pair| graph.rate(pair[0], pair[1]).ok_or(Error::InvalidGraph))
        .collect::<Result<Vec<f64>, Error>>()?;
    let path = nodes
        .iter()
        .map(|&node| graph.currency(node).cloned())
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(ConversionResult {
        path,
        best_rate: graph.policy().compound(rates),
    })
}

fn no_path(graph: &RateGraph, source: usize, target: usize) -> Error {
    match (graph.currency(source), graph.currency(target)) {
        (Ok(from), Ok(to)) => Error::NoPathFound {
            from: from.clone(),
            to: to.clone(),
        },
        (Err(e), _) | (_, Err(e)) => e,
    }
}
