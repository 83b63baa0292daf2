//! Deterministic topological ordering.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use super::{Graph, GraphError};
use crate::types::FeatureId;

/// Order the graph's nodes so every edge points forward.
///
/// Kahn's algorithm with a min-heap on declaration index: among the nodes
/// whose dependencies are all scheduled, the one declared first goes next.
/// The order is therefore a pure function of the graph.
pub fn topo_sort(graph: &Graph) -> Result<Vec<FeatureId>, GraphError> {
    let n = graph.nodes.len();
    let mut index: BTreeMap<&FeatureId, usize> = BTreeMap::new();
    for (i, id) in graph.nodes.iter().enumerate() {
        if index.insert(id, i).is_some() {
            return Err(GraphError::FeatureDuplicate { id: id.clone() });
        }
    }

    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in &graph.edges {
        let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) else {
            return Err(GraphError::EdgeUnknown {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        };
        indegree[to] += 1;
        dependents[from].push(to);
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        order.push(graph.nodes[i].clone());
        for &j in &dependents[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < n {
        let cycle = find_cycle(graph, &index, &indegree);
        tracing::debug!(cycle_len = cycle.len(), "dependency cycle detected");
        return Err(GraphError::Cycle { nodes: cycle });
    }

    Ok(order)
}

/// Extract one concrete cycle among the nodes Kahn's algorithm left behind.
///
/// Every leftover node still has an unscheduled predecessor, so walking
/// predecessors from any leftover node must revisit a node.
fn find_cycle(
    graph: &Graph,
    index: &BTreeMap<&FeatureId, usize>,
    indegree: &[usize],
) -> Vec<FeatureId> {
    let n = graph.nodes.len();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in &graph.edges {
        if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
            if indegree[from] > 0 && indegree[to] > 0 {
                predecessors[to].push(from);
            }
        }
    }

    let Some(start) = (0..n).find(|&i| indegree[i] > 0) else {
        return Vec::new();
    };

    let mut position = vec![None; n];
    let mut path = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = position[current] {
            // Walked backwards; reverse so each node depends on the previous.
            let mut cycle: Vec<FeatureId> = path[pos..]
                .iter()
                .map(|&i: &usize| graph.nodes[i].clone())
                .collect();
            cycle.reverse();
            return cycle;
        }
        position[current] = Some(path.len());
        path.push(current);
        match predecessors[current].iter().min() {
            Some(&prev) => current = prev,
            None => return path.iter().map(|&i| graph.nodes[i].clone()).collect(),
        }
    }
}
