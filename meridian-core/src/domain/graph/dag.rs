// meridian-core/src/domain/graph/dag.rs
//
// A generic layered topological sort (Kahn's algorithm), generalized from a
// model-name DAG to any `Ord + Hash + Clone` node key so it serves both the
// policy container's intra-service cycle check and the diff engine's
// dependency-ordered plan construction.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::Hash;

use crate::domain::error::DomainError;

pub struct GraphSolver;

impl GraphSolver {
    /// `edges[a]` lists the nodes that depend on `a` (i.e. `a -> b` means `a`
    /// must come before `b`). Returns layers in increasing dependency depth;
    /// within a layer, nodes are sorted for determinism. Fails with
    /// `ResolutionCycle` if any node is unreachable from a zero-in-degree
    /// start (a cycle exists among it and its dependents).
    pub fn layered_order<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> Result<Vec<Vec<N>>, DomainError>
    where
        N: Eq + Hash + Ord + Clone + std::fmt::Display,
    {
        let mut in_degree: HashMap<N, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();
        for (from, tos) in edges {
            if !in_degree.contains_key(from) {
                continue;
            }
            for to in tos {
                if let Some(d) = in_degree.get_mut(to) {
                    *d += 1;
                }
            }
        }

        let mut queue: VecDeque<N> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| n.clone())
            .collect();
        let mut sorted_queue: Vec<N> = queue.drain(..).collect();
        sorted_queue.sort();
        queue.extend(sorted_queue);

        let mut layers = Vec::new();
        let mut resolved = 0usize;

        while !queue.is_empty() {
            let layer_size = queue.len();
            let mut layer: Vec<N> = Vec::with_capacity(layer_size);
            let mut next_batch: Vec<N> = Vec::new();

            for _ in 0..layer_size {
                let current = queue.pop_front().expect("layer_size bounds this loop");
                resolved += 1;
                if let Some(tos) = edges.get(&current) {
                    for to in tos {
                        if let Some(d) = in_degree.get_mut(to) {
                            *d -= 1;
                            if *d == 0 {
                                next_batch.push(to.clone());
                            }
                        }
                    }
                }
                layer.push(current);
            }

            layer.sort();
            layers.push(layer);
            next_batch.sort();
            queue.extend(next_batch);
        }

        if resolved != nodes.len() {
            return Err(DomainError::ResolutionCycle(format!(
                "{} of {} nodes are part of a cycle",
                nodes.len() - resolved,
                nodes.len()
            )));
        }

        Ok(layers)
    }

    /// Flattened topological order (ties lexicographic), as required by the
    /// diff engine's deterministic `Create`/`Delete` ordering.
    pub fn flat_order<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> Result<Vec<N>, DomainError>
    where
        N: Eq + Hash + Ord + Clone + std::fmt::Display,
    {
        Ok(Self::layered_order(nodes, edges)?.into_iter().flatten().collect())
    }

    /// `true` iff `edges` (interpreted as `a -> b` meaning "a must precede
    /// b") contains a cycle over `nodes`.
    pub fn has_cycle<N>(nodes: &[N], edges: &HashMap<N, Vec<N>>) -> bool
    where
        N: Eq + Hash + Ord + Clone + std::fmt::Display,
    {
        Self::layered_order(nodes, edges).is_err()
    }

    /// Builds a `BTreeMap`-backed edge list from a flat list of `(from, to)`
    /// pairs, convenient for callers (the diff engine) that accumulate edges
    /// incrementally rather than holding a pre-built adjacency map.
    pub fn edges_from_pairs<N>(pairs: impl IntoIterator<Item = (N, N)>) -> HashMap<N, Vec<N>>
    where
        N: Eq + Hash + Ord + Clone,
    {
        let mut sorted: BTreeMap<N, Vec<N>> = BTreeMap::new();
        for (from, to) in pairs {
            sorted.entry(from).or_default().push(to);
        }
        sorted.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_produces_three_layers() {
        let nodes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let edges = GraphSolver::edges_from_pairs([("a".to_string(), "b".to_string()), ("b".to_string(), "c".to_string())]);
        let layers = GraphSolver::layered_order(&nodes, &edges).unwrap();
        assert_eq!(layers, vec![vec!["a".to_string()], vec!["b".to_string()], vec!["c".to_string()]]);
    }

    #[test]
    fn two_node_cycle_is_detected() {
        let nodes = vec!["a".to_string(), "b".to_string()];
        let edges = GraphSolver::edges_from_pairs([("a".to_string(), "b".to_string()), ("b".to_string(), "a".to_string())]);
        assert!(GraphSolver::layered_order(&nodes, &edges).is_err());
    }

    #[test]
    fn flat_order_is_lexicographic_within_a_layer() {
        let nodes = vec!["z".to_string(), "a".to_string()];
        let edges = HashMap::new();
        let order = GraphSolver::flat_order(&nodes, &edges).unwrap();
        assert_eq!(order, vec!["a".to_string(), "z".to_string()]);
    }
}
