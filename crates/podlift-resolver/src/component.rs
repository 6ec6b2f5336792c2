//! Decomposition of a resolved graph into connected sub-graphs.
//!
//! Components are peeled off largest-closure first: the remaining node with
//! the biggest reachable set becomes the next component's root, and every
//! remaining node inside that closure joins it. Ties go to the
//! lexicographically smallest root, which makes the decomposition
//! deterministic for a given adjacency.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

/// One connected sub-graph of the module graph.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedGraph {
    /// The node the component was grown from.
    pub root: String,
    /// Member modules, in name order.
    pub nodes: Vec<String>,
}

/// Split an adjacency map into connected sub-graphs.
///
/// Edge targets absent from the map (modules referenced but not resolved)
/// count toward closure size but never become members. Self-edges are
/// ignored.
pub fn decompose(adjacency: &BTreeMap<String, Vec<String>>) -> Vec<ConnectedGraph> {
    let mut remaining: BTreeSet<String> = adjacency.keys().cloned().collect();
    let mut components = Vec::new();

    while !remaining.is_empty() {
        let mut root = String::new();
        let mut closure: BTreeSet<String> = BTreeSet::new();
        for candidate in &remaining {
            let reach = closure_of(adjacency, candidate);
            if reach.len() > closure.len() {
                root = candidate.clone();
                closure = reach;
            }
        }

        let nodes: Vec<String> = closure
            .iter()
            .filter(|name| remaining.contains(*name))
            .cloned()
            .collect();
        for name in &nodes {
            remaining.remove(name);
        }
        tracing::debug!(root = %root, size = nodes.len(), "peeled component");
        components.push(ConnectedGraph { root, nodes });
    }
    components
}

/// Forward-reachable set from `start`, including `start` itself.
fn closure_of(adjacency: &BTreeMap<String, Vec<String>>, start: &str) -> BTreeSet<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(start.to_string());
    queue.push_back(start);
    while let Some(current) = queue.pop_front() {
        for next in adjacency.get(current).into_iter().flatten() {
            if next != current && seen.insert(next.clone()) {
                if adjacency.contains_key(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}
