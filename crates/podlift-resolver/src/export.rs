//! Serializable projections of graphs and trees for report output.

use std::collections::BTreeMap;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::graph::GraphPodfile;
use crate::tree::SpanningTree;

/// A name-labeled directed graph ready for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub name: String,
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Project a resolved graph onto its module-name edges.
///
/// Referenced modules with no node of their own still appear, so the export
/// shows exactly what the resolver saw.
pub fn export_graph(graph: &GraphPodfile) -> GraphExport {
    let mut digraph: DiGraph<String, ()> = DiGraph::new();
    let mut indices: BTreeMap<String, NodeIndex> = BTreeMap::new();

    let mut index_of = |digraph: &mut DiGraph<String, ()>, name: &str| -> NodeIndex {
        *indices
            .entry(name.to_string())
            .or_insert_with(|| digraph.add_node(name.to_string()))
    };

    for (name, node) in &graph.modules {
        let from = index_of(&mut digraph, name);
        for dep in &node.depends {
            let to = index_of(&mut digraph, &dep.name);
            digraph.update_edge(from, to, ());
        }
    }

    GraphExport {
        name: format!("{}#{}", graph.source, graph.target),
        nodes: digraph.node_weights().cloned().collect(),
        edges: digraph
            .edge_indices()
            .filter_map(|e| digraph.edge_endpoints(e))
            .map(|(a, b)| Edge {
                from: digraph[a].clone(),
                to: digraph[b].clone(),
            })
            .collect(),
    }
}

/// Project a spanning tree onto its parent-child edges.
pub fn export_tree(tree: &SpanningTree) -> GraphExport {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    tree.visit_depth_first(|_, node| {
        nodes.push(node.name.clone());
        for child in &node.children {
            edges.push(Edge {
                from: node.name.clone(),
                to: tree.nodes[*child].name.clone(),
            });
        }
    });
    GraphExport {
        name: tree.root().name.clone(),
        nodes,
        edges,
    }
}
