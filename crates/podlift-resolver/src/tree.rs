//! Spanning trees over connected components.
//!
//! Each component is layered breadth-first from its root, which sits at
//! level 1. An edge to a member not yet placed grows the tree; an edge to a
//! member already placed becomes a cross reference to that node; an edge
//! leaving the component is recorded at the root as an unresolved reference
//! that a later pass labels with the position of its target in another tree.
//! Cycles therefore never recurse, they turn into cross references back up
//! the tree.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use podlift_util::errors::PodliftError;

use crate::component::ConnectedGraph;

pub type NodeId = usize;

/// Index of the root node in [`SpanningTree::nodes`].
pub const ROOT: NodeId = 0;

/// An edge whose target lives outside this tree.
///
/// `resolution` is filled by [`resolve_references`]: either
/// `Root[<root>].Lv[<level>].<name>` pointing at where the target was
/// placed, or `NotFound` when no tree holds it.
#[derive(Debug, Clone, Serialize)]
pub struct Reference {
    pub name: String,
    /// Node whose edge produced this reference.
    pub referenced_by: String,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Distance from the root; the root is level 1.
    pub level: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Targets of non-tree edges that land elsewhere in this same tree.
    pub cross_references: Vec<NodeId>,
}

/// Breadth-first spanning tree of one connected component.
#[derive(Debug, Clone, Serialize)]
pub struct SpanningTree {
    pub nodes: Vec<TreeNode>,
    /// Edges leaving the component, deduplicated by target name and held at
    /// the root rather than on the referencing node.
    pub unresolved_references: Vec<Reference>,
}

impl SpanningTree {
    /// Layer `component` into a tree using the edges in `adjacency`.
    ///
    /// Errors when some member of the component is not reachable from its
    /// root, which would mean the component was not actually connected.
    pub fn build(
        component: &ConnectedGraph,
        adjacency: &BTreeMap<String, Vec<String>>,
    ) -> miette::Result<Self> {
        let mut remaining: BTreeSet<&str> =
            component.nodes.iter().map(String::as_str).collect();
        remaining.remove(component.root.as_str());

        let mut tree = Self {
            nodes: vec![TreeNode {
                name: component.root.clone(),
                level: 1,
                parent: None,
                children: Vec::new(),
                cross_references: Vec::new(),
            }],
            unresolved_references: Vec::new(),
        };
        let mut placed: BTreeMap<String, NodeId> = BTreeMap::new();
        placed.insert(component.root.clone(), ROOT);
        let mut seen_unresolved: BTreeSet<String> = BTreeSet::new();

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(ROOT);
        while let Some(id) = queue.pop_front() {
            let name = tree.nodes[id].name.clone();
            let level = tree.nodes[id].level;
            for target in adjacency.get(&name).into_iter().flatten() {
                if target == &name {
                    continue;
                }
                if remaining.remove(target.as_str()) {
                    let child = tree.nodes.len();
                    tree.nodes.push(TreeNode {
                        name: target.clone(),
                        level: level + 1,
                        parent: Some(id),
                        children: Vec::new(),
                        cross_references: Vec::new(),
                    });
                    placed.insert(target.clone(), child);
                    tree.nodes[id].children.push(child);
                    queue.push_back(child);
                } else if let Some(existing) = placed.get(target.as_str()) {
                    tree.nodes[id].cross_references.push(*existing);
                } else if seen_unresolved.insert(target.clone()) {
                    tree.unresolved_references.push(Reference {
                        name: target.clone(),
                        referenced_by: name.clone(),
                        resolution: None,
                    });
                }
            }
        }

        if !remaining.is_empty() {
            let stranded: Vec<&str> = remaining.into_iter().collect();
            return Err(PodliftError::InconsistentGraph {
                message: format!(
                    "component rooted at {} never reached: {}",
                    component.root,
                    stranded.join(", ")
                ),
            }
            .into());
        }
        Ok(tree)
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT]
    }

    /// Depth-first search by name, earliest match wins.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            if self.nodes[id].name == name {
                return Some(id);
            }
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        None
    }

    /// Visit every node depth-first, parents before children.
    pub fn visit_depth_first(&self, mut f: impl FnMut(NodeId, &TreeNode)) {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            f(id, &self.nodes[id]);
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
    }
}

/// Label every unresolved reference in `trees` with the position of its
/// target.
///
/// First indexes where each module was placed across all trees, then writes
/// either `Root[<root>].Lv[<level>].<name>` or `NotFound` into each
/// reference. Modules placed in several trees resolve to the first tree in
/// order.
pub fn resolve_references(trees: &mut [SpanningTree]) {
    let mut placements: BTreeMap<String, String> = BTreeMap::new();
    for tree in trees.iter() {
        let root = tree.root().name.clone();
        tree.visit_depth_first(|_, node| {
            placements
                .entry(node.name.clone())
                .or_insert_with(|| format!("Root[{root}].Lv[{}].{}", node.level, node.name));
        });
    }

    for tree in trees.iter_mut() {
        for reference in &mut tree.unresolved_references {
            reference.resolution = Some(
                placements
                    .get(&reference.name)
                    .cloned()
                    .unwrap_or_else(|| "NotFound".to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component;

    fn adjacency(edges: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    from.to_string(),
                    to.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn cycle_becomes_cross_reference() {
        let adj = adjacency(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let components = component::decompose(&adj);
        assert_eq!(components.len(), 1);
        let tree = SpanningTree::build(&components[0], &adj).unwrap();

        let c = tree.find("C").unwrap();
        assert_eq!(tree.nodes[c].level, 3);
        // C's edge back to A points at the root node, not a new child.
        assert_eq!(tree.nodes[c].cross_references, vec![ROOT]);
        assert!(tree.unresolved_references.is_empty());
    }

    #[test]
    fn reference_across_trees() {
        let adj = adjacency(&[
            ("A", &["B", "Shared"]),
            ("B", &[]),
            ("Shared", &[]),
            ("Z", &["Shared"]),
        ]);
        let components = component::decompose(&adj);
        let mut trees: Vec<SpanningTree> = components
            .iter()
            .map(|c| SpanningTree::build(c, &adj).unwrap())
            .collect();
        resolve_references(&mut trees);

        // Shared lands in A's tree, so Z's edge resolves across trees.
        let z_tree = trees
            .iter()
            .find(|t| t.root().name == "Z")
            .unwrap();
        assert_eq!(z_tree.unresolved_references.len(), 1);
        assert_eq!(z_tree.unresolved_references[0].referenced_by, "Z");
        assert_eq!(
            z_tree.unresolved_references[0].resolution.as_deref(),
            Some("Root[A].Lv[2].Shared")
        );
    }

    #[test]
    fn dangling_reference_is_not_found() {
        let adj = adjacency(&[("A", &["Ghost"])]);
        let components = component::decompose(&adj);
        let mut trees = vec![SpanningTree::build(&components[0], &adj).unwrap()];
        resolve_references(&mut trees);
        assert_eq!(
            trees[0].unresolved_references[0].resolution.as_deref(),
            Some("NotFound")
        );
    }

    #[test]
    fn layering_is_breadth_first() {
        let adj = adjacency(&[
            ("A", &["B", "C"]),
            ("B", &["D"]),
            ("C", &["D"]),
            ("D", &[]),
        ]);
        let components = component::decompose(&adj);
        let tree = SpanningTree::build(&components[0], &adj).unwrap();

        assert_eq!(tree.root().level, 1);
        let d = tree.find("D").unwrap();
        assert_eq!(tree.nodes[d].level, 3);
        assert_eq!(tree.nodes[d].parent, Some(tree.find("B").unwrap()));
        // C's edge to D is a cross reference, not a second parent.
        let c = tree.find("C").unwrap();
        assert_eq!(tree.nodes[c].cross_references, vec![d]);
    }

    #[test]
    fn stranded_member_is_an_error() {
        let component = ConnectedGraph {
            root: "A".to_string(),
            nodes: vec!["A".to_string(), "Island".to_string()],
        };
        let adj = adjacency(&[("A", &[]), ("Island", &[])]);
        let err = SpanningTree::build(&component, &adj).unwrap_err();
        assert!(err.to_string().contains("Island"));
    }
}
