//! The resolved dependency graph for a single Podfile target.
//!
//! A [`GraphPodfile`] maps module names to [`GraphNode`]s and is driven to a
//! closed, conflict-free state by the resolver. Closure checking and
//! cross-Podfile bookkeeping live here; the iteration loop that repairs
//! violations lives in [`crate::resolver`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use podlift_core::dependency::{ancestor_chain, base_module, DependencyRef};

use crate::version;

/// One module in a resolved graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphNode {
    pub name: String,
    /// Version currently pinned by the Podfile, or empty when unknown.
    pub version: String,
    /// Version the plan proposes to move to, or empty to stay put.
    pub update_to_version: String,
    /// Newest version the catalog knows about, or empty when uncataloged.
    pub newest_version: String,
    /// Appears in every analyzed Podfile.
    pub is_common: bool,
    /// Not present in the Podfile seeds; pulled in during closure.
    pub is_new: bool,
    /// Added to satisfy another module rather than requested directly.
    pub is_implicit: bool,
    /// Backed by a local podspec rather than the catalog.
    pub is_local: bool,
    pub depends: Vec<DependencyRef>,
}

impl GraphNode {
    /// The version this node resolves to: the planned upgrade when one is
    /// set, capped at the newest cataloged version, otherwise the pinned
    /// version.
    pub fn effective_version(&self) -> &str {
        if self.update_to_version.is_empty() {
            return &self.version;
        }
        if !self.newest_version.is_empty()
            && version::compare(&self.update_to_version, &self.newest_version) == Ordering::Greater
        {
            return &self.newest_version;
        }
        &self.update_to_version
    }

    /// `"up"`, `"down"`, or `"-"` describing the move from the pinned
    /// version to the effective one.
    pub fn upgrade_tag(&self) -> &'static str {
        if self.version.is_empty() || self.update_to_version.is_empty() {
            return "-";
        }
        match version::compare(self.effective_version(), &self.version) {
            Ordering::Greater => "up",
            Ordering::Less => "down",
            Ordering::Equal => "-",
        }
    }

    /// Names of the modules this node depends on.
    pub fn reference_names(&self) -> Vec<String> {
        self.depends.iter().map(|d| d.name.clone()).collect()
    }
}

/// A dependency edge whose constraint the current graph does not satisfy.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// Module whose dependency list produced the violation.
    pub source: String,
    pub dep: DependencyRef,
}

/// Outcome of one closure check over a graph.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Referenced modules with no node in the graph, deduplicated by name.
    pub missing: Vec<DependencyRef>,
    /// Edges whose target node is present but at an unsatisfying version.
    pub conflicts: Vec<Conflict>,
}

impl CheckReport {
    pub fn is_closed(&self) -> bool {
        self.missing.is_empty() && self.conflicts.is_empty()
    }
}

/// The full resolved graph for one Podfile target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphPodfile {
    /// Path of the Podfile this graph was seeded from.
    pub source: String,
    pub target: String,
    pub modules: BTreeMap<String, GraphNode>,
}

impl GraphPodfile {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            modules: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, node: GraphNode) {
        self.modules.insert(node.name.clone(), node);
    }

    pub fn get(&self, name: &str) -> Option<&GraphNode> {
        self.modules.get(name)
    }

    /// Look a referenced module up, falling back along the ancestor chain so
    /// a reference to `A/B/C` can match a node for `A/B` or `A`.
    pub fn lookup(&self, name: &str) -> Option<&GraphNode> {
        ancestor_chain(name).find_map(|candidate| self.modules.get(candidate))
    }

    /// One pass over every edge in the graph.
    ///
    /// An edge whose target has no node (not even via ancestor fallback) is
    /// reported missing. An edge whose target is present but whose effective
    /// version fails the constraint is reported as a conflict. Edges with an
    /// empty constraint, and targets pinned to `"*"` or with no version at
    /// all, are never conflicts.
    pub fn check(&self) -> CheckReport {
        let mut report = CheckReport::default();
        let mut seen_missing = std::collections::BTreeSet::new();
        for node in self.modules.values() {
            for dep in &node.depends {
                match self.lookup(&dep.name) {
                    None => {
                        if seen_missing.insert(dep.name.clone()) {
                            report.missing.push(dep.clone());
                        }
                    }
                    Some(matched) => {
                        let effective = matched.effective_version();
                        if dep.constraint.is_empty() || effective.is_empty() || effective == "*" {
                            continue;
                        }
                        if !version::satisfies(&dep.constraint, effective) {
                            report.conflicts.push(Conflict {
                                source: node.name.clone(),
                                dep: dep.clone(),
                            });
                        }
                    }
                }
            }
        }
        report
    }

    /// Harmonize versions across sub-modules of the same umbrella module.
    ///
    /// All nodes sharing a base module must ship at one version, so the
    /// highest effective version in each group wins. The winner overwrites
    /// each lagging member's upgrade target when one is already set,
    /// otherwise its pinned version. Returns the number of nodes adjusted.
    pub fn balance_versions(&mut self) -> usize {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in self.modules.keys() {
            groups
                .entry(base_module(name).to_string())
                .or_default()
                .push(name.clone());
        }

        let mut adjusted = 0;
        for members in groups.values() {
            if members.len() < 2 {
                continue;
            }
            let winner = members
                .iter()
                .filter_map(|name| {
                    let effective = self.modules[name].effective_version();
                    (!effective.is_empty() && effective != "*").then(|| effective.to_string())
                })
                .max_by(|a, b| version::compare(a, b));
            let Some(winner) = winner else { continue };
            for name in members {
                let node = self
                    .modules
                    .get_mut(name)
                    .filter(|node| node.effective_version() != winner);
                if let Some(node) = node {
                    tracing::debug!(
                        module = %node.name,
                        from = %node.effective_version(),
                        to = %winner,
                        "balancing sub-module version"
                    );
                    if node.update_to_version.is_empty() {
                        node.version = winner.clone();
                    } else {
                        node.update_to_version = winner.clone();
                    }
                    adjusted += 1;
                }
            }
        }
        adjusted
    }

    /// Adjacency projection used by component decomposition and tree
    /// building: module name to referenced module names.
    pub fn adjacency(&self) -> BTreeMap<String, Vec<String>> {
        self.modules
            .iter()
            .map(|(name, node)| (name.clone(), node.reference_names()))
            .collect()
    }

    /// Flat report rows, one per module, in name order.
    pub fn rows(&self) -> Vec<GraphRow> {
        self.modules.values().map(GraphRow::from_node).collect()
    }
}

/// One line of the upgrade-plan report.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRow {
    pub name: String,
    pub is_common: bool,
    pub is_new: bool,
    pub is_implicit: bool,
    pub is_local: bool,
    pub current: String,
    pub upgrade_to: String,
    pub upgrade_tag: String,
    pub newest: String,
    pub dependencies: String,
}

impl GraphRow {
    fn from_node(node: &GraphNode) -> Self {
        Self {
            name: node.name.clone(),
            is_common: node.is_common,
            is_new: node.is_new,
            is_implicit: node.is_implicit,
            is_local: node.is_local,
            current: node.version.clone(),
            upgrade_to: node.update_to_version.clone(),
            upgrade_tag: node.upgrade_tag().to_string(),
            newest: node.newest_version.clone(),
            dependencies: node
                .depends
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Flag every module present in all of the analyzed graphs as common.
/// A single graph has no common modules.
pub fn mark_common(graphs: &mut [GraphPodfile]) {
    if graphs.len() < 2 {
        return;
    }
    let total = graphs.len();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for graph in graphs.iter() {
        for name in graph.modules.keys() {
            *counts.entry(name.clone()).or_default() += 1;
        }
    }
    for graph in graphs.iter_mut() {
        for node in graph.modules.values_mut() {
            if counts.get(&node.name).copied().unwrap_or(0) == total {
                node.is_common = true;
            }
        }
    }
}
