//! Iterative fixpoint construction of a closed dependency graph.
//!
//! Seeding puts one node per Podfile dependency into the graph, then the
//! repair loop alternates version harmonization with closure checks, adding
//! missing modules and raising conflicting ones until a check comes back
//! clean or the iteration ceiling reports the target unresolvable.

use podlift_core::dependency::{ancestor_chain, DependencyRef, SeedDep};
use podlift_core::podfile::Podfile;
use podlift_util::errors::PodliftError;

use crate::graph::{GraphNode, GraphPodfile};
use crate::store::CatalogStore;
use crate::version;

/// Tunable behavior of a [`Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Repair-loop ceiling before a target is reported unresolvable.
    pub max_iterations: usize,
    /// Also seed modules the rules Podfile names but no seed requested.
    pub merge_rules: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            merge_rules: false,
        }
    }
}

/// Drives Podfile seeds to a closed [`GraphPodfile`] against a catalog.
pub struct Resolver<'a> {
    store: &'a dyn CatalogStore,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn CatalogStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Resolve one Podfile target. An empty `target` resolves the union of
    /// all targets. `rules` optionally pins upgrade versions by module name.
    pub fn resolve(
        &self,
        podfile: &Podfile,
        target: &str,
        rules: Option<&Podfile>,
    ) -> miette::Result<GraphPodfile> {
        let seeds = podfile.seeds(target);
        self.resolve_seeds(&podfile.file_path.display().to_string(), target, &seeds, rules)
    }

    /// Resolve an explicit seed list. Merged analysis runs pass the union of
    /// several Podfiles' seeds through here.
    pub fn resolve_seeds(
        &self,
        source: &str,
        target: &str,
        seeds: &[SeedDep],
        rules: Option<&Podfile>,
    ) -> miette::Result<GraphPodfile> {
        let mut graph = GraphPodfile::new(source, target);

        for seed in seeds {
            let mut node = self.seed_node(seed)?;
            if let Some(rules) = rules {
                if let Some(pinned) = rule_version(rules, &node.name) {
                    node.update_to_version = pinned;
                }
            }
            graph.insert(node);
        }

        if self.config.merge_rules {
            if let Some(rules) = rules {
                for seed in rules.seeds("") {
                    if graph.get(seed.name()).is_some() {
                        continue;
                    }
                    let mut node = self.catalog_node(seed.name(), "")?;
                    node.is_new = true;
                    if let Some(pinned) = rule_version(rules, &node.name) {
                        node.update_to_version = pinned;
                    }
                    graph.insert(node);
                }
            }
        }

        self.close(&mut graph, rules)?;
        Ok(graph)
    }

    /// Repair loop: harmonize, check, patch, repeat.
    fn close(&self, graph: &mut GraphPodfile, rules: Option<&Podfile>) -> miette::Result<()> {
        for iteration in 0..self.config.max_iterations {
            graph.balance_versions();
            self.refresh_depends(graph)?;
            let report = graph.check();
            if report.is_closed() {
                tracing::debug!(
                    target_name = %graph.target,
                    iterations = iteration + 1,
                    modules = graph.modules.len(),
                    "graph closed"
                );
                return Ok(());
            }
            tracing::debug!(
                target_name = %graph.target,
                iteration,
                missing = report.missing.len(),
                conflicts = report.conflicts.len(),
                "repairing graph"
            );

            for dep in &report.missing {
                let mut node = self.catalog_node(&dep.name, &dep.constraint)?;
                node.is_new = true;
                node.is_implicit = true;
                if let Some(rules) = rules {
                    if let Some(pinned) = rule_version(rules, &node.name) {
                        node.update_to_version = pinned;
                    }
                }
                graph.insert(node);
            }

            for conflict in &report.conflicts {
                self.raise_to_constraint(graph, &conflict.dep)?;
            }
        }
        Err(PodliftError::Unresolvable {
            message: format!(
                "target {} did not close after {} iterations",
                graph.target, self.config.max_iterations
            ),
        }
        .into())
    }

    /// Re-fetch each catalog-backed node's dependency set at its current
    /// effective version, so edges always reflect the version the plan
    /// would actually install. Local nodes keep their manifest depends.
    fn refresh_depends(&self, graph: &mut GraphPodfile) -> miette::Result<()> {
        let names: Vec<String> = graph.modules.keys().cloned().collect();
        for name in names {
            let node = &graph.modules[&name];
            if node.is_local {
                continue;
            }
            let effective = node.effective_version().to_string();
            if effective.is_empty() || effective == "*" {
                continue;
            }
            if let Some((deps, _)) = self.store.query_depends(&name, &effective)? {
                if let Some(node) = graph.modules.get_mut(&name) {
                    node.depends = deps;
                }
            }
        }
        Ok(())
    }

    /// Move the node a conflicting edge points at to the newest cataloged
    /// version satisfying the edge's constraint, or to the `"*"` sentinel
    /// when nothing satisfies it, so the run degrades instead of aborting.
    fn raise_to_constraint(
        &self,
        graph: &mut GraphPodfile,
        dep: &DependencyRef,
    ) -> miette::Result<()> {
        let Some(matched) = ancestor_chain(&dep.name).find(|c| graph.get(c).is_some()) else {
            return Ok(());
        };
        let matched = matched.to_string();
        let chosen = self
            .store
            .query_newest_version(&matched, &dep.constraint)?
            .unwrap_or_else(|| {
                tracing::warn!(
                    module = %matched,
                    constraint = %dep.constraint,
                    "no cataloged version satisfies constraint"
                );
                "*".to_string()
            });
        if let Some(node) = graph.modules.get_mut(&matched) {
            tracing::debug!(
                module = %matched,
                constraint = %dep.constraint,
                to = %chosen,
                "raising conflicting module"
            );
            node.update_to_version = chosen;
        }
        Ok(())
    }

    /// Build the node for one Podfile seed.
    fn seed_node(&self, seed: &SeedDep) -> miette::Result<GraphNode> {
        match seed {
            SeedDep::Local { dep, subdepends, .. } => Ok(GraphNode {
                name: dep.name.clone(),
                version: if dep.constraint.is_empty() {
                    "*".to_string()
                } else {
                    dep.constraint.clone()
                },
                is_local: true,
                depends: subdepends.clone(),
                ..GraphNode::default()
            }),
            SeedDep::Bare(dep) => self.catalog_node(&dep.name, &dep.constraint),
        }
    }

    /// Build a node from the catalog: pick the pinned version, record the
    /// newest, and pull the dependency set at the pinned version.
    fn catalog_node(&self, name: &str, constraint: &str) -> miette::Result<GraphNode> {
        let pinned = if version::is_explicit_version(constraint) {
            constraint.to_string()
        } else {
            self.store
                .query_newest_version(name, constraint)?
                .unwrap_or_else(|| "*".to_string())
        };
        let newest = self
            .store
            .query_newest_version(name, "")?
            .unwrap_or_default();
        let depends = if pinned == "*" {
            Vec::new()
        } else {
            self.store
                .query_depends(name, &pinned)?
                .map(|(deps, _)| deps)
                .unwrap_or_default()
        };
        Ok(GraphNode {
            name: name.to_string(),
            version: pinned,
            newest_version: newest,
            depends,
            ..GraphNode::default()
        })
    }
}

/// Upgrade version a rules Podfile pins for `name`, if any.
///
/// Walks the ancestor chain so a rule for `"Foo"` also pins `"Foo/Bar"`.
/// Multiple matching rule entries collapse to the newest version named.
fn rule_version(rules: &Podfile, name: &str) -> Option<String> {
    for candidate in ancestor_chain(name) {
        let (versions, exists) = rules.fuzzy_versions(candidate);
        if !exists {
            continue;
        }
        return versions
            .into_iter()
            .filter(|v| version::is_explicit_version(v))
            .max_by(|a, b| version::compare(a, b));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dep(name: &str, constraint: &str) -> DependencyRef {
        DependencyRef::new(name, constraint)
    }

    fn store_with_chain() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert("A", "1.0.0", vec![dep("B", ">= 1.0")]);
        store.insert("A", "2.0.0", vec![dep("B", ">= 2.0")]);
        store.insert("B", "1.0.0", vec![]);
        store.insert("B", "2.0.0", vec![dep("C", "~> 1.0")]);
        store.insert("C", "1.0.5", vec![]);
        store
    }

    #[test]
    fn closes_transitive_chain() {
        let store = store_with_chain();
        let resolver = Resolver::new(&store, ResolverConfig::default());
        let seeds = vec![SeedDep::Bare(dep("A", "2.0.0"))];
        let graph = resolver.resolve_seeds("Podfile", "App", &seeds, None).unwrap();

        assert_eq!(graph.modules.len(), 3);
        let b = graph.get("B").unwrap();
        assert!(b.is_new);
        assert!(b.is_implicit);
        assert_eq!(graph.get("C").unwrap().effective_version(), "1.0.5");
        assert!(graph.check().is_closed());
    }

    #[test]
    fn conflict_raises_existing_node() {
        let store = store_with_chain();
        let resolver = Resolver::new(&store, ResolverConfig::default());
        // B pinned low while A 2.0.0 wants >= 2.0.
        let seeds = vec![
            SeedDep::Bare(dep("A", "2.0.0")),
            SeedDep::Bare(dep("B", "1.0.0")),
        ];
        let graph = resolver.resolve_seeds("Podfile", "App", &seeds, None).unwrap();

        let b = graph.get("B").unwrap();
        assert_eq!(b.version, "1.0.0");
        assert_eq!(b.effective_version(), "2.0.0");
        assert_eq!(b.upgrade_tag(), "up");
        assert!(!b.is_new);
    }

    #[test]
    fn unknown_module_becomes_wildcard() {
        let store = MemoryStore::new();
        let resolver = Resolver::new(&store, ResolverConfig::default());
        let seeds = vec![SeedDep::Bare(dep("Ghost", ""))];
        let graph = resolver.resolve_seeds("Podfile", "App", &seeds, None).unwrap();
        assert_eq!(graph.get("Ghost").unwrap().version, "*");
    }

    #[test]
    fn local_seed_keeps_its_subdepends() {
        let store = store_with_chain();
        let resolver = Resolver::new(&store, ResolverConfig::default());
        let seeds = vec![SeedDep::Local {
            dep: dep("MyKit", "0.1.0"),
            spec_path: "Modules/MyKit/MyKit.podspec".into(),
            subdepends: vec![dep("B", ">= 2.0")],
        }];
        let graph = resolver.resolve_seeds("Podfile", "App", &seeds, None).unwrap();

        let local = graph.get("MyKit").unwrap();
        assert!(local.is_local);
        assert_eq!(local.version, "0.1.0");
        assert_eq!(graph.get("B").unwrap().effective_version(), "2.0.0");
    }

    #[test]
    fn rules_pin_upgrade_targets() {
        let store = store_with_chain();
        let resolver = Resolver::new(&store, ResolverConfig::default());
        let rules = Podfile::from_rules(&["A:2.0.0".to_string()]);
        let seeds = vec![SeedDep::Bare(dep("A", "1.0.0"))];
        let graph = resolver
            .resolve_seeds("Podfile", "App", &seeds, Some(&rules))
            .unwrap();

        let a = graph.get("A").unwrap();
        assert_eq!(a.version, "1.0.0");
        assert_eq!(a.effective_version(), "2.0.0");
        assert_eq!(a.upgrade_tag(), "up");
        // Raising A pulls B's requirement up with it.
        assert_eq!(graph.get("B").unwrap().effective_version(), "2.0.0");
    }

    #[test]
    fn merge_rules_add_unrequested_modules() {
        let store = store_with_chain();
        let resolver = Resolver::new(
            &store,
            ResolverConfig {
                merge_rules: true,
                ..ResolverConfig::default()
            },
        );
        let rules = Podfile::from_rules(&["C:1.0.5".to_string()]);
        let seeds = vec![SeedDep::Bare(dep("A", "1.0.0"))];
        let graph = resolver
            .resolve_seeds("Podfile", "App", &seeds, Some(&rules))
            .unwrap();

        // C was never requested and A 1.0.0 does not pull it in, but the
        // rules manifest names it.
        let c = graph.get("C").unwrap();
        assert!(c.is_new);
        assert!(!c.is_implicit);
        assert_eq!(c.effective_version(), "1.0.5");
    }

    #[test]
    fn unsatisfiable_conflict_degrades_to_wildcard() {
        let mut store = MemoryStore::new();
        store.insert("A", "1.0.0", vec![dep("B", ">= 5.0")]);
        store.insert("B", "1.0.0", vec![]);
        let resolver = Resolver::new(&store, ResolverConfig::default());
        let seeds = vec![
            SeedDep::Bare(dep("A", "1.0.0")),
            SeedDep::Bare(dep("B", "1.0.0")),
        ];
        let graph = resolver.resolve_seeds("Podfile", "App", &seeds, None).unwrap();

        let b = graph.get("B").unwrap();
        assert_eq!(b.update_to_version, "*");
        assert!(graph.check().is_closed());
    }

    #[test]
    fn iteration_ceiling_reports_unresolvable() {
        let mut store = MemoryStore::new();
        // Balancing keeps raising U/B to the umbrella's 2.0.0 while U/A's
        // edge keeps forcing it back below 1.5, so no pass ever closes.
        store.insert("U/A", "2.0.0", vec![dep("U/B", "< 1.5")]);
        store.insert("U/B", "1.0.0", vec![]);
        store.insert("U/B", "2.0.0", vec![]);
        let resolver = Resolver::new(
            &store,
            ResolverConfig {
                max_iterations: 4,
                ..ResolverConfig::default()
            },
        );
        let seeds = vec![
            SeedDep::Bare(dep("U/A", "2.0.0")),
            SeedDep::Bare(dep("U/B", "1.0.0")),
        ];
        let err = resolver
            .resolve_seeds("Podfile", "App", &seeds, None)
            .unwrap_err();
        assert!(err.to_string().contains("did not close"));
    }
}
