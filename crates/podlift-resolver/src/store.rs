//! The catalog interface the resolver consumes.
//!
//! The persistent store itself lives in `podlift-catalog`; the resolver only
//! needs these two queries. [`MemoryStore`] is a small in-memory
//! implementation used in tests and for ad-hoc resolution runs.

use std::collections::BTreeMap;

use podlift_core::dependency::{base_module, DependencyRef};

use crate::version;

/// Read access to the module catalog.
pub trait CatalogStore {
    /// The stored dependency set for `module` at `version`, together with
    /// the label of the repo it was indexed from. `Ok(None)` when the
    /// module/version is unknown.
    fn query_depends(
        &self,
        module: &str,
        version: &str,
    ) -> miette::Result<Option<(Vec<DependencyRef>, String)>>;

    /// The newest known version of `module` satisfying `constraint`
    /// (empty constraint = unconstrained). `Ok(None)` when nothing
    /// satisfies.
    fn query_newest_version(&self, module: &str, constraint: &str)
        -> miette::Result<Option<String>>;
}

/// In-memory catalog keyed by `(module, version)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    depends: BTreeMap<(String, String), Vec<DependencyRef>>,
    versions: BTreeMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module version and its dependency set.
    pub fn insert(&mut self, module: &str, version: &str, depends: Vec<DependencyRef>) {
        self.versions
            .entry(module.to_string())
            .or_default()
            .push(version.to_string());
        self.depends
            .insert((module.to_string(), version.to_string()), depends);
    }

    fn versions_of(&self, module: &str) -> Option<&Vec<String>> {
        // Sub-modules without records of their own fall back to their
        // umbrella module's version history.
        self.versions
            .get(module)
            .or_else(|| self.versions.get(base_module(module)))
    }
}

impl CatalogStore for MemoryStore {
    fn query_depends(
        &self,
        module: &str,
        version: &str,
    ) -> miette::Result<Option<(Vec<DependencyRef>, String)>> {
        let key = (module.to_string(), version.to_string());
        let fallback = (base_module(module).to_string(), version.to_string());
        Ok(self
            .depends
            .get(&key)
            .or_else(|| self.depends.get(&fallback))
            .map(|deps| (deps.clone(), "memory".to_string())))
    }

    fn query_newest_version(
        &self,
        module: &str,
        constraint: &str,
    ) -> miette::Result<Option<String>> {
        Ok(self
            .versions_of(module)
            .and_then(|versions| version::max_satisfying(constraint, versions)))
    }
}
