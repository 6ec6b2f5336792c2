//! Parsed podspec trees and dependency flattening.
//!
//! A [`Spec`] is the structured form of one module's manifest: name, version,
//! declared dependencies, and nested subspecs with a default-activation
//! selector. Spec trees are read-only after load; flattening the same tree
//! twice yields the same result.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use podlift_util::errors::PodliftError;
use podlift_util::process::CommandBuilder;

use crate::dependency::{base_module, DependencyRef};

/// The structured representation of a podspec.
///
/// `dependencies` maps a dependency name to its list of constraint strings
/// (usually zero or one). Subspec names are only meaningful relative to their
/// ancestor chain; the full path joins ancestors with `/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub subspecs: Vec<Spec>,
    #[serde(default, rename = "default_subspecs")]
    pub default_subspecs: Option<DefaultSubspecs>,
}

/// The `default_subspecs` selector: a single name or a list of names.
/// When absent, every subspec is activated by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultSubspecs {
    One(String),
    Many(Vec<String>),
}

impl Spec {
    /// Parse a spec from its JSON form.
    pub fn from_json(json: &str) -> miette::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            PodliftError::Manifest {
                message: format!("Failed to parse spec JSON: {e}"),
            }
            .into()
        })
    }

    /// Whether the named subspec is activated by default.
    pub fn is_default_subspec(&self, name: &str) -> bool {
        match &self.default_subspecs {
            None => true,
            Some(DefaultSubspecs::One(n)) => n == name,
            Some(DefaultSubspecs::Many(names)) => names.iter().any(|n| n == name),
        }
    }

    /// Direct child subspec by name.
    pub fn subspec(&self, name: &str) -> Option<&Spec> {
        self.subspecs.iter().find(|s| s.name == name)
    }

    /// Only this node's own declared dependencies, without recursing into
    /// subspecs. Used for the intermediate segments of a deep target path,
    /// where only first-level declarations matter.
    pub fn exclude_subspec_dependencies(&self) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        for (name, constraints) in &self.dependencies {
            let constraint = constraints.first().cloned().unwrap_or_default();
            result.insert(name.clone(), constraint);
        }
        result
    }

    /// This node's own dependencies plus, for every default-activated
    /// subspec, the subspec's full path (empty constraint) and its own
    /// recursive default set. `own_path` is the node's full path from the
    /// tree root.
    fn default_dependencies(&self, own_path: &str) -> BTreeMap<String, String> {
        let mut result = self.exclude_subspec_dependencies();
        for sub in &self.subspecs {
            if !self.is_default_subspec(&sub.name) {
                continue;
            }
            let sub_path = format!("{own_path}/{}", sub.name);
            for (name, constraint) in sub.default_dependencies(&sub_path) {
                result.insert(name, constraint);
            }
            result.insert(sub_path, String::new());
        }
        result
    }

    /// Resolve a (possibly nested) module path like `"A/B/C"` to the chain of
    /// specs along it, paired with each node's full path.
    fn path_specs(&self, target_path: &str) -> Option<Vec<(String, &Spec)>> {
        let mut segments = target_path.split('/');
        if segments.next()? != self.name {
            return None;
        }
        let mut chain = vec![(self.name.clone(), self)];
        let mut current = self;
        let mut path = self.name.clone();
        for segment in segments {
            current = current.subspec(segment)?;
            path = format!("{path}/{segment}");
            chain.push((path.clone(), current));
        }
        Some(chain)
    }

    /// The complete, deduplicated dependency set for `target_path`.
    ///
    /// Intermediate path segments contribute only their own declared
    /// dependencies; the deepest node contributes its full default-recursive
    /// set. Dependencies that themselves name sub-modules of this tree are
    /// expanded in turn until no new ones appear. Later writes override
    /// earlier duplicate keys.
    pub fn flatten_dependencies(
        &self,
        target_path: &str,
    ) -> miette::Result<BTreeMap<String, String>> {
        if base_module(target_path) != self.name {
            return Err(PodliftError::NotFound {
                message: format!(
                    "module path `{target_path}` does not start at spec `{}`",
                    self.name
                ),
            }
            .into());
        }
        if self.path_specs(target_path).is_none() {
            return Err(PodliftError::NotFound {
                message: format!("no subspec chain for `{target_path}` in `{}`", self.name),
            }
            .into());
        }

        let mut result: BTreeMap<String, String> = BTreeMap::new();
        result.insert(target_path.to_string(), String::new());
        let mut expanded: Vec<String> = Vec::new();
        loop {
            let next = result
                .keys()
                .find(|key| {
                    !expanded.iter().any(|e| e == *key) && base_module(key) == self.name
                })
                .cloned();
            let Some(path) = next else { break };
            if let Some(chain) = self.path_specs(&path) {
                let last = chain.len() - 1;
                for (idx, (full_path, spec)) in chain.iter().enumerate() {
                    let deps = if idx == last {
                        spec.default_dependencies(full_path)
                    } else {
                        spec.exclude_subspec_dependencies()
                    };
                    for (name, constraint) in deps {
                        result.insert(name, constraint);
                    }
                }
            }
            expanded.push(path);
        }
        result.remove(target_path);
        Ok(result)
    }

    /// Every dependency declared anywhere in the tree, deduplicated by name.
    /// First occurrence wins; used when persisting a catalog record.
    pub fn all_dependency_refs(&self) -> Vec<DependencyRef> {
        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        self.collect_refs(&mut seen);
        seen.into_iter()
            .map(|(name, constraint)| DependencyRef::new(name, constraint))
            .collect()
    }

    fn collect_refs(&self, seen: &mut BTreeMap<String, String>) {
        for (name, constraints) in &self.dependencies {
            seen.entry(name.clone())
                .or_insert_with(|| constraints.first().cloned().unwrap_or_default());
        }
        for sub in &self.subspecs {
            sub.collect_refs(seen);
        }
    }
}

/// Read a spec file from disk.
///
/// `.json` files are parsed directly; `.podspec` files are converted to JSON
/// by shelling out to `pod ipc spec`.
pub fn read_spec(path: &Path) -> miette::Result<Spec> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let json = match ext.as_str() {
        "json" => std::fs::read_to_string(path).map_err(|e| PodliftError::NotFound {
            message: format!("cannot read spec {}: {e}", path.display()),
        })?,
        "podspec" => CommandBuilder::new("pod")
            .arg("ipc")
            .arg("spec")
            .arg(path.display().to_string())
            .exec_stdout()?,
        other => {
            return Err(PodliftError::Manifest {
                message: format!("unsupported spec file extension `{other}`"),
            }
            .into())
        }
    };
    Spec::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: &str) -> Spec {
        Spec::from_json(json).unwrap()
    }

    #[test]
    fn flatten_default_subspec_round_trip() {
        let root = spec(
            r#"{
                "name": "Root",
                "version": "1.0.0",
                "dependencies": {"X": []},
                "subspecs": [
                    {"name": "Sub", "dependencies": {"Y": []}}
                ]
            }"#,
        );
        let flat = root.flatten_dependencies("Root").unwrap();
        let expected: Vec<(&str, &str)> = vec![("Root/Sub", ""), ("X", ""), ("Y", "")];
        let got: Vec<(&str, &str)> = flat
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn flatten_is_idempotent() {
        let root = spec(
            r#"{
                "name": "Root",
                "dependencies": {"X": [">= 1.0"]},
                "subspecs": [{"name": "Sub", "dependencies": {"Y": []}}]
            }"#,
        );
        let first = root.flatten_dependencies("Root").unwrap();
        let second = root.flatten_dependencies("Root").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn flatten_nested_path_uses_own_deps_for_intermediates() {
        let root = spec(
            r#"{
                "name": "A",
                "dependencies": {"TopDep": []},
                "subspecs": [
                    {
                        "name": "B",
                        "dependencies": {"MidDep": []},
                        "subspecs": [
                            {"name": "C", "dependencies": {"DeepDep": ["~> 2.0"]}},
                            {"name": "D", "dependencies": {"OtherDep": []}}
                        ]
                    }
                ]
            }"#,
        );
        let flat = root.flatten_dependencies("A/B/C").unwrap();
        assert_eq!(flat.get("TopDep"), Some(&String::new()));
        assert_eq!(flat.get("MidDep"), Some(&String::new()));
        assert_eq!(flat.get("DeepDep"), Some(&"~> 2.0".to_string()));
        // Sibling subspec D is not on the path and not pulled in.
        assert!(!flat.contains_key("OtherDep"));
        assert!(!flat.contains_key("A/B/D"));
    }

    #[test]
    fn flatten_excludes_non_default_subspecs() {
        let root = spec(
            r#"{
                "name": "Root",
                "default_subspecs": "Core",
                "subspecs": [
                    {"name": "Core", "dependencies": {"CoreDep": []}},
                    {"name": "Extra", "dependencies": {"ExtraDep": []}}
                ]
            }"#,
        );
        let flat = root.flatten_dependencies("Root").unwrap();
        assert!(flat.contains_key("Root/Core"));
        assert!(flat.contains_key("CoreDep"));
        assert!(!flat.contains_key("Root/Extra"));
        assert!(!flat.contains_key("ExtraDep"));

        // But an explicitly requested non-default subspec resolves.
        let extra = root.flatten_dependencies("Root/Extra").unwrap();
        assert!(extra.contains_key("ExtraDep"));
    }

    #[test]
    fn flatten_expands_sibling_subspec_dependencies() {
        // Core depends on the sibling subspec Root/Net by full path; the
        // worklist pass expands Net's own set too.
        let root = spec(
            r#"{
                "name": "Root",
                "default_subspecs": "Core",
                "subspecs": [
                    {"name": "Core", "dependencies": {"Root/Net": []}},
                    {"name": "Net", "dependencies": {"Sockets": []}}
                ]
            }"#,
        );
        let flat = root.flatten_dependencies("Root").unwrap();
        assert!(flat.contains_key("Root/Net"));
        assert!(flat.contains_key("Sockets"));
    }

    #[test]
    fn flatten_wrong_root_is_not_found() {
        let root = spec(r#"{"name": "A"}"#);
        assert!(root.flatten_dependencies("B").is_err());
        assert!(root.flatten_dependencies("A/Missing").is_err());
    }

    #[test]
    fn exclude_subspec_dependencies_takes_first_constraint() {
        let root = spec(
            r#"{
                "name": "A",
                "dependencies": {"X": [">= 1.0", "< 2.0"], "Y": []},
                "subspecs": [{"name": "Sub", "dependencies": {"Hidden": []}}]
            }"#,
        );
        let own = root.exclude_subspec_dependencies();
        assert_eq!(own.get("X"), Some(&">= 1.0".to_string()));
        assert_eq!(own.get("Y"), Some(&String::new()));
        assert!(!own.contains_key("Hidden"));
    }

    #[test]
    fn all_dependency_refs_dedups_across_subspecs() {
        let root = spec(
            r#"{
                "name": "A",
                "dependencies": {"X": ["1.0"]},
                "subspecs": [
                    {"name": "B", "dependencies": {"X": ["2.0"], "Y": []}}
                ]
            }"#,
        );
        let refs = root.all_dependency_refs();
        assert_eq!(refs.len(), 2);
        let x = refs.iter().find(|r| r.name == "X").unwrap();
        assert_eq!(x.constraint, "1.0");
    }

    #[test]
    fn default_selector_many() {
        let root = spec(
            r#"{
                "name": "R",
                "default_subspecs": ["A", "B"],
                "subspecs": [
                    {"name": "A"}, {"name": "B"}, {"name": "C"}
                ]
            }"#,
        );
        assert!(root.is_default_subspec("A"));
        assert!(root.is_default_subspec("B"));
        assert!(!root.is_default_subspec("C"));
    }
}
