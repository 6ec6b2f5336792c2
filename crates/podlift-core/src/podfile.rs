//! Podfile parsing: seed dependencies per target.
//!
//! A Podfile is converted to structured JSON by `pod ipc podfile-json` (or
//! supplied pre-converted as a `.json` file) and parsed into targets holding
//! [`SeedDep`] lists. `:path`-style references become manifest-backed local
//! seeds whose spec is read separately.

use std::path::{Path, PathBuf};

use serde_json::Value;

use podlift_util::errors::PodliftError;
use podlift_util::process::CommandBuilder;

use crate::dependency::{DependencyRef, SeedDep};

/// A parsed Podfile: one or more named targets with their dependencies.
#[derive(Debug, Clone, Default)]
pub struct Podfile {
    pub file_path: PathBuf,
    pub targets: Vec<Target>,
}

/// One target definition inside a Podfile. The anonymous top-level
/// dependency list is kept under the target name `"*"`.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub depends: Vec<SeedDep>,
}

impl Podfile {
    /// Load a Podfile from disk.
    ///
    /// `.json` files are read directly; anything else is converted by
    /// shelling out to `pod ipc podfile-json`.
    pub fn load(path: &Path) -> miette::Result<Self> {
        let json = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            std::fs::read_to_string(path).map_err(|e| PodliftError::NotFound {
                message: format!("cannot read {}: {e}", path.display()),
            })?
        } else {
            CommandBuilder::new("pod")
                .arg("ipc")
                .arg("podfile-json")
                .arg(path.display().to_string())
                .exec_stdout()?
        };
        let mut podfile = Self::from_json(&json, path.parent())?;
        podfile.file_path = path.to_path_buf();
        Ok(podfile)
    }

    /// Parse the `pod ipc podfile-json` output. `base_dir` anchors relative
    /// `:path` references.
    pub fn from_json(json: &str, base_dir: Option<&Path>) -> miette::Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| PodliftError::Manifest {
            message: format!("Failed to parse Podfile JSON: {e}"),
        })?;
        let mut targets = Vec::new();

        let definitions = value
            .get("target_definitions")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for definition in &definitions {
            for child in definition
                .get("children")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let name = child
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("*")
                    .to_string();
                let depends = parse_dependencies(child.get("dependencies"), base_dir);
                targets.push(Target { name, depends });
            }
            // Dependencies declared outside any `target` block.
            let top = parse_dependencies(definition.get("dependencies"), base_dir);
            if !top.is_empty() {
                targets.push(Target {
                    name: "*".to_string(),
                    depends: top,
                });
            }
        }

        Ok(Podfile {
            file_path: PathBuf::new(),
            targets,
        })
    }

    /// Build a synthetic single-target Podfile from `Name:Version` rule
    /// entries. Used for upgrade rule lists given on the command line.
    pub fn from_rules(rules: &[String]) -> Self {
        let depends = rules
            .iter()
            .map(|rule| {
                let (name, version) = match rule.split_once(':') {
                    Some((n, v)) => (n, v),
                    None => (rule.as_str(), ""),
                };
                SeedDep::Bare(DependencyRef::new(name, version))
            })
            .collect();
        Podfile {
            file_path: PathBuf::new(),
            targets: vec![Target {
                name: "*".to_string(),
                depends,
            }],
        }
    }

    /// The named target, or `None`.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Seed dependencies for analysis: the named target's, or every
    /// target's (first occurrence of each module wins) when `target` is
    /// empty.
    pub fn seeds(&self, target: &str) -> Vec<SeedDep> {
        let mut seeds: Vec<SeedDep> = Vec::new();
        for t in &self.targets {
            if !target.is_empty() && t.name != target {
                continue;
            }
            for dep in &t.depends {
                if seeds.iter().any(|s| s.name() == dep.name()) {
                    continue;
                }
                seeds.push(dep.clone());
            }
        }
        seeds
    }

    /// Constraint strings declared for modules sharing `name`'s base module,
    /// across every target. Fuzzy matching by base lets a rule for `"Foo"`
    /// pin `"Foo/Bar"` too. The bool reports whether any match existed at
    /// all, even with no usable version.
    pub fn fuzzy_versions(&self, name: &str) -> (Vec<String>, bool) {
        let base = crate::dependency::base_module(name);
        let mut found = Vec::new();
        let mut exists = false;
        for target in &self.targets {
            for dep in &target.depends {
                if crate::dependency::base_module(dep.name()) != base {
                    continue;
                }
                exists = true;
                if !dep.constraint().is_empty() {
                    found.push(dep.constraint().to_string());
                }
            }
        }
        (found, exists)
    }

    /// Visit every `(target, module, constraint)` triple.
    pub fn enumerate_depends(&self, mut f: impl FnMut(&str, &str, &str)) {
        for target in &self.targets {
            for dep in &target.depends {
                f(&target.name, dep.name(), dep.constraint());
            }
        }
    }
}

fn parse_dependencies(value: Option<&Value>, base_dir: Option<&Path>) -> Vec<SeedDep> {
    let mut depends = Vec::new();
    for item in value.and_then(Value::as_array).into_iter().flatten() {
        match item {
            Value::String(name) => {
                depends.push(SeedDep::Bare(DependencyRef::new(name.clone(), "")));
            }
            Value::Object(map) => {
                for (name, detail) in map {
                    depends.push(parse_detailed(name, detail, base_dir));
                }
            }
            _ => {}
        }
    }
    depends
}

/// A detailed entry is `{"Name": ["1.0"]}` for a version requirement or
/// `{"Name": [{"path": "Modules/Name"}]}` for a local reference.
fn parse_detailed(name: &str, detail: &Value, base_dir: Option<&Path>) -> SeedDep {
    let first = detail.as_array().and_then(|items| items.first());
    match first {
        Some(Value::String(constraint)) => {
            SeedDep::Bare(DependencyRef::new(name, constraint.clone()))
        }
        Some(Value::Object(options)) => {
            let raw = options
                .get("path")
                .or_else(|| options.get("podspec"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let spec_path = match base_dir {
                Some(dir) if !raw.is_empty() => dir.join(raw),
                _ => PathBuf::from(raw),
            };
            SeedDep::Local {
                dep: DependencyRef::new(name, ""),
                spec_path,
                subdepends: Vec::new(),
            }
        }
        _ => SeedDep::Bare(DependencyRef::new(name, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PODFILE_JSON: &str = r#"{
        "target_definitions": [
            {
                "name": "Pods",
                "dependencies": ["SharedKit"],
                "children": [
                    {
                        "name": "App",
                        "dependencies": [
                            "AFNetworking",
                            {"SDWebImage": ["~> 4.0"]},
                            {"MyKit": [{"path": "Modules/MyKit/MyKit.podspec"}]}
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_targets_and_dependency_forms() {
        let podfile = Podfile::from_json(PODFILE_JSON, Some(Path::new("/proj"))).unwrap();
        assert_eq!(podfile.targets.len(), 2);

        let app = podfile.target("App").unwrap();
        assert_eq!(app.depends.len(), 3);
        assert_eq!(app.depends[0].name(), "AFNetworking");
        assert_eq!(app.depends[0].constraint(), "");
        assert_eq!(app.depends[1].constraint(), "~> 4.0");
        assert!(app.depends[2].is_local());
        match &app.depends[2] {
            SeedDep::Local { spec_path, .. } => {
                assert_eq!(spec_path, Path::new("/proj/Modules/MyKit/MyKit.podspec"));
            }
            other => panic!("expected local seed, got {other:?}"),
        }

        let top = podfile.target("*").unwrap();
        assert_eq!(top.depends[0].name(), "SharedKit");
    }

    #[test]
    fn seeds_dedup_across_targets() {
        let podfile = Podfile::from_json(PODFILE_JSON, None).unwrap();
        let seeds = podfile.seeds("");
        let names: Vec<&str> = seeds.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["AFNetworking", "SDWebImage", "MyKit", "SharedKit"]);

        let only_app = podfile.seeds("App");
        assert_eq!(only_app.len(), 3);
    }

    #[test]
    fn rules_podfile() {
        let rules = vec!["AFNetworking:3.1.0".to_string(), "SDWebImage".to_string()];
        let podfile = Podfile::from_rules(&rules);
        let target = podfile.target("*").unwrap();
        assert_eq!(target.depends[0].name(), "AFNetworking");
        assert_eq!(target.depends[0].constraint(), "3.1.0");
        assert_eq!(target.depends[1].constraint(), "");
    }

    #[test]
    fn fuzzy_versions_matches_base_module() {
        let rules = vec!["Foo/Bar:2.0.0".to_string()];
        let podfile = Podfile::from_rules(&rules);
        let (versions, exists) = podfile.fuzzy_versions("Foo");
        assert!(exists);
        assert_eq!(versions, vec!["2.0.0"]);

        let (_, missing) = podfile.fuzzy_versions("Other");
        assert!(!missing);
    }
}
