use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration loaded from `~/.podlift/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub repos: Vec<RepoConfig>,

    #[serde(default)]
    pub resolver: ResolverSettings,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Catalog store location from `[catalog]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_dir")]
    pub dir: String,
    /// Root directory that holds spec repo checkouts.
    #[serde(default, rename = "repo-root")]
    pub repo_root: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: default_catalog_dir(),
            repo_root: None,
        }
    }
}

fn default_catalog_dir() -> String {
    "~/.podlift/catalog".to_string()
}

/// One spec repository to index, from `[[repos]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
    pub name: String,
    /// Module names to skip while indexing.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Per-module version constraints limiting which versions are indexed.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

/// Resolution settings from `[resolver]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Concurrent spec-reading workers; clamped to 1..=20 at use sites.
    #[serde(default = "default_spec_workers", rename = "spec-workers")]
    pub spec_workers: usize,
    /// Closure-loop iteration ceiling before reporting `Unresolvable`.
    #[serde(default = "default_max_iterations", rename = "max-iterations")]
    pub max_iterations: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            spec_workers: default_spec_workers(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_spec_workers() -> usize {
    8
}

fn default_max_iterations() -> usize {
    64
}

/// Report output settings from `[output]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "~/.podlift/output".to_string()
}

impl GlobalConfig {
    /// Load the global configuration, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                podlift_util::errors::PodliftError::Generic {
                    message: format!("Failed to read config: {e}"),
                }
            })?;
            toml::from_str(&content).map_err(|e| {
                podlift_util::errors::PodliftError::Generic {
                    message: format!("Failed to parse config: {e}"),
                }
                .into()
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Clamped worker count for parallel spec reading.
    pub fn spec_workers(&self) -> usize {
        self.resolver.spec_workers.clamp(1, 20)
    }

    /// Catalog dir with `~` expanded.
    pub fn catalog_dir(&self) -> PathBuf {
        expand_home(&self.catalog.dir)
    }

    /// Output dir with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        expand_home(&self.output.dir)
    }

    /// Root of the spec repo checkouts: the configured one, or the default
    /// CocoaPods location.
    pub fn repo_root(&self) -> PathBuf {
        match &self.catalog.repo_root {
            Some(dir) => expand_home(dir),
            None => expand_home("~/.cocoapods/repos"),
        }
    }
}

/// Returns the path to the podlift data directory (`~/.podlift/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".podlift")
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_missing() {
        let config = GlobalConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.resolver.spec_workers, 8);
        assert_eq!(config.resolver.max_iterations, 64);
        assert!(config.repos.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let config: GlobalConfig = toml::from_str(
            r#"
            [catalog]
            dir = "/var/podlift/catalog"
            repo-root = "/var/podlift/repos"

            [[repos]]
            name = "master"
            exclude = ["DeprecatedKit"]

            [repos.constraints]
            AFNetworking = ">= 2.0"

            [resolver]
            spec-workers = 50
            max-iterations = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.repos.len(), 1);
        assert_eq!(config.repos[0].exclude, vec!["DeprecatedKit"]);
        assert_eq!(
            config.repos[0].constraints.get("AFNetworking"),
            Some(&">= 2.0".to_string())
        );
        // Out-of-range worker counts clamp at use time.
        assert_eq!(config.spec_workers(), 20);
        assert_eq!(config.resolver.max_iterations, 16);
    }
}
