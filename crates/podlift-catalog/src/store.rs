//! JSON-backed catalog store.
//!
//! The catalog is a single `catalog.json` under the store directory, mapping
//! record keys to indexed podspecs. A record's key is the MD5 of the source
//! directory it was indexed from, so re-indexing an unchanged repo layout
//! produces the same keys and is skipped cheaply. Writes go through a temp
//! file and an atomic rename.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use podlift_core::dependency::{ancestor_chain, base_module, DependencyRef};
use podlift_core::spec::Spec;
use podlift_resolver::store::CatalogStore;
use podlift_resolver::version;
use podlift_util::errors::PodliftError;

/// One indexed module version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// MD5 of the source directory path.
    pub key: String,
    /// Name of the repo the record came from.
    pub repo: String,
    pub module: String,
    pub version: String,
    /// Path of the spec file that was read.
    pub spec_path: String,
    pub spec: Spec,
}

/// Outcome of one batch write.
#[derive(Debug, Default, Clone, Copy)]
pub struct PutStats {
    pub added: usize,
    pub duplicates: usize,
}

/// The on-disk catalog, held fully in memory while open.
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    records: BTreeMap<String, CatalogRecord>,
    by_module: BTreeMap<(String, String), String>,
    versions: BTreeMap<String, Vec<String>>,
}

impl JsonStore {
    /// Open the catalog under `dir`, creating the directory and starting
    /// empty when no catalog file exists yet.
    pub fn open(dir: &Path) -> miette::Result<Self> {
        podlift_util::fs::ensure_dir(dir).map_err(|e| PodliftError::Store {
            message: format!("cannot create catalog dir {}: {e}", dir.display()),
        })?;
        let path = dir.join("catalog.json");
        let records: BTreeMap<String, CatalogRecord> = if path.is_file() {
            let content = std::fs::read_to_string(&path).map_err(|e| PodliftError::Store {
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            serde_json::from_str(&content).map_err(|e| PodliftError::Store {
                message: format!("corrupt catalog {}: {e}", path.display()),
            })?
        } else {
            BTreeMap::new()
        };

        let mut store = Self {
            dir: dir.to_path_buf(),
            records,
            by_module: BTreeMap::new(),
            versions: BTreeMap::new(),
        };
        store.rebuild_indexes();
        Ok(store)
    }

    fn rebuild_indexes(&mut self) {
        self.by_module.clear();
        self.versions.clear();
        for (key, record) in &self.records {
            self.by_module
                .insert((record.module.clone(), record.version.clone()), key.clone());
            self.versions
                .entry(record.module.clone())
                .or_default()
                .push(record.version.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Keys already present, for skip checks while indexing.
    pub fn existing_keys(&self) -> BTreeSet<String> {
        self.records.keys().cloned().collect()
    }

    /// All versions indexed for a module, unordered.
    pub fn versions_of(&self, module: &str) -> &[String] {
        self.versions
            .get(base_module(module))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Write a batch of records, skipping keys the catalog already holds,
    /// then persist and log the batch. The whole batch lands in one write,
    /// so a crash mid-sync leaves the previous catalog intact.
    pub fn put_batch(&mut self, batch: Vec<CatalogRecord>) -> miette::Result<PutStats> {
        let mut stats = PutStats::default();
        for record in batch {
            if self.records.contains_key(&record.key) {
                tracing::warn!(
                    module = %record.module,
                    version = %record.version,
                    key = %record.key,
                    "duplicate catalog key, keeping existing record"
                );
                stats.duplicates += 1;
                continue;
            }
            self.records.insert(record.key.clone(), record);
            stats.added += 1;
        }
        self.rebuild_indexes();
        self.save()?;
        self.append_sync_log(stats)?;
        Ok(stats)
    }

    fn save(&self) -> miette::Result<()> {
        let path = self.dir.join("catalog.json");
        let tmp = self.dir.join("catalog.json.tmp");
        let content =
            serde_json::to_string_pretty(&self.records).map_err(|e| PodliftError::Store {
                message: format!("cannot serialize catalog: {e}"),
            })?;
        std::fs::write(&tmp, content).map_err(|e| PodliftError::Store {
            message: format!("cannot write {}: {e}", tmp.display()),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| PodliftError::Store {
            message: format!("cannot replace {}: {e}", path.display()),
        })?;
        Ok(())
    }

    fn append_sync_log(&self, stats: PutStats) -> miette::Result<()> {
        let path = self.dir.join("sync.log");
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| PodliftError::Store {
                message: format!("cannot open {}: {e}", path.display()),
            })?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(
            file,
            "{stamp} added={} duplicates={} total={}",
            stats.added,
            stats.duplicates,
            self.records.len()
        )
        .map_err(|e| PodliftError::Store {
            message: format!("cannot append to {}: {e}", path.display()),
        })?;
        Ok(())
    }

    /// Lines of the append-only sync log, oldest first. Empty when the
    /// catalog has never been synced.
    pub fn sync_log(&self) -> miette::Result<Vec<String>> {
        let path = self.dir.join("sync.log");
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| PodliftError::Store {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn record_for(&self, module: &str, version: &str) -> Option<&CatalogRecord> {
        let key = self
            .by_module
            .get(&(base_module(module).to_string(), version.to_string()))?;
        self.records.get(key)
    }
}

impl CatalogStore for JsonStore {
    fn query_depends(
        &self,
        module: &str,
        version: &str,
    ) -> miette::Result<Option<(Vec<DependencyRef>, String)>> {
        let Some(record) = self.record_for(module, version) else {
            return Ok(None);
        };
        // A path naming a subspec the tree does not actually have falls
        // back to the nearest ancestor that exists.
        for candidate in ancestor_chain(module) {
            if let Ok(flat) = record.spec.flatten_dependencies(candidate) {
                let deps = flat
                    .into_iter()
                    .map(|(name, constraint)| DependencyRef::new(name, constraint))
                    .collect();
                return Ok(Some((deps, record.repo.clone())));
            }
        }
        Ok(None)
    }

    fn query_newest_version(
        &self,
        module: &str,
        constraint: &str,
    ) -> miette::Result<Option<String>> {
        Ok(version::max_satisfying(constraint, self.versions_of(module)))
    }
}
