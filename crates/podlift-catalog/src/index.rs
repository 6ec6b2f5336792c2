//! Spec-repo indexer.
//!
//! A spec repo checkout lays modules out as `<root>/<Module>/<Version>/`,
//! with the podspec inside the version directory (the CocoaPods master repo
//! keeps that layout under a `Specs/` subdirectory). Candidate directories
//! are enumerated up front, filtered by the repo's exclude list, version
//! constraints, and already-present catalog keys, then read on a bounded
//! worker pool and written to the store in one batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use podlift_core::config::RepoConfig;
use podlift_core::spec;
use podlift_resolver::version;
use podlift_util::errors::PodliftError;

use crate::store::{CatalogRecord, JsonStore, PutStats};

/// Counters for one indexing run.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexStats {
    /// Spec files handed to the worker pool.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Version directories filtered out before reading.
    pub skipped: usize,
    pub stored: PutStats,
}

struct IndexJob {
    key: String,
    module: String,
    version: String,
    spec_path: PathBuf,
}

/// Index one repo checkout into the store.
pub async fn index_repo(
    store: &mut JsonStore,
    repo: &RepoConfig,
    repo_dir: &Path,
    workers: usize,
) -> miette::Result<IndexStats> {
    let specs_root = specs_root(repo_dir);
    if !specs_root.is_dir() {
        return Err(PodliftError::NotFound {
            message: format!("spec repo directory {} does not exist", specs_root.display()),
        }
        .into());
    }

    let mut stats = IndexStats::default();
    let jobs = collect_jobs(store, repo, &specs_root, &mut stats)?;
    stats.attempted = jobs.len();
    tracing::info!(
        repo = %repo.name,
        attempted = stats.attempted,
        skipped = stats.skipped,
        "indexing spec repo"
    );

    let bar = podlift_util::progress::progress_bar(
        jobs.len() as u64,
        &format!("Indexing {}", repo.name),
    );
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set = JoinSet::new();
    let repo_name = repo.name.clone();

    for job in jobs {
        let sem = semaphore.clone();
        let repo_name = repo_name.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let path = job.spec_path.clone();
            let read = tokio::task::spawn_blocking(move || spec::read_spec(&path)).await;
            match read {
                Ok(Ok(parsed)) => Ok(CatalogRecord {
                    key: job.key,
                    repo: repo_name,
                    module: job.module,
                    version: job.version,
                    spec_path: job.spec_path.display().to_string(),
                    spec: parsed,
                }),
                Ok(Err(e)) => Err((job.module, job.version, format!("{e}"))),
                Err(e) => Err((job.module, job.version, format!("worker panicked: {e}"))),
            }
        });
    }

    let mut records = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        bar.inc(1);
        match joined {
            Ok(Ok(record)) => {
                stats.succeeded += 1;
                records.push(record);
            }
            Ok(Err((module, version, error))) => {
                stats.failed += 1;
                tracing::warn!(%module, %version, %error, "spec read failed");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(error = %e, "index worker lost");
            }
        }
    }
    bar.finish_and_clear();

    stats.stored = store.put_batch(records)?;
    Ok(stats)
}

fn specs_root(repo_dir: &Path) -> PathBuf {
    let master_layout = repo_dir.join("Specs");
    if master_layout.is_dir() {
        master_layout
    } else {
        repo_dir.to_path_buf()
    }
}

fn collect_jobs(
    store: &JsonStore,
    repo: &RepoConfig,
    specs_root: &Path,
    stats: &mut IndexStats,
) -> miette::Result<Vec<IndexJob>> {
    let existing = store.existing_keys();
    let mut jobs = Vec::new();

    for module_dir in podlift_util::fs::subdirs(specs_root).map_err(PodliftError::Io)? {
        let module = dir_name(&module_dir);
        if module.is_empty() || repo.exclude.iter().any(|e| e == &module) {
            continue;
        }
        let constraint = repo.constraints.get(&module);

        for version_dir in podlift_util::fs::subdirs(&module_dir).map_err(PodliftError::Io)? {
            let ver = dir_name(&version_dir);
            if ver.is_empty() {
                continue;
            }
            if let Some(constraint) = constraint {
                if !version::satisfies(constraint, &ver) {
                    stats.skipped += 1;
                    continue;
                }
            }
            let key =
                podlift_util::hash::md5_hex(&podlift_util::fs::abs_path(&version_dir).display().to_string());
            if existing.contains(&key) {
                stats.skipped += 1;
                continue;
            }
            let Some(spec_path) = find_spec_file(&version_dir, &module) else {
                stats.skipped += 1;
                tracing::debug!(%module, version = %ver, "no spec file in version dir");
                continue;
            };
            jobs.push(IndexJob {
                key,
                module: module.clone(),
                version: ver,
                spec_path,
            });
        }
    }
    Ok(jobs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// The spec file inside a version directory: `<Module>.podspec.json`
/// preferred, plain `<Module>.podspec` accepted.
fn find_spec_file(version_dir: &Path, module: &str) -> Option<PathBuf> {
    let json = version_dir.join(format!("{module}.podspec.json"));
    if json.is_file() {
        return Some(json);
    }
    let plain = version_dir.join(format!("{module}.podspec"));
    if plain.is_file() {
        return Some(plain);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use podlift_resolver::store::CatalogStore;
    use std::collections::BTreeMap;

    fn write_spec(root: &Path, module: &str, version: &str, deps: &[(&str, &str)]) {
        let dir = root.join(module).join(version);
        std::fs::create_dir_all(&dir).unwrap();
        let deps: BTreeMap<String, Vec<String>> = deps
            .iter()
            .map(|(n, c)| (n.to_string(), vec![c.to_string()]))
            .collect();
        let json = serde_json::json!({
            "name": module,
            "version": version,
            "dependencies": deps,
        });
        std::fs::write(
            dir.join(format!("{module}.podspec.json")),
            serde_json::to_string(&json).unwrap(),
        )
        .unwrap();
    }

    fn repo(name: &str) -> RepoConfig {
        RepoConfig {
            name: name.to_string(),
            exclude: Vec::new(),
            constraints: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn indexes_modules_and_versions() {
        let repo_dir = tempfile::tempdir().unwrap();
        write_spec(repo_dir.path(), "A", "1.0.0", &[("B", ">= 1.0")]);
        write_spec(repo_dir.path(), "A", "2.0.0", &[]);
        write_spec(repo_dir.path(), "B", "1.0.0", &[]);

        let store_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(store_dir.path()).unwrap();
        let stats = index_repo(&mut store, &repo("master"), repo_dir.path(), 4)
            .await
            .unwrap();

        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 0);
        assert_eq!(store.len(), 3);
        assert_eq!(
            store.query_newest_version("A", "").unwrap(),
            Some("2.0.0".to_string())
        );
    }

    #[tokio::test]
    async fn reindex_skips_existing_keys() {
        let repo_dir = tempfile::tempdir().unwrap();
        write_spec(repo_dir.path(), "A", "1.0.0", &[]);

        let store_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(store_dir.path()).unwrap();
        index_repo(&mut store, &repo("master"), repo_dir.path(), 2)
            .await
            .unwrap();
        let second = index_repo(&mut store, &repo("master"), repo_dir.path(), 2)
            .await
            .unwrap();

        assert_eq!(second.attempted, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn exclusions_and_constraints_filter() {
        let repo_dir = tempfile::tempdir().unwrap();
        write_spec(repo_dir.path(), "Wanted", "1.0.0", &[]);
        write_spec(repo_dir.path(), "Wanted", "0.1.0", &[]);
        write_spec(repo_dir.path(), "Unwanted", "1.0.0", &[]);

        let mut cfg = repo("master");
        cfg.exclude.push("Unwanted".to_string());
        cfg.constraints
            .insert("Wanted".to_string(), ">= 1.0".to_string());

        let store_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(store_dir.path()).unwrap();
        let stats = index_repo(&mut store, &cfg, repo_dir.path(), 2)
            .await
            .unwrap();

        assert_eq!(stats.attempted, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(store.len(), 1);
        assert!(store.query_depends("Wanted", "1.0.0").unwrap().is_some());
        assert!(store.query_depends("Unwanted", "1.0.0").unwrap().is_none());
    }

    #[tokio::test]
    async fn master_layout_uses_specs_subdir() {
        let repo_dir = tempfile::tempdir().unwrap();
        let specs = repo_dir.path().join("Specs");
        std::fs::create_dir_all(&specs).unwrap();
        write_spec(&specs, "A", "1.0.0", &[]);

        let store_dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::open(store_dir.path()).unwrap();
        let stats = index_repo(&mut store, &repo("master"), repo_dir.path(), 2)
            .await
            .unwrap();
        assert_eq!(stats.succeeded, 1);
    }
}
