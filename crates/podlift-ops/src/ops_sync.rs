//! Operation: index the configured spec repos into the catalog.

use podlift_catalog::index;
use podlift_catalog::store::JsonStore;
use podlift_core::config::GlobalConfig;
use podlift_util::errors::PodliftError;

/// Index every configured repo checkout into the catalog store.
pub async fn sync(config: &GlobalConfig) -> miette::Result<()> {
    if config.repos.is_empty() {
        return Err(PodliftError::InvalidInput {
            message: "no repos configured; add a [[repos]] entry to the config".to_string(),
        }
        .into());
    }

    let mut store = JsonStore::open(&config.catalog_dir())?;
    let repo_root = config.repo_root();
    let workers = config.spec_workers();

    for repo in &config.repos {
        let repo_dir = repo_root.join(&repo.name);
        let stats = index::index_repo(&mut store, repo, &repo_dir, workers).await?;
        podlift_util::progress::status(
            "Synced",
            &format!(
                "{}: {} read, {} failed, {} skipped, {} new records",
                repo.name, stats.succeeded, stats.failed, stats.skipped, stats.stored.added
            ),
        );
        if stats.stored.duplicates > 0 {
            podlift_util::progress::status_warn(
                "Duplicates",
                &format!("{}: {} records already present", repo.name, stats.stored.duplicates),
            );
        }
    }
    podlift_util::progress::status(
        "Catalog",
        &format!("{} records total", store.len()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podlift_core::config::{CatalogConfig, RepoConfig};

    #[tokio::test]
    async fn sync_requires_repos() {
        let config = GlobalConfig::default();
        let err = sync(&config).await.unwrap_err();
        assert!(err.to_string().contains("no repos configured"));
    }

    #[tokio::test]
    async fn sync_indexes_configured_repo() {
        let root = tempfile::tempdir().unwrap();
        let catalog = tempfile::tempdir().unwrap();
        let version_dir = root.path().join("master/A/1.0.0");
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(
            version_dir.join("A.podspec.json"),
            r#"{"name": "A", "version": "1.0.0"}"#,
        )
        .unwrap();

        let config = GlobalConfig {
            catalog: CatalogConfig {
                dir: catalog.path().display().to_string(),
                repo_root: Some(root.path().display().to_string()),
            },
            repos: vec![RepoConfig {
                name: "master".to_string(),
                exclude: Vec::new(),
                constraints: Default::default(),
            }],
            ..GlobalConfig::default()
        };
        sync(&config).await.unwrap();

        let store = JsonStore::open(catalog.path()).unwrap();
        assert_eq!(store.len(), 1);
    }
}
