//! Handler for `podlift analyze`.

use std::path::PathBuf;

use miette::Result;

use podlift_core::config::GlobalConfig;
use podlift_ops::ops_analyze::{self, AnalyzeOptions};
use podlift_util::errors::PodliftError;

pub async fn exec(
    config: &GlobalConfig,
    podfiles: &[String],
    rules: Vec<String>,
    rules_file: Option<PathBuf>,
    merge: bool,
    flatten: bool,
) -> Result<()> {
    let mut parsed = Vec::with_capacity(podfiles.len());
    for entry in podfiles {
        let (path, target) = split_target(entry);
        if !path.is_file() {
            return Err(PodliftError::NotFound {
                message: format!("Podfile {} does not exist", path.display()),
            }
            .into());
        }
        parsed.push((path, target));
    }

    let opts = AnalyzeOptions {
        podfiles: parsed,
        rules,
        rules_file,
        merge,
        flatten,
    };
    ops_analyze::analyze(config, &opts).await
}

/// Split a `PATH:TARGET` argument. Without a colon the whole string is the
/// path and every target is analyzed.
fn split_target(entry: &str) -> (PathBuf, String) {
    match entry.rsplit_once(':') {
        Some((path, target)) if !target.contains('/') => {
            (PathBuf::from(path), target.to_string())
        }
        _ => (PathBuf::from(entry), String::new()),
    }
}
