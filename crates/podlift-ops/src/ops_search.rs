//! Operation: look a module up in the catalog.

use console::style;

use podlift_catalog::store::JsonStore;
use podlift_core::config::GlobalConfig;
use podlift_resolver::store::CatalogStore;
use podlift_resolver::version;
use podlift_util::errors::PodliftError;

/// Options for `podlift search`.
#[derive(Debug, Default)]
pub struct SearchOptions {
    pub module: String,
    /// Restrict the selected version to this constraint.
    pub constraint: Option<String>,
}

/// Print a module's known versions, the selected one, and its dependencies.
pub fn search(config: &GlobalConfig, opts: &SearchOptions) -> miette::Result<()> {
    let store = JsonStore::open(&config.catalog_dir())?;
    let mut versions: Vec<String> = store.versions_of(&opts.module).to_vec();
    if versions.is_empty() {
        return Err(PodliftError::NotFound {
            message: format!("module {} is not in the catalog", opts.module),
        }
        .into());
    }
    versions.sort_by(|a, b| version::compare(b, a));

    let constraint = opts.constraint.as_deref().unwrap_or("");
    let selected = store.query_newest_version(&opts.module, constraint)?;

    println!("{}", style(&opts.module).bold());
    for v in &versions {
        if Some(v) == selected.as_ref() {
            println!("  {} {}", style(v).green(), style("(selected)").dim());
        } else {
            println!("  {v}");
        }
    }

    let Some(selected) = selected else {
        podlift_util::progress::status_warn(
            "Constraint",
            &format!("no version satisfies `{constraint}`"),
        );
        return Ok(());
    };
    if let Some((depends, repo)) = store.query_depends(&opts.module, &selected)? {
        println!("\n{} {selected} ({repo})", style("Dependencies of").bold());
        if depends.is_empty() {
            println!("  (none)");
        }
        for dep in depends {
            println!("  {dep}");
        }
    }
    Ok(())
}
