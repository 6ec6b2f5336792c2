//! Operation: analyze Podfiles against the catalog and write upgrade plans.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use podlift_catalog::store::JsonStore;
use podlift_core::config::GlobalConfig;
use podlift_core::dependency::{DependencyRef, SeedDep};
use podlift_core::podfile::Podfile;
use podlift_core::spec;
use podlift_resolver::component;
use podlift_resolver::graph::{self, GraphPodfile};
use podlift_resolver::resolver::{Resolver, ResolverConfig};
use podlift_resolver::tree::{self, SpanningTree};

use crate::report;

/// Options for `podlift analyze`.
#[derive(Debug, Default)]
pub struct AnalyzeOptions {
    /// Podfiles to analyze, each with a target name (empty for all targets).
    pub podfiles: Vec<(PathBuf, String)>,
    /// `Name:Version` upgrade rules.
    pub rules: Vec<String>,
    /// A Podfile whose pins act as upgrade rules.
    pub rules_file: Option<PathBuf>,
    /// Resolve every Podfile's seeds into one merged graph.
    pub merge: bool,
    /// Also write Podfile-style flatten snippets.
    pub flatten: bool,
}

/// Resolve each Podfile to a closed graph and write the report set.
pub async fn analyze(config: &GlobalConfig, opts: &AnalyzeOptions) -> miette::Result<()> {
    let store = JsonStore::open(&config.catalog_dir())?;
    podlift_util::progress::status(
        "Catalog",
        &format!("{} records from {}", store.len(), config.catalog_dir().display()),
    );

    let rules = load_rules(opts)?;
    let mut podfiles = Vec::with_capacity(opts.podfiles.len());
    for (path, target) in &opts.podfiles {
        podfiles.push((Podfile::load(path)?, target.clone()));
    }
    fill_local_depends(&mut podfiles, config.spec_workers()).await;

    let resolver = Resolver::new(
        &store,
        ResolverConfig {
            max_iterations: config.resolver.max_iterations,
            merge_rules: opts.merge,
        },
    );

    let mut graphs = Vec::new();
    if opts.merge {
        let mut seeds: Vec<SeedDep> = Vec::new();
        for (podfile, target) in &podfiles {
            for seed in podfile.seeds(target) {
                if !seeds.iter().any(|s| s.name() == seed.name()) {
                    seeds.push(seed);
                }
            }
        }
        graphs.push(resolver.resolve_seeds("merged", "*", &seeds, rules.as_ref())?);
    } else {
        for (podfile, target) in &podfiles {
            graphs.push(resolver.resolve(podfile, target, rules.as_ref())?);
        }
    }
    graph::mark_common(&mut graphs);

    let out_dir = report::create_output_dir(&config.output_dir())?;
    for graph in &graphs {
        write_reports(&out_dir, graph, opts.flatten)?;
        podlift_util::progress::status(
            "Analyzed",
            &format!("{} ({} modules)", report::graph_stem(graph), graph.modules.len()),
        );
    }
    podlift_util::progress::status("Output", &out_dir.display().to_string());
    Ok(())
}

fn load_rules(opts: &AnalyzeOptions) -> miette::Result<Option<Podfile>> {
    if let Some(path) = &opts.rules_file {
        return Ok(Some(Podfile::load(path)?));
    }
    if !opts.rules.is_empty() {
        return Ok(Some(Podfile::from_rules(&opts.rules)));
    }
    Ok(None)
}

fn write_reports(
    out_dir: &std::path::Path,
    graph: &GraphPodfile,
    flatten: bool,
) -> miette::Result<()> {
    report::write_plan_csv(out_dir, graph)?;
    if flatten {
        report::write_flatten(out_dir, graph)?;
    }
    report::write_graph_json(out_dir, graph)?;

    let adjacency = graph.adjacency();
    let components = component::decompose(&adjacency);
    report::write_components_json(out_dir, graph, &components)?;

    let mut trees: Vec<SpanningTree> = Vec::with_capacity(components.len());
    for component in &components {
        trees.push(SpanningTree::build(component, &adjacency)?);
    }
    tree::resolve_references(&mut trees);
    report::write_trees_json(out_dir, graph, &trees)?;
    Ok(())
}

/// Read every local seed's podspec on a bounded pool and fill in its
/// dependency list. Seeds whose spec cannot be read keep an empty list and
/// log a warning, so one broken local pod does not sink the whole run.
async fn fill_local_depends(podfiles: &mut [(Podfile, String)], workers: usize) {
    let mut jobs: Vec<(usize, usize, usize, PathBuf)> = Vec::new();
    for (pi, (podfile, _)) in podfiles.iter().enumerate() {
        for (ti, target) in podfile.targets.iter().enumerate() {
            for (di, dep) in target.depends.iter().enumerate() {
                if let SeedDep::Local { spec_path, .. } = dep {
                    jobs.push((pi, ti, di, spec_path.clone()));
                }
            }
        }
    }
    if jobs.is_empty() {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut join_set = JoinSet::new();
    for (pi, ti, di, path) in jobs {
        let sem = semaphore.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let read = tokio::task::spawn_blocking(move || local_depends(&path)).await;
            (pi, ti, di, read)
        });
    }

    while let Some(joined) = join_set.join_next().await {
        let Ok((pi, ti, di, read)) = joined else {
            continue;
        };
        match read {
            Ok(Ok(deps)) => {
                if let SeedDep::Local { subdepends, .. } =
                    &mut podfiles[pi].0.targets[ti].depends[di]
                {
                    *subdepends = deps;
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "cannot read local podspec");
            }
            Err(e) => {
                tracing::warn!(error = %e, "local spec worker lost");
            }
        }
    }
}

fn local_depends(path: &std::path::Path) -> miette::Result<Vec<DependencyRef>> {
    let parsed = spec::read_spec(path)?;
    let flat = parsed.flatten_dependencies(&parsed.name)?;
    Ok(flat
        .into_iter()
        .map(|(name, constraint)| DependencyRef::new(name, constraint))
        .collect())
}
