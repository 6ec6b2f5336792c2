//! Report writers for analysis runs.
//!
//! Every run gets its own `up_<timestamp>` directory under the configured
//! output root, holding per-target CSV plans, optional Podfile-style flatten
//! snippets, and JSON dumps of the graph, its components, and the spanning
//! trees.

use std::path::{Path, PathBuf};

use podlift_resolver::component::ConnectedGraph;
use podlift_resolver::export;
use podlift_resolver::graph::GraphPodfile;
use podlift_resolver::tree::SpanningTree;
use podlift_util::errors::PodliftError;

const CSV_HEADER: &str =
    "ModuleName,IsCommon,IsNew,IsImplicit,IsLocal,Current,UpgradeTo,UpgradeTag,Newest,Dependencies";

/// Create a fresh timestamped output directory under `base`.
pub fn create_output_dir(base: &Path) -> miette::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let dir = base.join(format!("up_{stamp}"));
    podlift_util::fs::ensure_dir(&dir).map_err(PodliftError::Io)?;
    Ok(dir)
}

/// File-name stem identifying one analyzed graph: the Podfile's parent
/// directory plus the target, with path separators and the all-targets
/// wildcard flattened out.
pub fn graph_stem(graph: &GraphPodfile) -> String {
    let source = Path::new(&graph.source)
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("podfile");
    let target = if graph.target.is_empty() || graph.target == "*" {
        "all"
    } else {
        graph.target.as_str()
    };
    format!("{source}_{target}")
        .replace(['/', '\\', ':'], "_")
}

/// Write the per-module upgrade plan as CSV.
pub fn write_plan_csv(dir: &Path, graph: &GraphPodfile) -> miette::Result<PathBuf> {
    let path = dir.join(format!("{}.csv", graph_stem(graph)));
    let mut out = String::with_capacity(4096);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for row in graph.rows() {
        let fields = [
            row.name,
            row.is_common.to_string(),
            row.is_new.to_string(),
            row.is_implicit.to_string(),
            row.is_local.to_string(),
            row.current,
            row.upgrade_to,
            row.upgrade_tag,
            row.newest,
            row.dependencies,
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    write_text(&path, &out)?;
    Ok(path)
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write a Podfile-style snippet grouping modules into Common, Local, and
/// Remote sections at their effective versions.
pub fn write_flatten(dir: &Path, graph: &GraphPodfile) -> miette::Result<PathBuf> {
    let path = dir.join(format!("{}.flatten.txt", graph_stem(graph)));
    let mut common = Vec::new();
    let mut local = Vec::new();
    let mut remote = Vec::new();
    for node in graph.modules.values() {
        let line = if node.is_local {
            format!("pod '{}', :path => '...'", node.name)
        } else {
            match node.effective_version() {
                "" | "*" => format!("pod '{}'", node.name),
                v => format!("pod '{}', '{v}'", node.name),
            }
        };
        if node.is_local {
            local.push(line);
        } else if node.is_common {
            common.push(line);
        } else {
            remote.push(line);
        }
    }

    let mut out = String::new();
    for (section, lines) in [
        ("Common", &common),
        ("Local", &local),
        ("Remote", &remote),
    ] {
        if lines.is_empty() {
            continue;
        }
        out.push_str(&format!("# {section}\n"));
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }
    write_text(&path, &out)?;
    Ok(path)
}

/// Dump the resolved graph as JSON.
pub fn write_graph_json(dir: &Path, graph: &GraphPodfile) -> miette::Result<PathBuf> {
    let path = dir.join(format!("{}.graph.json", graph_stem(graph)));
    write_json(&path, &export::export_graph(graph))?;
    Ok(path)
}

/// Dump the connected-component decomposition as JSON.
pub fn write_components_json(
    dir: &Path,
    graph: &GraphPodfile,
    components: &[ConnectedGraph],
) -> miette::Result<PathBuf> {
    let path = dir.join(format!("{}.components.json", graph_stem(graph)));
    write_json(&path, components)?;
    Ok(path)
}

/// Dump the spanning trees, references already resolved, as JSON.
pub fn write_trees_json(
    dir: &Path,
    graph: &GraphPodfile,
    trees: &[SpanningTree],
) -> miette::Result<PathBuf> {
    let path = dir.join(format!("{}.trees.json", graph_stem(graph)));
    write_json(&path, trees)?;
    Ok(path)
}

fn write_text(path: &Path, content: &str) -> miette::Result<()> {
    std::fs::write(path, content).map_err(|e| {
        PodliftError::Generic {
            message: format!("cannot write report {}: {e}", path.display()),
        }
        .into()
    })
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> miette::Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| PodliftError::Generic {
        message: format!("cannot serialize report: {e}"),
    })?;
    write_text(path, &content)
}
