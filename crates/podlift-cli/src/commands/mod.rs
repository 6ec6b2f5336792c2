//! Command dispatch and handler modules.

mod analyze;
mod search;
mod sync;

use std::path::Path;

use miette::Result;

use podlift_core::config::GlobalConfig;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Sync => sync::exec(&config).await,
        Command::Analyze {
            podfiles,
            rules,
            rules_file,
            merge,
            flatten,
        } => analyze::exec(&config, &podfiles, rules, rules_file, merge, flatten).await,
        Command::Search { module, constraint } => search::exec(&config, &module, constraint),
    }
}

fn load_config(path: Option<&Path>) -> Result<GlobalConfig> {
    match path {
        Some(path) => GlobalConfig::load_from(path),
        None => GlobalConfig::load(),
    }
}
