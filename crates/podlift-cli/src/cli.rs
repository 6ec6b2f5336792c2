//! CLI argument definitions for podlift.
//!
//! Uses `clap` derive macros to define the full command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "podlift",
    version,
    about = "Upgrade planning for CocoaPods projects",
    long_about = "podlift indexes CocoaPods spec repos into a local catalog, resolves \
                  Podfiles to closed dependency graphs, and writes upgrade plans with \
                  per-module version moves, components, and dependency trees."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the config file (defaults to ~/.podlift/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index the configured spec repos into the catalog
    Sync,

    /// Resolve Podfiles and write upgrade plans
    Analyze {
        /// Podfiles to analyze, each as PATH or PATH:TARGET
        #[arg(required = true)]
        podfiles: Vec<String>,

        /// Upgrade rule as NAME:VERSION (repeatable)
        #[arg(long = "rule")]
        rules: Vec<String>,

        /// Podfile whose pins act as upgrade rules
        #[arg(long)]
        rules_file: Option<PathBuf>,

        /// Resolve all Podfiles into one merged graph
        #[arg(long)]
        merge: bool,

        /// Also write Podfile-style flatten snippets
        #[arg(long)]
        flatten: bool,
    },

    /// Look a module up in the catalog
    Search {
        /// Module name
        module: String,

        /// Version constraint restricting the selected version
        #[arg(short = 'r', long)]
        constraint: Option<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
