//! Core data types for the podlift upgrade-planning tool.
//!
//! Defines the in-memory model shared by every other crate: dependency
//! references, parsed podspec trees with dependency flattening, Podfile
//! targets and seed dependencies, and global configuration.

pub mod config;
pub mod dependency;
pub mod podfile;
pub mod spec;
