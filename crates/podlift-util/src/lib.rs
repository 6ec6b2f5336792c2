//! Shared utilities for the podlift upgrade-planning tool.
//!
//! This crate provides cross-cutting concerns used by all other podlift
//! crates: error types, filesystem helpers, hashing, process spawning,
//! and terminal progress indicators.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
