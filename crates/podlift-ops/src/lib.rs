//! High-level operations behind the podlift CLI commands: catalog sync,
//! upgrade analysis, and catalog search, plus the report writers.

pub mod ops_analyze;
pub mod ops_search;
pub mod ops_sync;
pub mod report;
