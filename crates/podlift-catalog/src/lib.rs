//! Persistent module catalog: a JSON-backed store of indexed podspecs and
//! the indexer that fills it from spec-repo checkouts.

pub mod index;
pub mod store;
