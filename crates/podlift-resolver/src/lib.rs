//! Resolution engine: version-constraint matching, iterative fixpoint
//! construction of a closed dependency graph, version harmonization across
//! sibling sub-modules, connected-component decomposition, and spanning
//! trees with explicit cycle handling.

pub mod component;
pub mod export;
pub mod graph;
pub mod resolver;
pub mod store;
pub mod tree;
pub mod version;
