use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all podlift operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PodliftError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A module, version, spec file, or podfile path does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Invalid or malformed podfile/spec input.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check the Podfile or podspec for syntax errors"))]
    Manifest { message: String },

    /// Malformed version or constraint syntax that could not be tolerated.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Catalog store read or write failed.
    #[error("Catalog store error: {message}")]
    Store { message: String },

    /// A claimed connected component was not actually connected.
    #[error("Inconsistent graph: {message}")]
    InconsistentGraph { message: String },

    /// The resolution fixpoint could not be reached.
    #[error("Unresolvable dependencies: {message}")]
    #[diagnostic(help("Contradictory or cyclic version constraints may be involved"))]
    Unresolvable { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PodliftResult<T> = miette::Result<T>;
