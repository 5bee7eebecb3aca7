//! Error types shared across the jobforge variable crates.

use thiserror::Error;

/// Result type alias for jobforge variable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the variable store and its value objects.
///
/// These are argument-level failures: fatal to the call, surfaced
/// immediately, never retried. Conditions the engine tolerates
/// (unknown macros, depth and cycle aborts, parse failures in typed
/// getters) are deliberately *not* represented here — they come back
/// as warnings or absent values instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A variable name was empty or all whitespace.
    #[error("variable name must not be empty")]
    EmptyVariableName,

    /// A string did not parse as a [`crate::JobStatus`].
    #[error("unknown job status: {0}")]
    UnknownJobStatus(String),
}
