//! Error types for the secret masking crate.

use thiserror::Error;

/// Result type for masking operations.
pub type Result<T> = std::result::Result<T, MaskError>;

/// Errors surfaced by the secret masker.
#[derive(Error, Debug)]
pub enum MaskError {
    /// A regex-shaped secret pattern failed to compile.
    #[error("invalid secret pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
