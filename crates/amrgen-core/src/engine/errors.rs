//! Error types for generation.

use thiserror::Error;

/// Errors that can occur while configuring or running generation.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Only malformed input structure and configuration are reported as errors.
/// Oracles that return nothing, missing language-model entries and
/// unrealizable concepts are recovered inside the search and degrade the
/// output instead of failing the call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GenError {
    /// The graph violates a structural precondition (e.g., SWAP on vertices
    /// that are not parent and child, or a vertex with two parents after
    /// stage 1).
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    /// Invalid hyperparameters or malformed configuration/table file.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure reading a configuration or table file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> Self {
        GenError::Config(err.to_string())
    }
}
