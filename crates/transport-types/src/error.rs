//! Error types for the shared transport types.

use thiserror::Error;

/// Error produced when decoding stored values into typed ones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// Stored priority value is not a known priority.
    #[error("Unknown priority value: {0}")]
    UnknownPriority(i64),

    /// Priority name could not be parsed.
    #[error("Unknown priority name: {0}")]
    UnknownPriorityName(String),
}

/// Result type alias using TypesError.
pub type TypesResult<T> = Result<T, TypesError>;
