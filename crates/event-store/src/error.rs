//! Event store error types.
//!
//! Every variant is a storage fault: fatal to the single call that hit it,
//! never to the process.

use thiserror::Error;

/// Event store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Destination already holds the maximum number of stored records
    #[error("Destination {destination} is at capacity ({limit} stored records)")]
    CapacityExceeded { destination: String, limit: usize },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored row could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
