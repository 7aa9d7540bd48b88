//! Error types for the transport daemon.

use delivery_scheduler::{DeliveryError, TransportError};
use event_store::StoreError;
use thiserror::Error;

/// Daemon error type.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Runtime construction or recovery error
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Enqueue rejected by the transport runtime
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Path resolution error
    #[error("Path error: {0}")]
    Path(String),
}

/// Result type alias using DaemonError.
pub type DaemonResult<T> = Result<T, DaemonError>;
