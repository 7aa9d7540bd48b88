//! Delivery error types.

use event_store::StoreError;
use thiserror::Error;

/// Why a delivery attempt did not simply succeed.
///
/// These never reach senders; they drive backoff, discard and logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFault {
    /// The store failed while the attempt was reading or updating records.
    #[error("storage fault: {0}")]
    Storage(String),

    /// No backend capability is registered for the destination.
    #[error("no backend registered for destination {0}")]
    Registration(String),

    /// The backend rejected the batch as malformed. Never retried.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Network or backend-busy failure. Retried with backoff.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Records reached the attempt ceiling and were discarded.
    #[error("{0} record(s) discarded after reaching the attempt ceiling")]
    AttemptsExceeded(usize),
}

/// Error returned to the caller of `enqueue`.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The event could not be stored; the caller decides whether to drop it.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The runtime no longer accepts events.
    #[error("Transport runtime is shut down")]
    ShutDown,
}

/// Error raised while building or recovering the runtime.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Store error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using DeliveryError.
pub type DeliveryResult<T> = Result<T, DeliveryError>;
