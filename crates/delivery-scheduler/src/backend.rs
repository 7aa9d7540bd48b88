//! Backend capability boundary.
//!
//! A backend turns a batch of records into a network request. The scheduler
//! only ever sees the classified [`TransmitOutcome`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use transport_types::EventRecord;

/// Classified result of one transmit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmitOutcome {
    /// The backend accepted the batch.
    Ok,
    /// The backend rejected the batch as malformed. Retrying cannot help.
    InvalidPayload(String),
    /// Network error, backend busy, or any failure worth retrying.
    TransientFailure(String),
}

/// Destination-specific upload logic.
#[async_trait]
pub trait BackendCapability: Send + Sync {
    /// Enrich a record with backend metadata before its first transmit.
    ///
    /// Applied once per record; the decorated record is persisted and
    /// reused on retries.
    fn decorate(&self, record: EventRecord) -> EventRecord {
        record
    }

    /// Send one batch. Must classify every failure rather than panic.
    async fn transmit(&self, batch: &[EventRecord]) -> TransmitOutcome;
}

/// Lookup of backend capabilities by destination name.
pub trait BackendRegistry: Send + Sync {
    fn get(&self, destination: &str) -> Option<Arc<dyn BackendCapability>>;
}

/// Registry backed by a map, filled in by the host at startup.
#[derive(Default)]
pub struct InMemoryBackendRegistry {
    backends: RwLock<HashMap<String, Arc<dyn BackendCapability>>>,
}

impl InMemoryBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, returning the one it replaced.
    pub fn register(
        &self,
        destination: impl Into<String>,
        backend: Arc<dyn BackendCapability>,
    ) -> Option<Arc<dyn BackendCapability>> {
        self.backends.write().insert(destination.into(), backend)
    }

    pub fn unregister(&self, destination: &str) -> Option<Arc<dyn BackendCapability>> {
        self.backends.write().remove(destination)
    }

    /// Registered destination names, sorted.
    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl BackendRegistry for InMemoryBackendRegistry {
    fn get(&self, destination: &str) -> Option<Arc<dyn BackendCapability>> {
        self.backends.read().get(destination).cloned()
    }
}
