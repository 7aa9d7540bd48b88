//! Typed senders.

use crate::error::TransportError;
use crate::runtime::TransportRuntime;
use std::fmt;
use std::sync::Arc;
use transport_types::{EventId, Priority};

/// Turns a typed payload into the opaque bytes stored with the record.
pub type Encoder<T> = Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>;

/// A payload plus its delivery priority.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<T> {
    payload: T,
    priority: Priority,
}

impl<T> Event<T> {
    pub fn new(payload: T, priority: Priority) -> Self {
        Self { payload, priority }
    }

    /// An event at default priority.
    pub fn telemetry(payload: T) -> Self {
        Self::new(payload, Priority::Default)
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// Sends events of type `T` to one destination under one transport name.
pub struct Transport<T> {
    runtime: Arc<TransportRuntime>,
    destination: String,
    name: String,
    encoder: Encoder<T>,
}

impl<T> Transport<T> {
    pub(crate) fn new(
        runtime: Arc<TransportRuntime>,
        destination: String,
        name: String,
        encoder: Encoder<T>,
    ) -> Self {
        Self {
            runtime,
            destination,
            name,
            encoder,
        }
    }

    /// Encode and enqueue the event. Returns once it is durably stored.
    pub fn send(&self, event: Event<T>) -> Result<EventId, TransportError> {
        let encoder = &self.encoder;
        self.runtime
            .enqueue(&self.destination, &self.name, event.priority, || {
                encoder(&event.payload)
            })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Transport<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            destination: self.destination.clone(),
            name: self.name.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

impl<T> fmt::Debug for Transport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("destination", &self.destination)
            .field("name", &self.name)
            .finish()
    }
}
