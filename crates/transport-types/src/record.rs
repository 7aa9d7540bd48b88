//! The persisted unit of work.

use crate::{DeliveryKey, Priority};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend-supplied annotations attached to a record.
pub type Metadata = BTreeMap<String, String>;

/// An event queued for delivery.
///
/// Records are values: once persisted they are never changed in place. The
/// `with_*` methods return a new record that the store writes over the old
/// one (decoration, attempt accounting).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    destination: String,
    transport_name: String,
    priority: Priority,
    event_time_millis: i64,
    uptime_millis: i64,
    payload: Vec<u8>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    attempt_count: u32,
}

impl EventRecord {
    /// Creates a fresh record with no metadata and no delivery attempts.
    pub fn new(
        destination: impl Into<String>,
        transport_name: impl Into<String>,
        priority: Priority,
        event_time_millis: i64,
        uptime_millis: i64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            destination: destination.into(),
            transport_name: transport_name.into(),
            priority,
            event_time_millis,
            uptime_millis,
            payload,
            metadata: Metadata::new(),
            attempt_count: 0,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn transport_name(&self) -> &str {
        &self.transport_name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn event_time_millis(&self) -> i64 {
        self.event_time_millis
    }

    pub fn uptime_millis(&self) -> i64 {
        self.uptime_millis
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns a metadata value, if present.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// The scheduling key this record is batched under.
    pub fn key(&self) -> DeliveryKey {
        DeliveryKey::new(self.destination.clone(), self.priority)
    }

    /// Returns a copy with one more metadata entry.
    ///
    /// An existing entry under the same key is replaced.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a copy with the given metadata entries merged in.
    pub fn with_all_metadata(mut self, entries: Metadata) -> Self {
        self.metadata.extend(entries);
        self
    }

    /// Returns a copy carrying the given attempt count.
    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }
}
