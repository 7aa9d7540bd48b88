//! The event store contract.

use crate::StoreResult;
use transport_types::{DeliveryKey, EventId, EventRecord};

/// Default cap on stored records per destination.
pub const DEFAULT_MAX_RECORDS_PER_DESTINATION: usize = 10_000;

/// Store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum records a single destination may hold across all priorities.
    /// `None` disables the limit.
    pub max_records_per_destination: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_records_per_destination: Some(DEFAULT_MAX_RECORDS_PER_DESTINATION),
        }
    }
}

/// A record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEvent {
    pub id: EventId,
    pub record: EventRecord,
    /// Whether the backend decoration has already been applied and stored.
    pub decorated: bool,
}

/// Durable, ordered queue of event records.
///
/// Implementations serialize concurrent calls internally; callers on any
/// thread may use the store at the same time as the delivery worker.
pub trait EventStore: Send + Sync {
    /// Persists one record and returns its generated id.
    fn enqueue(&self, record: &EventRecord) -> StoreResult<EventId>;

    /// Returns up to `max_records` records for the key, oldest first.
    /// Records stay in the store.
    fn load_batch(&self, key: &DeliveryKey, max_records: usize) -> StoreResult<Vec<PersistedEvent>>;

    /// Deletes the given records atomically. Unknown ids are ignored.
    ///
    /// Returns how many records were actually deleted.
    fn remove(&self, ids: &[EventId]) -> StoreResult<usize>;

    /// Whether any record is stored for the key.
    fn has_pending(&self, key: &DeliveryKey) -> StoreResult<bool>;

    /// Replaces the stored record with its decorated form and marks it as
    /// decorated. Returns `false` if the record no longer exists.
    fn apply_decoration(&self, id: EventId, record: &EventRecord) -> StoreResult<bool>;

    /// Adds one to the attempt count of each given record.
    fn record_failed_attempt(&self, ids: &[EventId]) -> StoreResult<()>;

    /// Every key with at least one stored record.
    fn pending_keys(&self) -> StoreResult<Vec<DeliveryKey>>;

    /// Stored record count per key.
    fn pending_counts(&self) -> StoreResult<Vec<(DeliveryKey, usize)>>;
}
