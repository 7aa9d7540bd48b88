//! Tests for the SQLite event store.
//!
//! - `ordering.rs`   - FIFO order, per-key isolation, batch snapshots
//! - `removal.rs`    - idempotent removal, no redelivery, attempt accounting
//! - `durability.rs` - state surviving a reopen of the database file
//! - `capacity.rs`   - fail-closed enqueue per destination
//! - `concurrency.rs` - concurrent enqueue from many threads

mod concurrency;
mod durability;

use crate::{EventStore, SqliteEventStore, StoreConfig};
use transport_types::{DeliveryKey, EventId, EventRecord, Priority};

pub(crate) fn store() -> SqliteEventStore {
    SqliteEventStore::in_memory(StoreConfig::default()).unwrap()
}

pub(crate) fn record(destination: &str, priority: Priority, payload: &str) -> EventRecord {
    EventRecord::new(destination, "test-transport", priority, 3, 1, payload.as_bytes().to_vec())
}

pub(crate) fn key(destination: &str) -> DeliveryKey {
    DeliveryKey::new(destination, Priority::Default)
}

pub(crate) fn payloads(store: &dyn EventStore, key: &DeliveryKey) -> Vec<String> {
    store
        .load_batch(key, usize::MAX)
        .unwrap()
        .into_iter()
        .map(|e| String::from_utf8(e.record.payload().to_vec()).unwrap())
        .collect()
}

/// Enqueue, load, remove: the basic lifecycle.
#[test]
fn basic_workflow() {
    let store = store();
    let id = store.enqueue(&record("d1", Priority::Default, "a")).unwrap();

    let batch = store.load_batch(&key("d1"), 10).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, id);
    assert_eq!(batch[0].record.payload(), b"a");
    assert!(!batch[0].decorated);

    assert_eq!(store.remove(&[id]).unwrap(), 1);
    assert!(!store.has_pending(&key("d1")).unwrap());
}

#[test]
fn load_batch_does_not_remove() {
    let store = store();
    store.enqueue(&record("d1", Priority::Default, "a")).unwrap();

    store.load_batch(&key("d1"), 10).unwrap();
    store.load_batch(&key("d1"), 10).unwrap();

    assert_eq!(payloads(&store, &key("d1")), vec!["a"]);
}

#[test]
fn empty_store_has_nothing_pending() {
    let store = store();
    assert!(!store.has_pending(&key("d1")).unwrap());
    assert!(store.load_batch(&key("d1"), 10).unwrap().is_empty());
    assert!(store.pending_keys().unwrap().is_empty());
    assert_eq!(store.remove(&[EventId(1)]).unwrap(), 0);
}

#[test]
fn stored_record_keeps_all_fields() {
    let store = store();
    let original = EventRecord::new("d1", "clicks", Priority::Highest, 42, 7, vec![0, 1, 2, 255])
        .with_metadata("k", "v");
    store.enqueue(&original).unwrap();

    let batch = store
        .load_batch(&DeliveryKey::new("d1", Priority::Highest), 1)
        .unwrap();
    assert_eq!(batch[0].record, original);
}
