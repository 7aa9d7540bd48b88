//! # Event Store
//!
//! Durable, ordered queue of [`EventRecord`]s, queryable per
//! (destination, priority) pair.
//!
//! ## Guarantees
//!
//! - Every mutating call is committed to SQLite before it returns, so a
//!   crash right after `enqueue` keeps the event and a crash right after
//!   `remove` does not bring it back
//! - `load_batch` returns records in enqueue order and never removes them
//! - `remove` is idempotent
//! - Enqueue fails closed once a destination holds its configured maximum
//!
//! ## Example
//!
//! ```rust
//! use event_store::{EventStore, SqliteEventStore, StoreConfig};
//! use transport_types::{DeliveryKey, EventRecord, Priority};
//!
//! let store = SqliteEventStore::in_memory(StoreConfig::default()).unwrap();
//! let record = EventRecord::new("d1", "clicks", Priority::Default, 3, 1, b"hi".to_vec());
//! store.enqueue(&record).unwrap();
//!
//! let key = DeliveryKey::new("d1", Priority::Default);
//! let batch = store.load_batch(&key, 50).unwrap();
//! assert_eq!(batch.len(), 1);
//!
//! let ids: Vec<_> = batch.iter().map(|e| e.id).collect();
//! store.remove(&ids).unwrap();
//! assert!(!store.has_pending(&key).unwrap());
//! ```

mod error;
mod migrations;
mod sqlite;
mod store;

#[cfg(test)]
mod tests;

pub use error::{StoreError, StoreResult};
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use sqlite::SqliteEventStore;
pub use store::{EventStore, PersistedEvent, StoreConfig};
pub use transport_types::{DeliveryKey, EventId, EventRecord, Priority};
