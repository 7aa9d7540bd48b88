//! Store calls from async delivery paths.
//!
//! `EventStore` implementations do synchronous disk I/O (SQLite with a
//! full fsync per commit), so the delivery path never calls them on a
//! tokio worker. Each call is moved to the blocking pool instead.

use crate::error::DeliveryFault;
use event_store::{EventStore, StoreResult};
use std::sync::Arc;

/// Run `op` against `store` on tokio's blocking pool.
///
/// Store errors and a panicked or cancelled blocking task both come back
/// as [`DeliveryFault::Storage`].
pub(crate) async fn run_store<T, F>(store: &Arc<dyn EventStore>, op: F) -> Result<T, DeliveryFault>
where
    F: FnOnce(&dyn EventStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
        Ok(result) => result.map_err(|e| DeliveryFault::Storage(e.to_string())),
        Err(e) => Err(DeliveryFault::Storage(format!("store task failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::{SqliteEventStore, StoreConfig};
    use transport_types::{DeliveryKey, EventRecord, Priority};

    fn store(limit: Option<usize>) -> Arc<dyn EventStore> {
        Arc::new(
            SqliteEventStore::in_memory(StoreConfig {
                max_records_per_destination: limit,
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn returns_store_result() {
        let store = store(None);
        let record = EventRecord::new("d1", "t", Priority::Default, 3, 1, b"a".to_vec());
        run_store(&store, move |store| store.enqueue(&record)).await.unwrap();

        let key = DeliveryKey::new("d1", Priority::Default);
        let pending = run_store(&store, move |store| store.has_pending(&key)).await;
        assert_eq!(pending, Ok(true));
    }

    #[tokio::test]
    async fn store_errors_become_storage_faults() {
        let store = store(Some(1));
        let first = EventRecord::new("d1", "t", Priority::Default, 3, 1, b"a".to_vec());
        let second = first.clone();
        run_store(&store, move |store| store.enqueue(&first)).await.unwrap();

        let result = run_store(&store, move |store| store.enqueue(&second)).await;
        assert!(matches!(result, Err(DeliveryFault::Storage(_))));
    }
}
