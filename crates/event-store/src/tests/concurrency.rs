//! Concurrent access from many threads.

use super::{key, record, store};
use crate::EventStore;
use std::sync::Arc;
use std::thread;
use transport_types::Priority;

#[test]
fn concurrent_enqueues_are_all_stored() {
    let store = Arc::new(store());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    store
                        .enqueue(&record("d1", Priority::Default, &format!("{}-{}", t, i)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.load_batch(&key("d1"), 1000).unwrap().len(), 200);
}

#[test]
fn enqueue_during_drain_is_never_lost() {
    let store = Arc::new(store());
    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..100 {
                store
                    .enqueue(&record("d1", Priority::Default, &i.to_string()))
                    .unwrap();
            }
        })
    };

    let mut drained = 0;
    while drained < 100 {
        let batch = store.load_batch(&key("d1"), 7).unwrap();
        let ids: Vec<_> = batch.iter().map(|e| e.id).collect();
        drained += store.remove(&ids).unwrap();
        if batch.is_empty() {
            thread::yield_now();
        }
    }
    writer.join().unwrap();

    assert_eq!(drained, 100);
    assert!(!store.has_pending(&key("d1")).unwrap());
}
