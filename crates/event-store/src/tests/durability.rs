//! State that must survive reopening the database file.

use super::{key, payloads, record};
use crate::{EventStore, SqliteEventStore, StoreConfig};
use tempfile::tempdir;
use transport_types::Priority;

#[test]
fn enqueued_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.sqlite");

    {
        let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
        store.enqueue(&record("d1", Priority::Default, "a")).unwrap();
        store.enqueue(&record("d1", Priority::Default, "b")).unwrap();
    }

    let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
    assert_eq!(payloads(&store, &key("d1")), vec!["a", "b"]);
    assert_eq!(store.path(), Some(path.as_path()));
}

#[test]
fn removed_records_stay_removed_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.sqlite");

    {
        let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
        let a = store.enqueue(&record("d1", Priority::Default, "a")).unwrap();
        store.enqueue(&record("d1", Priority::Default, "b")).unwrap();
        store.remove(&[a]).unwrap();
    }

    let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
    assert_eq!(payloads(&store, &key("d1")), vec!["b"]);
}

#[test]
fn attempt_count_and_decoration_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.sqlite");

    {
        let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
        let id = store.enqueue(&record("d1", Priority::Default, "a")).unwrap();
        store.record_failed_attempt(&[id]).unwrap();
        store
            .apply_decoration(id, &record("d1", Priority::Default, "a").with_metadata("k", "v"))
            .unwrap();
    }

    let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
    let batch = store.load_batch(&key("d1"), 10).unwrap();
    assert_eq!(batch[0].record.attempt_count(), 1);
    assert!(batch[0].decorated);
    assert_eq!(batch[0].record.metadata_value("k"), Some("v"));
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("events.sqlite");

    let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
    store.enqueue(&record("d1", Priority::Default, "a")).unwrap();
    assert!(path.exists());
}

#[test]
fn ids_keep_increasing_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.sqlite");

    let first = {
        let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
        let id = store.enqueue(&record("d1", Priority::Default, "a")).unwrap();
        store.remove(&[id]).unwrap();
        id
    };

    let store = SqliteEventStore::open(&path, StoreConfig::default()).unwrap();
    let second = store.enqueue(&record("d1", Priority::Default, "b")).unwrap();
    assert!(second > first);
}
