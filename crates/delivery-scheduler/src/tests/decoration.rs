//! Backend decoration is applied once per record and survives retries.

use super::harness::{config, key, MockBackend, TestHarness, DECORATION_KEY};
use crate::{BackendCapability, TransmitOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use transport_types::{EventRecord, Priority};

fn transient() -> TransmitOutcome {
    TransmitOutcome::TransientFailure("connection reset".to_string())
}

#[tokio::test]
async fn decorated_metadata_is_transmitted() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");
    h.enqueue("d1", Priority::Default, "a");

    h.run_when_due(&key("d1")).await;

    let record = &backend.transmitted()[0][0];
    assert_eq!(record.metadata_value(DECORATION_KEY), Some("test-value"));
}

#[tokio::test]
async fn decorate_runs_once_across_retries() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");
    backend.queue_response(transient());
    backend.queue_response(transient());

    h.enqueue("d1", Priority::Default, "a");
    h.run_when_due(&key("d1")).await;

    let stored = h.stored(&key("d1"));
    assert!(stored[0].decorated);
    assert_eq!(stored[0].record.metadata_value(DECORATION_KEY), Some("test-value"));

    h.run_when_due(&key("d1")).await;
    h.run_when_due(&key("d1")).await;

    assert_eq!(backend.transmit_count(), 3);
    assert_eq!(backend.decorate_calls(), 1);
    for batch in backend.transmitted() {
        assert_eq!(batch[0].metadata_value(DECORATION_KEY), Some("test-value"));
    }
}

#[tokio::test]
async fn only_new_records_are_decorated() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");
    backend.queue_response(transient());

    h.enqueue("d1", Priority::Default, "a");
    h.run_when_due(&key("d1")).await;
    h.enqueue("d1", Priority::Default, "b");
    h.run_when_due(&key("d1")).await;

    assert_eq!(backend.decorate_calls(), 2);
    assert_eq!(backend.transmitted()[1].len(), 2);
}

/// An unregistered destination leaves records undecorated.
#[tokio::test]
async fn no_decoration_without_backend() {
    let h = TestHarness::new(config());
    h.enqueue("d1", Priority::Default, "a");
    h.run_when_due(&key("d1")).await;

    let stored = h.stored(&key("d1"));
    assert!(!stored[0].decorated);
    assert!(stored[0].record.metadata().is_empty());
}

/// Decorates by building a new record, changing more than metadata.
struct RebuildingBackend {
    inner: MockBackend,
}

#[async_trait]
impl BackendCapability for RebuildingBackend {
    fn decorate(&self, record: EventRecord) -> EventRecord {
        EventRecord::new(
            record.destination(),
            "rewritten",
            record.priority(),
            0,
            0,
            b"rewritten".to_vec(),
        )
        .with_metadata("sdk", "1.0")
    }

    async fn transmit(&self, batch: &[EventRecord]) -> TransmitOutcome {
        self.inner.transmit(batch).await
    }
}

#[tokio::test]
async fn decoration_only_contributes_metadata() {
    let h = TestHarness::new(config());
    let backend = Arc::new(RebuildingBackend {
        inner: MockBackend::new(),
    });
    backend.inner.queue_response(transient());
    h.registry.register("d1", backend.clone());

    h.enqueue("d1", Priority::Default, "a");
    h.run_when_due(&key("d1")).await;
    h.run_when_due(&key("d1")).await;

    let batches = backend.inner.transmitted();
    assert_eq!(batches.len(), 2);
    let first = &batches[0][0];
    assert_eq!(first.payload(), b"a");
    assert_eq!(first.transport_name(), "test-transport");
    assert_eq!(first.event_time_millis(), 3);
    assert_eq!(first.metadata_value("sdk"), Some("1.0"));

    // The retry carries the stored record, which differs only by attempt count.
    assert_eq!(&batches[1][0], &first.clone().with_attempt_count(1));
}
