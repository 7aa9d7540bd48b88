//! Debounce and batch grouping.

use super::harness::{config, key, TestHarness};
use crate::{AttemptReport, PairPhase, SchedulerConfig, TriggerRequest};
use transport_types::{DeliveryKey, Priority};

/// One event at uptime 1 with a 500ms debounce is sent once, alone, at 600.
#[tokio::test]
async fn single_event_delivered_after_debounce() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");

    h.enqueue("d1", Priority::Default, "a");
    assert_eq!(
        h.trigger.requests(),
        vec![TriggerRequest {
            key: key("d1"),
            delay_ms: 500
        }]
    );
    let snapshot = h.runtime.pair_snapshot(&key("d1")).unwrap();
    assert_eq!(snapshot.phase, PairPhase::Armed);
    assert_eq!(snapshot.next_eligible_ms, 501);

    h.set_uptime(600);
    let summary = h.run().await;

    assert_eq!(summary.attempted(), 1);
    assert_eq!(
        summary.report_for(&key("d1")),
        Some(&AttemptReport::Delivered {
            delivered: 1,
            discarded: 0
        })
    );
    assert_eq!(backend.transmit_count(), 1);
    assert_eq!(backend.transmitted()[0].len(), 1);
    assert_eq!(h.pending(&key("d1")), 0);
    assert_eq!(h.runtime.pair_snapshot(&key("d1")).unwrap().phase, PairPhase::Idle);
}

#[tokio::test]
async fn run_before_debounce_does_nothing() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");
    h.enqueue("d1", Priority::Default, "a");

    h.set_uptime(400);
    let summary = h.run().await;

    assert_eq!(summary.attempted(), 0);
    assert_eq!(summary.waiting, 1);
    assert_eq!(backend.transmit_count(), 0);
    assert_eq!(h.trigger.last_delay_for(&key("d1")), Some(101));
    assert_eq!(h.pending(&key("d1")), 1);
}

#[tokio::test]
async fn events_within_debounce_share_one_batch() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");

    h.enqueue("d1", Priority::Default, "a");
    h.advance(50);
    h.enqueue("d1", Priority::Default, "b");

    // The second enqueue found the pair armed and did not re-trigger.
    assert_eq!(h.trigger.requests_for(&key("d1")).len(), 1);

    h.set_uptime(600);
    h.run().await;

    assert_eq!(backend.transmit_count(), 1);
    assert_eq!(backend.transmitted_payloads(), vec!["a", "b"]);
}

#[tokio::test]
async fn destinations_are_batched_separately() {
    let h = TestHarness::new(config());
    let d1 = h.register("d1");
    let d2 = h.register("d2");

    h.enqueue("d1", Priority::Default, "a");
    h.enqueue("d2", Priority::Default, "b");

    h.set_uptime(600);
    let summary = h.run().await;

    assert_eq!(summary.attempted(), 2);
    assert_eq!(d1.transmitted_payloads(), vec!["a"]);
    assert_eq!(d2.transmitted_payloads(), vec!["b"]);
}

#[tokio::test]
async fn priorities_are_separate_pairs() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");

    h.enqueue("d1", Priority::Default, "normal");
    h.enqueue("d1", Priority::Highest, "urgent");

    let urgent = DeliveryKey::new("d1", Priority::Highest);
    assert_eq!(h.trigger.requests_for(&urgent).len(), 1);
    assert_eq!(h.trigger.requests_for(&key("d1")).len(), 1);

    h.set_uptime(600);
    h.run().await;

    let batches = backend.transmitted();
    assert_eq!(batches.len(), 2);
    for batch in batches {
        assert_eq!(batch.len(), 1);
        let expected = if batch[0].payload() == b"urgent" {
            Priority::Highest
        } else {
            Priority::Default
        };
        assert_eq!(batch[0].priority(), expected);
    }
}

/// A backlog larger than one batch drains in order, one debounce apart.
#[tokio::test]
async fn backlog_drains_in_batches() {
    let h = TestHarness::new(SchedulerConfig {
        max_batch_size: 2,
        ..config()
    });
    let backend = h.register("d1");
    for payload in ["a", "b", "c", "d", "e"] {
        h.enqueue("d1", Priority::Default, payload);
    }

    h.set_uptime(600);
    h.run().await;
    let snapshot = h.runtime.pair_snapshot(&key("d1")).unwrap();
    assert_eq!(snapshot.phase, PairPhase::Armed);
    assert_eq!(snapshot.next_eligible_ms, 1_100);

    h.run_when_due(&key("d1")).await;
    h.run_when_due(&key("d1")).await;

    let sizes: Vec<usize> = backend.transmitted().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(backend.transmitted_payloads(), vec!["a", "b", "c", "d", "e"]);
    assert_eq!(h.runtime.pair_snapshot(&key("d1")).unwrap().phase, PairPhase::Idle);
}

#[tokio::test]
async fn record_fields_reach_the_backend() {
    let h = TestHarness::new(config());
    let backend = h.register("d1");
    h.wall.set(1_700_000_000_000);
    h.enqueue("d1", Priority::Default, "a");

    h.set_uptime(600);
    h.run().await;

    let record = &backend.transmitted()[0][0];
    assert_eq!(record.destination(), "d1");
    assert_eq!(record.transport_name(), "test-transport");
    assert_eq!(record.event_time_millis(), 1_700_000_000_000);
    assert_eq!(record.uptime_millis(), 1);
    assert_eq!(record.attempt_count(), 0);
}
