//! Delivery counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters updated by the uploader and scheduler.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    enqueued: AtomicU64,
    attempts: AtomicU64,
    delivered: AtomicU64,
    dropped_invalid: AtomicU64,
    discarded: AtomicU64,
    transient_failures: AtomicU64,
    registration_faults: AtomicU64,
    storage_faults: AtomicU64,
}

/// Point-in-time copy of [`DeliveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub attempts: u64,
    pub delivered: u64,
    pub dropped_invalid: u64,
    pub discarded: u64,
    pub transient_failures: u64,
    pub registration_faults: u64,
    pub storage_faults: u64,
}

impl DeliveryStats {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self, count: usize) {
        self.delivered.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_invalid(&self, count: usize) {
        self.dropped_invalid.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: usize) {
        self.discarded.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_registration_fault(&self) {
        self.registration_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_storage_fault(&self) {
        self.storage_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            registration_faults: self.registration_faults.load(Ordering::Relaxed),
            storage_faults: self.storage_faults.load(Ordering::Relaxed),
        }
    }
}
