//! One delivery attempt for one (destination, priority) pair.
//!
//! The uploader never decides *when* to run; the scheduler does. It loads a
//! batch, hands it to the backend, and applies the outcome to the store:
//!
//! | Outcome            | Store effect                                        |
//! |--------------------|-----------------------------------------------------|
//! | `Ok`               | batch removed                                       |
//! | `InvalidPayload`   | batch removed, never retried                        |
//! | `TransientFailure` | attempt counts bumped, records at the ceiling gone  |
//! | no backend         | nothing touched                                     |

use crate::backend::{BackendRegistry, TransmitOutcome};
use crate::blocking::run_store;
use crate::error::DeliveryFault;
use crate::stats::DeliveryStats;
use event_store::{EventStore, PersistedEvent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use transport_types::{DeliveryKey, EventId, EventRecord};

/// What one attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptReport {
    /// The pair had no stored records.
    NothingPending,
    /// The backend accepted the batch.
    Delivered { delivered: usize, discarded: usize },
    /// The backend rejected the batch as malformed; it was dropped.
    Dropped {
        dropped: usize,
        discarded: usize,
        reason: String,
    },
    /// The attempt failed and some of the batch is still stored.
    Retry { discarded: usize, fault: DeliveryFault },
    /// Every record in the batch hit the attempt ceiling and was discarded.
    Exhausted { discarded: usize },
    /// No backend capability is registered for the destination.
    Unregistered { destination: String, pending: usize },
}

impl AttemptReport {
    /// Whether the scheduler should wait out a backoff before the next attempt.
    pub fn needs_backoff(&self) -> bool {
        matches!(self, AttemptReport::Retry { .. })
    }

    pub fn fault(&self) -> Option<DeliveryFault> {
        match self {
            AttemptReport::NothingPending | AttemptReport::Delivered { .. } => None,
            AttemptReport::Dropped { reason, .. } => {
                Some(DeliveryFault::InvalidPayload(reason.clone()))
            }
            AttemptReport::Retry { fault, .. } => Some(fault.clone()),
            AttemptReport::Exhausted { discarded } => {
                Some(DeliveryFault::AttemptsExceeded(*discarded))
            }
            AttemptReport::Unregistered { destination, .. } => {
                Some(DeliveryFault::Registration(destination.clone()))
            }
        }
    }
}

/// Runs delivery attempts against a store and a backend registry.
pub struct Uploader {
    store: Arc<dyn EventStore>,
    registry: Arc<dyn BackendRegistry>,
    max_batch_size: usize,
    max_attempts: u32,
    stats: Arc<DeliveryStats>,
}

impl Uploader {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<dyn BackendRegistry>,
        max_batch_size: usize,
        max_attempts: u32,
        stats: Arc<DeliveryStats>,
    ) -> Self {
        Self {
            store,
            registry,
            max_batch_size,
            max_attempts,
            stats,
        }
    }

    /// Attempt delivery of the oldest stored batch for `key`.
    ///
    /// Callers must ensure at most one attempt per key is running. Store
    /// calls run on the blocking pool, so this must be polled inside a
    /// tokio runtime.
    pub async fn attempt(&self, key: &DeliveryKey) -> AttemptReport {
        match self.try_attempt(key).await {
            Ok(report) => report,
            Err(fault) => {
                error!(key = %key, error = %fault, "Storage fault during delivery attempt");
                self.stats.record_storage_fault();
                AttemptReport::Retry {
                    discarded: 0,
                    fault,
                }
            }
        }
    }

    async fn try_attempt(&self, key: &DeliveryKey) -> Result<AttemptReport, DeliveryFault> {
        let batch = {
            let key = key.clone();
            let max = self.max_batch_size;
            run_store(&self.store, move |store| store.load_batch(&key, max)).await?
        };
        if batch.is_empty() {
            debug!(key = %key, "Nothing pending");
            return Ok(AttemptReport::NothingPending);
        }

        // Records left over from a run with a higher ceiling.
        let (expired, live): (Vec<PersistedEvent>, Vec<PersistedEvent>) = batch
            .into_iter()
            .partition(|event| event.record.attempt_count() >= self.max_attempts);
        let mut discarded = self.discard(key, &expired).await?;
        if live.is_empty() {
            return Ok(AttemptReport::Exhausted { discarded });
        }

        let Some(backend) = self.registry.get(&key.destination) else {
            warn!(key = %key, pending = live.len(), "No backend registered for destination");
            self.stats.record_registration_fault();
            return Ok(AttemptReport::Unregistered {
                destination: key.destination.clone(),
                pending: live.len(),
            });
        };

        let mut ids: Vec<EventId> = Vec::with_capacity(live.len());
        let mut records: Vec<EventRecord> = Vec::with_capacity(live.len());
        let mut decorations: Vec<(EventId, EventRecord)> = Vec::new();
        for event in &live {
            let record = if event.decorated {
                event.record.clone()
            } else {
                // Only metadata is taken from the backend; every other field
                // stays as stored so retries transmit the same record.
                let decorated = backend.decorate(event.record.clone());
                let record = event.record.clone().with_all_metadata(decorated.metadata().clone());
                decorations.push((event.id, record.clone()));
                record
            };
            ids.push(event.id);
            records.push(record);
        }
        if !decorations.is_empty() {
            run_store(&self.store, move |store| {
                for (id, record) in &decorations {
                    store.apply_decoration(*id, record)?;
                }
                Ok(())
            })
            .await?;
        }

        self.stats.record_attempt();
        debug!(key = %key, batch_size = records.len(), "Transmitting batch");

        match backend.transmit(&records).await {
            TransmitOutcome::Ok => {
                self.remove(ids.clone()).await?;
                self.stats.record_delivered(ids.len());
                info!(key = %key, delivered = ids.len(), "Batch delivered");
                Ok(AttemptReport::Delivered {
                    delivered: ids.len(),
                    discarded,
                })
            }
            TransmitOutcome::InvalidPayload(reason) => {
                self.remove(ids.clone()).await?;
                self.stats.record_dropped_invalid(ids.len());
                warn!(key = %key, dropped = ids.len(), reason = %reason, "Backend rejected batch as invalid, dropping");
                Ok(AttemptReport::Dropped {
                    dropped: ids.len(),
                    discarded,
                    reason,
                })
            }
            TransmitOutcome::TransientFailure(reason) => {
                let failed = ids.clone();
                run_store(&self.store, move |store| store.record_failed_attempt(&failed)).await?;
                self.stats.record_transient_failure();

                let exhausted: Vec<PersistedEvent> = live
                    .into_iter()
                    .filter(|event| event.record.attempt_count() + 1 >= self.max_attempts)
                    .collect();
                let newly_discarded = self.discard(key, &exhausted).await?;
                discarded += newly_discarded;

                if newly_discarded == ids.len() {
                    return Ok(AttemptReport::Exhausted { discarded });
                }
                warn!(key = %key, batch_size = ids.len(), reason = %reason, "Transient delivery failure");
                Ok(AttemptReport::Retry {
                    discarded,
                    fault: DeliveryFault::Transient(reason),
                })
            }
        }
    }

    async fn remove(&self, ids: Vec<EventId>) -> Result<(), DeliveryFault> {
        run_store(&self.store, move |store| store.remove(&ids)).await.map(|_| ())
    }

    async fn discard(
        &self,
        key: &DeliveryKey,
        events: &[PersistedEvent],
    ) -> Result<usize, DeliveryFault> {
        if events.is_empty() {
            return Ok(0);
        }
        let ids: Vec<EventId> = events.iter().map(|event| event.id).collect();
        let count = ids.len();
        self.remove(ids).await?;
        self.stats.record_discarded(count);
        warn!(
            key = %key,
            discarded = count,
            max_attempts = self.max_attempts,
            "Discarding records that reached the attempt ceiling"
        );
        Ok(count)
    }
}
