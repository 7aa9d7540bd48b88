//! Transport runtime: the sender-facing entry point that ties the store,
//! scheduler and uploader together.

use crate::backend::BackendRegistry;
use crate::config::SchedulerConfig;
use crate::error::{DeliveryError, DeliveryResult, TransportError};
use crate::scheduler::{PairSnapshot, RunSummary, Scheduler};
use crate::stats::{DeliveryStats, StatsSnapshot};
use crate::transport::{Encoder, Transport};
use crate::trigger::WorkTrigger;
use crate::uploader::Uploader;
use event_store::{EventStore, SqliteEventStore, StoreError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use transport_types::{Clock, DeliveryKey, EventId, EventRecord, Priority, UptimeClock, WallClock};

/// Builder for [`TransportRuntime`].
pub struct TransportRuntimeBuilder {
    config: SchedulerConfig,
    store: Option<Arc<dyn EventStore>>,
    database_path: Option<PathBuf>,
    registry: Option<Arc<dyn BackendRegistry>>,
    trigger: Option<Arc<dyn WorkTrigger>>,
    event_clock: Arc<dyn Clock>,
    uptime_clock: Arc<dyn Clock>,
}

impl TransportRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
            store: None,
            database_path: None,
            registry: None,
            trigger: None,
            event_clock: Arc::new(WallClock),
            uptime_clock: Arc::new(UptimeClock::new()),
        }
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an already opened store. Its own capacity limit applies.
    pub fn store(mut self, store: Arc<dyn EventStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Open a SQLite store at `path` using the config's capacity limit.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn registry(mut self, registry: Arc<dyn BackendRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn trigger(mut self, trigger: Arc<dyn WorkTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Clock stamped into `event_time_millis`.
    pub fn event_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.event_clock = clock;
        self
    }

    /// Monotonic clock used for `uptime_millis` and all scheduling decisions.
    pub fn uptime_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.uptime_clock = clock;
        self
    }

    pub fn build(self) -> DeliveryResult<Arc<TransportRuntime>> {
        self.config.validate()?;

        let store: Arc<dyn EventStore> = match (self.store, self.database_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(SqliteEventStore::open(path, self.config.store_config())?),
            (None, None) => {
                return Err(DeliveryError::Config(
                    "an event store or database path is required".to_string(),
                ))
            }
        };
        let registry = self
            .registry
            .ok_or_else(|| DeliveryError::Config("a backend registry is required".to_string()))?;
        let trigger = self
            .trigger
            .ok_or_else(|| DeliveryError::Config("a work trigger is required".to_string()))?;

        let stats = Arc::new(DeliveryStats::default());
        let uploader = Uploader::new(
            store.clone(),
            registry,
            self.config.max_batch_size,
            self.config.max_attempts_before_discard,
            stats.clone(),
        );
        let scheduler = Scheduler::new(
            &self.config,
            store.clone(),
            uploader,
            trigger,
            self.uptime_clock.clone(),
        );

        Ok(Arc::new(TransportRuntime {
            config: self.config,
            store,
            scheduler,
            event_clock: self.event_clock,
            uptime_clock: self.uptime_clock,
            stats,
            accepting: AtomicBool::new(true),
        }))
    }
}

/// Accepts events from senders and delivers them in the background.
///
/// Enqueue is fire-and-forget: the caller learns whether the event was
/// stored, never whether it was delivered.
pub struct TransportRuntime {
    config: SchedulerConfig,
    store: Arc<dyn EventStore>,
    scheduler: Scheduler,
    event_clock: Arc<dyn Clock>,
    uptime_clock: Arc<dyn Clock>,
    stats: Arc<DeliveryStats>,
    accepting: AtomicBool,
}

impl TransportRuntime {
    pub fn builder() -> TransportRuntimeBuilder {
        TransportRuntimeBuilder::new()
    }

    /// Store an event for `destination` and make sure a delivery attempt is
    /// scheduled.
    ///
    /// `encode` runs synchronously on the caller's thread; payloads are opaque
    /// to the runtime.
    pub fn enqueue<F>(
        &self,
        destination: &str,
        transport_name: &str,
        priority: Priority,
        encode: F,
    ) -> Result<EventId, TransportError>
    where
        F: FnOnce() -> Vec<u8>,
    {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::ShutDown);
        }

        let record = EventRecord::new(
            destination,
            transport_name,
            priority,
            self.event_clock.now_millis(),
            self.uptime_clock.now_millis(),
            encode(),
        );
        let id = match self.store.enqueue(&record) {
            Ok(id) => id,
            Err(e) => {
                if let StoreError::CapacityExceeded { limit, .. } = &e {
                    warn!(destination, limit, "Destination at capacity, rejecting event");
                } else {
                    warn!(destination, error = %e, "Failed to store event");
                }
                return Err(e.into());
            }
        };
        self.stats.record_enqueued();
        self.scheduler.on_event_enqueued(&record.key());
        Ok(id)
    }

    /// A typed sender bound to one destination and transport name.
    pub fn transport<T>(
        self: &Arc<Self>,
        destination: impl Into<String>,
        name: impl Into<String>,
        encoder: impl Fn(&T) -> Vec<u8> + Send + Sync + 'static,
    ) -> Transport<T> {
        let encoder: Encoder<T> = Arc::new(encoder);
        Transport::new(self.clone(), destination.into(), name.into(), encoder)
    }

    /// Entry point for the host trigger.
    pub async fn run_scheduled_work(&self) -> RunSummary {
        self.scheduler.run_scheduled_work().await
    }

    /// Arm every pair that still has stored records, typically after a restart.
    pub fn recover(&self) -> DeliveryResult<usize> {
        let keys = self.store.pending_keys()?;
        for key in &keys {
            self.scheduler.on_event_enqueued(key);
        }
        if !keys.is_empty() {
            info!(pairs = keys.len(), "Recovered pending delivery pairs");
        }
        Ok(keys.len())
    }

    /// Tell the runtime a backend for `destination` is now available.
    pub fn notify_backend_registered(&self, destination: &str) -> usize {
        self.scheduler.on_backend_registered(destination)
    }

    /// Stop accepting events and scheduling work. Stored records stay put
    /// and are picked up by [`recover`](Self::recover) on the next start.
    pub fn shutdown(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            self.scheduler.stop();
            info!("Transport runtime shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        !self.accepting.load(Ordering::SeqCst)
    }

    pub fn pending_counts(&self) -> DeliveryResult<Vec<(DeliveryKey, usize)>> {
        Ok(self.store.pending_counts()?)
    }

    pub fn pair_snapshot(&self, key: &DeliveryKey) -> Option<PairSnapshot> {
        self.scheduler.snapshot(key)
    }

    pub fn pair_snapshots(&self) -> Vec<(DeliveryKey, PairSnapshot)> {
        self.scheduler.snapshots()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn uptime_millis(&self) -> i64 {
        self.uptime_clock.now_millis()
    }
}
