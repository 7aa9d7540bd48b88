//! Wires config, store, backends and the host loop into a running daemon.

use crate::backends::build_registry;
use crate::host::{trigger_channel, HostLoop};
use crate::{DaemonConfig, DaemonResult, Paths};
use delivery_scheduler::{BackendCapability, InMemoryBackendRegistry, TransportRuntime};
use event_store::EventStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use transport_types::{DeliveryKey, EventId, Priority};

pub struct Daemon {
    runtime: Arc<TransportRuntime>,
    registry: Arc<InMemoryBackendRegistry>,
    host: HostLoop,
}

impl Daemon {
    /// Open the store, register configured backends, start the host loop
    /// and re-arm anything left over from a previous run.
    ///
    /// Opening the database and scanning it for leftovers run on the
    /// blocking pool.
    pub async fn start(config: &DaemonConfig, paths: &Paths) -> DaemonResult<Self> {
        config.validate()?;
        paths.ensure_dirs()?;

        let registry = build_registry(&config.backends)?;
        let (trigger, receiver) = trigger_channel();
        let database_path = config.database_path(paths);

        let builder = TransportRuntime::builder()
            .config(config.scheduler.clone())
            .database_path(&database_path)
            .registry(registry.clone())
            .trigger(trigger);
        let runtime = tokio::task::spawn_blocking(move || builder.build()).await??;
        let host = HostLoop::spawn(runtime.clone(), receiver);

        let recovering = runtime.clone();
        let recovered = tokio::task::spawn_blocking(move || recovering.recover()).await??;
        info!(
            database = %database_path.display(),
            backends = config.backends.len(),
            recovered_pairs = recovered,
            "Transport daemon started"
        );

        Ok(Self {
            runtime,
            registry,
            host,
        })
    }

    pub fn runtime(&self) -> &Arc<TransportRuntime> {
        &self.runtime
    }

    /// Store one event without blocking the calling task.
    pub async fn enqueue(
        &self,
        destination: &str,
        transport: &str,
        priority: Priority,
        payload: Vec<u8>,
    ) -> DaemonResult<EventId> {
        enqueue_blocking(self.runtime.clone(), destination, transport, priority, payload).await
    }

    /// Register a backend after startup and wake any pairs waiting on it.
    pub fn register_backend(&self, destination: &str, backend: Arc<dyn BackendCapability>) {
        self.registry.register(destination, backend);
        self.runtime.notify_backend_registered(destination);
    }

    /// Poll until `key` has nothing stored, or `timeout` passes.
    ///
    /// Returns whether the pair drained.
    pub async fn wait_until_drained(&self, key: &DeliveryKey, timeout: Duration) -> DaemonResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let runtime = self.runtime.clone();
            let pending = key.clone();
            if !tokio::task::spawn_blocking(move || runtime.store().has_pending(&pending)).await?? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Stop accepting events and stop the host loop. Stored events stay for
    /// the next start.
    pub async fn shutdown(self) {
        self.runtime.shutdown();
        self.host.stop().await;
        let stats = self.runtime.stats();
        info!(
            delivered = stats.delivered,
            dropped_invalid = stats.dropped_invalid,
            discarded = stats.discarded,
            transient_failures = stats.transient_failures,
            "Transport daemon stopped"
        );
    }
}

/// Run [`TransportRuntime::enqueue`] on the blocking pool.
pub async fn enqueue_blocking(
    runtime: Arc<TransportRuntime>,
    destination: &str,
    transport: &str,
    priority: Priority,
    payload: Vec<u8>,
) -> DaemonResult<EventId> {
    let destination = destination.to_string();
    let transport = transport.to_string();
    let id = tokio::task::spawn_blocking(move || {
        runtime.enqueue(&destination, &transport, priority, || payload)
    })
    .await??;
    Ok(id)
}
