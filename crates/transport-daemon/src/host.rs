//! Tokio host for the scheduler's work trigger.
//!
//! The scheduler asks for work through [`ChannelTrigger`]; a background
//! task keeps the earliest requested deadline, sleeps until it, and then
//! calls `run_scheduled_work`. Requests that arrive while it sleeps can
//! only pull the deadline earlier. Pairs that turn out not to be due yet
//! re-request for their remaining delay, so no deadline is lost when
//! several are coalesced.

use delivery_scheduler::{TransportRuntime, TriggerRequest, WorkTrigger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// [`WorkTrigger`] that forwards requests to the host loop.
pub struct ChannelTrigger {
    sender: mpsc::UnboundedSender<TriggerRequest>,
}

impl WorkTrigger for ChannelTrigger {
    fn request_run(&self, request: TriggerRequest) {
        if self.sender.send(request).is_err() {
            debug!("Host loop stopped, dropping trigger request");
        }
    }
}

/// Trigger plus the receiver to hand to [`HostLoop::spawn`].
pub fn trigger_channel() -> (Arc<ChannelTrigger>, mpsc::UnboundedReceiver<TriggerRequest>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Arc::new(ChannelTrigger { sender }), receiver)
}

/// Handle to the running host loop.
pub struct HostLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HostLoop {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(
        runtime: Arc<TransportRuntime>,
        receiver: mpsc::UnboundedReceiver<TriggerRequest>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(runtime, receiver, shutdown_rx));
        Self { shutdown, handle }
    }

    /// Stop the loop and wait for it to exit. Runs already started are not
    /// awaited.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

async fn run_loop(
    runtime: Arc<TransportRuntime>,
    mut receiver: mpsc::UnboundedReceiver<TriggerRequest>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let wake_at = deadline;
        let sleep = async move {
            match wake_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            request = receiver.recv() => {
                let Some(request) = request else { break };
                let at = Instant::now() + Duration::from_millis(request.delay_ms);
                deadline = Some(deadline.map_or(at, |current| current.min(at)));
                debug!(key = %request.key, delay_ms = request.delay_ms, "Trigger requested");
            }
            _ = sleep => {
                deadline = None;
                let runtime = runtime.clone();
                tokio::spawn(async move {
                    let summary = runtime.run_scheduled_work().await;
                    debug!(
                        attempted = summary.attempted(),
                        waiting = summary.waiting,
                        "Scheduled work finished"
                    );
                });
            }
        }
    }

    info!("Host loop stopped");
}
