//! Per-pair scheduling state machine.
//!
//! Each (destination, priority) pair moves through:
//!
//! ```text
//!            enqueue                 due + run              success, nothing left
//!   Idle ───────────────▶ Armed ───────────────▶ InFlight ─────────────────────────▶ Idle
//!    ▲                      ▲                       │
//!    │                      └───────────────────────┤ success with records left (debounce)
//!    │                      └───────────────────────┤ retryable failure (backoff)
//!    └──────────────────────────────────────────────┤ no backend, fail policy
//!                         Deferred ◀────────────────┘ no backend, defer policy
//! ```
//!
//! Every transition is a check-then-act under the pair's own lock, so at
//! most one attempt per pair is ever in flight and an enqueue arriving
//! mid-flight never arms a second attempt. Enqueues and backend
//! registrations that land while a pair is in flight are noted on the pair
//! and applied when the attempt completes.

use crate::backoff::BackoffPolicy;
use crate::blocking::run_store;
use crate::config::{SchedulerConfig, UnregisteredBackendPolicy};
use crate::trigger::{TriggerRequest, WorkTrigger};
use crate::error::DeliveryFault;
use crate::uploader::{AttemptReport, Uploader};
use event_store::EventStore;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use transport_types::{Clock, DeliveryKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairPhase {
    #[default]
    Idle,
    Armed,
    InFlight,
    /// Waiting for the destination's backend to be registered.
    Deferred,
}

#[derive(Debug, Default)]
struct PairState {
    phase: PairPhase,
    next_eligible_ms: i64,
    consecutive_failures: u32,
    enqueued_in_flight: bool,
    registered_in_flight: bool,
}

/// Read-only view of one pair's scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairSnapshot {
    pub phase: PairPhase,
    /// Uptime at which the pair may next be attempted. Meaningful while armed.
    pub next_eligible_ms: i64,
    pub consecutive_failures: u32,
}

/// Result of one `run_scheduled_work` call.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Attempts made, in no particular order.
    pub attempts: Vec<(DeliveryKey, AttemptReport)>,
    /// Armed pairs that were not yet due.
    pub waiting: usize,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.attempts.len()
    }

    pub fn report_for(&self, key: &DeliveryKey) -> Option<&AttemptReport> {
        self.attempts
            .iter()
            .find(|(attempted, _)| attempted == key)
            .map(|(_, report)| report)
    }
}

pub struct Scheduler {
    store: Arc<dyn EventStore>,
    uploader: Uploader,
    trigger: Arc<dyn WorkTrigger>,
    uptime: Arc<dyn Clock>,
    backoff: BackoffPolicy,
    debounce_delay_ms: u64,
    unregistered_policy: UnregisteredBackendPolicy,
    pairs: RwLock<HashMap<DeliveryKey, Arc<Mutex<PairState>>>>,
    stopped: AtomicBool,
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        store: Arc<dyn EventStore>,
        uploader: Uploader,
        trigger: Arc<dyn WorkTrigger>,
        uptime: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            uploader,
            trigger,
            uptime,
            backoff: config.backoff(),
            debounce_delay_ms: config.debounce_delay_ms,
            unregistered_policy: config.unregistered_backend,
            pairs: RwLock::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        }
    }

    fn pair(&self, key: &DeliveryKey) -> Arc<Mutex<PairState>> {
        if let Some(pair) = self.pairs.read().get(key) {
            return pair.clone();
        }
        self.pairs
            .write()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(PairState::default())))
            .clone()
    }

    /// Arm the pair and build the matching trigger request.
    ///
    /// The caller holds the pair lock and issues the request after releasing it.
    fn arm(&self, key: &DeliveryKey, state: &mut PairState, delay_ms: u64) -> TriggerRequest {
        let delay = i64::try_from(delay_ms).unwrap_or(i64::MAX);
        state.phase = PairPhase::Armed;
        state.next_eligible_ms = self.uptime.now_millis().saturating_add(delay);
        debug!(key = %key, delay_ms, next_eligible_ms = state.next_eligible_ms, "Pair armed");
        TriggerRequest {
            key: key.clone(),
            delay_ms,
        }
    }

    fn request(&self, request: Option<TriggerRequest>) {
        if let Some(request) = request {
            if !self.is_stopped() {
                self.trigger.request_run(request);
            }
        }
    }

    /// Called after a record for `key` has been durably stored.
    ///
    /// Arms an idle pair with the debounce delay. Armed, in-flight and
    /// deferred pairs are left alone.
    pub fn on_event_enqueued(&self, key: &DeliveryKey) {
        if self.is_stopped() {
            return;
        }
        let pair = self.pair(key);
        let request = {
            let mut state = pair.lock();
            match state.phase {
                PairPhase::Idle => Some(self.arm(key, &mut state, self.debounce_delay_ms)),
                PairPhase::InFlight => {
                    state.enqueued_in_flight = true;
                    None
                }
                PairPhase::Armed | PairPhase::Deferred => None,
            }
        };
        self.request(request);
    }

    /// Attempt delivery for every armed pair whose eligibility time has passed.
    ///
    /// Pairs armed for later get their trigger re-requested for the
    /// remaining delay. Attempts for different pairs run concurrently.
    pub async fn run_scheduled_work(&self) -> RunSummary {
        if self.is_stopped() {
            return RunSummary::default();
        }

        let now = self.uptime.now_millis();
        let pairs: Vec<(DeliveryKey, Arc<Mutex<PairState>>)> = self
            .pairs
            .read()
            .iter()
            .map(|(key, pair)| (key.clone(), pair.clone()))
            .collect();

        let mut due = Vec::new();
        let mut early = Vec::new();
        for (key, pair) in pairs {
            let mut state = pair.lock();
            if state.phase != PairPhase::Armed {
                continue;
            }
            if now >= state.next_eligible_ms {
                state.phase = PairPhase::InFlight;
                due.push(key);
            } else {
                let remaining = u64::try_from(state.next_eligible_ms - now).unwrap_or(0);
                early.push(TriggerRequest {
                    key,
                    delay_ms: remaining,
                });
            }
        }

        let waiting = early.len();
        for request in early {
            self.request(Some(request));
        }

        let attempts = join_all(due.into_iter().map(|key| async move {
            let report = self.uploader.attempt(&key).await;
            let pending = match report {
                AttemptReport::Retry { .. } | AttemptReport::Unregistered { .. } => None,
                _ => {
                    let key = key.clone();
                    Some(run_store(&self.store, move |store| store.has_pending(&key)).await)
                }
            };
            self.complete(&key, &report, pending);
            (key, report)
        }))
        .await;

        RunSummary { attempts, waiting }
    }

    /// Apply an attempt's outcome to the pair.
    ///
    /// `pending` is the store's answer to "anything left?", checked after
    /// the attempt for outcomes that settle the batch. An enqueue that
    /// landed after that check saw the pair in flight and set
    /// `enqueued_in_flight`, so the two together never miss a record.
    fn complete(
        &self,
        key: &DeliveryKey,
        report: &AttemptReport,
        pending: Option<Result<bool, DeliveryFault>>,
    ) {
        let pair = self.pair(key);
        let request = {
            let mut state = pair.lock();
            let enqueued = std::mem::take(&mut state.enqueued_in_flight);
            let registered = std::mem::take(&mut state.registered_in_flight);
            match report {
                AttemptReport::Retry { fault, .. } => {
                    let delay = self.backoff.delay_ms(state.consecutive_failures);
                    state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                    warn!(
                        key = %key,
                        fault = %fault,
                        consecutive_failures = state.consecutive_failures,
                        retry_in_ms = delay,
                        "Delivery attempt failed, backing off"
                    );
                    Some(self.arm(key, &mut state, delay))
                }
                AttemptReport::Unregistered { .. } if registered => {
                    info!(key = %key, "Backend registered during attempt, re-arming");
                    Some(self.arm(key, &mut state, self.debounce_delay_ms))
                }
                AttemptReport::Unregistered { .. } => match self.unregistered_policy {
                    // An enqueue during the attempt counts as the next enqueue.
                    UnregisteredBackendPolicy::Fail if enqueued => {
                        Some(self.arm(key, &mut state, self.debounce_delay_ms))
                    }
                    UnregisteredBackendPolicy::Fail => {
                        state.phase = PairPhase::Idle;
                        None
                    }
                    UnregisteredBackendPolicy::Defer => {
                        info!(key = %key, "Deferring pair until its backend is registered");
                        state.phase = PairPhase::Deferred;
                        None
                    }
                },
                AttemptReport::NothingPending
                | AttemptReport::Delivered { .. }
                | AttemptReport::Dropped { .. }
                | AttemptReport::Exhausted { .. } => {
                    state.consecutive_failures = 0;
                    match pending.unwrap_or(Ok(false)) {
                        Ok(true) => Some(self.arm(key, &mut state, self.debounce_delay_ms)),
                        Ok(false) if enqueued => {
                            Some(self.arm(key, &mut state, self.debounce_delay_ms))
                        }
                        Ok(false) => {
                            state.phase = PairPhase::Idle;
                            None
                        }
                        Err(e) => {
                            error!(key = %key, error = %e, "Failed to check for pending records");
                            let delay = self.backoff.delay_ms(0);
                            Some(self.arm(key, &mut state, delay))
                        }
                    }
                }
            }
        };
        self.request(request);
    }

    /// Re-arm deferred pairs for `destination` after its backend appeared.
    ///
    /// Pairs in flight are flagged instead and re-armed when their attempt
    /// completes, if it missed the backend. Returns how many deferred pairs
    /// were re-armed.
    pub fn on_backend_registered(&self, destination: &str) -> usize {
        let pairs: Vec<(DeliveryKey, Arc<Mutex<PairState>>)> = self
            .pairs
            .read()
            .iter()
            .filter(|(key, _)| key.destination == destination)
            .map(|(key, pair)| (key.clone(), pair.clone()))
            .collect();

        let mut rearmed = 0;
        for (key, pair) in pairs {
            let request = {
                let mut state = pair.lock();
                match state.phase {
                    PairPhase::Deferred => Some(self.arm(&key, &mut state, self.debounce_delay_ms)),
                    PairPhase::InFlight => {
                        state.registered_in_flight = true;
                        continue;
                    }
                    PairPhase::Idle | PairPhase::Armed => continue,
                }
            };
            self.request(request);
            rearmed += 1;
        }
        if rearmed > 0 {
            info!(destination, rearmed, "Backend registered, resuming deferred pairs");
        }
        rearmed
    }

    pub fn snapshot(&self, key: &DeliveryKey) -> Option<PairSnapshot> {
        let pair = self.pairs.read().get(key).cloned()?;
        let state = pair.lock();
        Some(PairSnapshot {
            phase: state.phase,
            next_eligible_ms: state.next_eligible_ms,
            consecutive_failures: state.consecutive_failures,
        })
    }

    /// Snapshots of every known pair, sorted by key.
    pub fn snapshots(&self) -> Vec<(DeliveryKey, PairSnapshot)> {
        let mut keys: Vec<DeliveryKey> = self.pairs.read().keys().cloned().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.snapshot(&key).map(|snapshot| (key, snapshot)))
            .collect()
    }

    /// Stop arming pairs and issuing trigger requests. In-flight attempts
    /// still finish and apply their outcome to the store.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
