//! # Delivery Scheduler
//!
//! Takes events that senders enqueue and gets them to their backends:
//! batched per (destination, priority) pair, debounced after the first
//! enqueue, retried with exponential backoff, and discarded once they hit
//! the attempt ceiling.
//!
//! ## Architecture
//!
//! ```text
//! Transport<T>::send ──▶ TransportRuntime::enqueue ──▶ EventStore
//!                                │
//!                                ▼
//!                     Scheduler (per-pair state) ──▶ WorkTrigger (host)
//!                                ▲                         │
//!                                │                         ▼
//!                     Uploader ◀─┴──── run_scheduled_work ◀┘
//!                        │
//!                        ▼
//!                 BackendCapability::transmit
//! ```
//!
//! The host owns time: it receives [`TriggerRequest`]s and calls
//! [`TransportRuntime::run_scheduled_work`] once the requested delay has
//! passed. Nothing here sleeps; store I/O on the delivery path runs on
//! tokio's blocking pool, so `run_scheduled_work` must be polled inside a
//! tokio runtime.

mod backend;
mod backoff;
mod blocking;
mod config;
mod error;
mod runtime;
mod scheduler;
mod stats;
mod transport;
mod trigger;
mod uploader;

#[cfg(test)]
mod tests;

pub use backend::{BackendCapability, BackendRegistry, InMemoryBackendRegistry, TransmitOutcome};
pub use backoff::BackoffPolicy;
pub use config::{SchedulerConfig, UnregisteredBackendPolicy};
pub use error::{DeliveryError, DeliveryFault, DeliveryResult, TransportError};
pub use runtime::{TransportRuntime, TransportRuntimeBuilder};
pub use scheduler::{PairPhase, PairSnapshot, RunSummary, Scheduler};
pub use stats::{DeliveryStats, StatsSnapshot};
pub use transport::{Encoder, Event, Transport};
pub use trigger::{TriggerRequest, WorkTrigger};
pub use uploader::{AttemptReport, Uploader};
