//! Scenario tests for scheduling and delivery.
//!
//! - `harness.rs`      - mock backend, recording trigger, manual clocks
//! - `batching.rs`     - debounce, batch grouping, per-pair isolation
//! - `exclusion.rs`    - one attempt in flight per pair under concurrent load
//! - `retry.rs`        - transient failures, backoff growth, early host calls
//! - `discard.rs`      - invalid payloads and the attempt ceiling
//! - `decoration.rs`   - decorate once, reuse across retries
//! - `registration.rs` - missing backends under the fail and defer policies
//! - `lifecycle.rs`    - shutdown, restart recovery, typed transports

mod batching;
mod decoration;
