//! Integration tests for the transport daemon.
//!
//! - `harness.rs`       - stub HTTP collector on a local TCP port
//! - `http_delivery.rs` - HTTP backend against the stub, end to end through the daemon
//! - `host_loop.rs`     - trigger channel and deadline handling
