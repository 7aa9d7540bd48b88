//! Core types shared by the transport runtime crates.
//!
//! - [`EventRecord`]: the immutable unit of work persisted by the event store
//! - [`Priority`] and [`DeliveryKey`]: the (destination, priority) pair that
//!   batching and backoff are scoped to
//! - [`Clock`]: injectable time sources (wall time for event timestamps,
//!   monotonic uptime for scheduling)

mod clock;
mod error;
mod key;
mod record;

pub use clock::{Clock, ManualClock, UptimeClock, WallClock};
pub use error::{TypesError, TypesResult};
pub use key::{DeliveryKey, EventId, Priority};
pub use record::{EventRecord, Metadata};
