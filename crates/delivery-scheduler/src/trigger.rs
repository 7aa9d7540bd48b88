//! Host work-trigger boundary.

use transport_types::DeliveryKey;

/// A request to call `run_scheduled_work` after `delay_ms` of uptime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub key: DeliveryKey,
    pub delay_ms: u64,
}

/// Provided by the host environment.
///
/// Implementations may run work late or coalesce requests, but must
/// eventually run it. They must not call back into the scheduler from
/// inside `request_run`.
pub trait WorkTrigger: Send + Sync {
    fn request_run(&self, request: TriggerRequest);
}
