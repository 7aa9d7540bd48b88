use async_trait::async_trait;
use delivery_scheduler::{BackendCapability, TransmitOutcome};
use tracing::{debug, info};
use transport_types::EventRecord;

/// Backend that writes batches to the log instead of the network.
pub struct LogBackend {
    destination: String,
}

impl LogBackend {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl BackendCapability for LogBackend {
    async fn transmit(&self, batch: &[EventRecord]) -> TransmitOutcome {
        let bytes: usize = batch.iter().map(|record| record.payload().len()).sum();
        for record in batch {
            debug!(
                destination = %self.destination,
                transport = %record.transport_name(),
                priority = %record.priority(),
                event_time_ms = record.event_time_millis(),
                payload = %String::from_utf8_lossy(record.payload()),
                "Event"
            );
        }
        info!(
            destination = %self.destination,
            batch_size = batch.len(),
            bytes,
            "Batch written to log"
        );
        TransmitOutcome::Ok
    }
}
