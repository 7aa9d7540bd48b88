//! HTTP backend.
//!
//! Each batch is one POST with a JSON body:
//!
//! ```json
//! {
//!   "batchId": "9b1d…",
//!   "destination": "metrics",
//!   "events": [
//!     {
//!       "transport": "clicks",
//!       "priority": "default",
//!       "eventTimeMillis": 1700000000000,
//!       "uptimeMillis": 5123,
//!       "attemptCount": 0,
//!       "metadata": { "sdk": "transport-daemon/0.1.0" },
//!       "payload": "aGVsbG8="
//!     }
//!   ]
//! }
//! ```
//!
//! Response classification: 2xx is success, 400/413/422 mean the batch can
//! never be accepted, everything else (including connection errors and
//! timeouts) is retried.

use crate::DaemonResult;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use delivery_scheduler::{BackendCapability, TransmitOutcome};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use transport_types::{EventRecord, Metadata};
use uuid::Uuid;

/// Metadata key identifying the sending client.
pub const SDK_METADATA_KEY: &str = "sdk";

const SDK_VERSION: &str = concat!("transport-daemon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequest<'a> {
    batch_id: String,
    destination: &'a str,
    events: Vec<EventPayload<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventPayload<'a> {
    transport: &'a str,
    priority: &'static str,
    event_time_millis: i64,
    uptime_millis: i64,
    attempt_count: u32,
    metadata: &'a Metadata,
    payload: String,
}

pub struct HttpBackend {
    destination: String,
    url: String,
    auth_token: Option<String>,
    client: Client,
}

impl HttpBackend {
    pub fn new(
        destination: &str,
        url: &str,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> DaemonResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            destination: destination.to_string(),
            url: url.to_string(),
            auth_token,
            client,
        })
    }

    fn request_body<'a>(&'a self, batch: &'a [EventRecord]) -> BatchRequest<'a> {
        BatchRequest {
            batch_id: Uuid::new_v4().to_string(),
            destination: &self.destination,
            events: batch
                .iter()
                .map(|record| EventPayload {
                    transport: record.transport_name(),
                    priority: record.priority().as_str(),
                    event_time_millis: record.event_time_millis(),
                    uptime_millis: record.uptime_millis(),
                    attempt_count: record.attempt_count(),
                    metadata: record.metadata(),
                    payload: STANDARD.encode(record.payload()),
                })
                .collect(),
        }
    }
}

/// Map an HTTP status to a transmit outcome.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> TransmitOutcome {
    if status.is_success() {
        return TransmitOutcome::Ok;
    }
    let reason = if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    };
    match status {
        StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNPROCESSABLE_ENTITY => {
            TransmitOutcome::InvalidPayload(reason)
        }
        _ => TransmitOutcome::TransientFailure(reason),
    }
}

#[async_trait]
impl BackendCapability for HttpBackend {
    fn decorate(&self, record: EventRecord) -> EventRecord {
        record.with_metadata(SDK_METADATA_KEY, SDK_VERSION)
    }

    async fn transmit(&self, batch: &[EventRecord]) -> TransmitOutcome {
        let body = self.request_body(batch);
        debug!(
            url = %self.url,
            batch_id = %body.batch_id,
            events = body.events.len(),
            "Posting batch"
        );

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return TransmitOutcome::TransientFailure(e.to_string()),
        };

        let status = response.status();
        if status.is_success() {
            return TransmitOutcome::Ok;
        }
        let text = response.text().await.unwrap_or_default();
        classify_status(status, text.trim())
    }
}
