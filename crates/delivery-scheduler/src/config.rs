//! Scheduler configuration.

use crate::backoff::BackoffPolicy;
use crate::{DeliveryError, DeliveryResult};
use event_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// What an attempt does when the destination has no backend registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnregisteredBackendPolicy {
    /// Give up on this attempt without backoff. Records stay stored and the
    /// pair is attempted again only after the next enqueue.
    #[default]
    Fail,
    /// Park the pair until the host reports the backend as registered.
    Defer,
}

/// Scheduling, batching and retry options.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wait after the first enqueue of an idle pair before attempting delivery.
    pub debounce_delay_ms: u64,
    /// Maximum records read into one batch.
    pub max_batch_size: usize,
    /// Delay after the first failed attempt.
    pub backoff_base_ms: u64,
    /// Growth factor applied per additional consecutive failure.
    pub backoff_multiplier: f64,
    /// Cap on the retry delay.
    pub backoff_max_ms: u64,
    /// Failed attempts after which a record is discarded.
    pub max_attempts_before_discard: u32,
    /// Stored records per destination after which enqueue is rejected.
    pub max_stored_records_per_destination: usize,
    pub unregistered_backend: UnregisteredBackendPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_delay_ms: 500,
            max_batch_size: 50,
            backoff_base_ms: 30_000,
            backoff_multiplier: 2.0,
            backoff_max_ms: 3_600_000,
            max_attempts_before_discard: 10,
            max_stored_records_per_destination: 10_000,
            unregistered_backend: UnregisteredBackendPolicy::Fail,
        }
    }
}

impl SchedulerConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.backoff_base_ms,
            self.backoff_multiplier,
            self.backoff_max_ms,
        )
    }

    /// Store limits derived from this config.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_records_per_destination: Some(self.max_stored_records_per_destination),
        }
    }

    pub fn validate(&self) -> DeliveryResult<()> {
        if self.max_batch_size == 0 {
            return Err(DeliveryError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.backoff_base_ms == 0 {
            return Err(DeliveryError::Config(
                "backoff_base_ms must be greater than 0".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(DeliveryError::Config(format!(
                "backoff_multiplier must be a finite number >= 1 (got {})",
                self.backoff_multiplier
            )));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(DeliveryError::Config(format!(
                "backoff_max_ms ({}) is below backoff_base_ms ({})",
                self.backoff_max_ms, self.backoff_base_ms
            )));
        }
        if self.max_attempts_before_discard == 0 {
            return Err(DeliveryError::Config(
                "max_attempts_before_discard must be at least 1".to_string(),
            ));
        }
        if self.max_stored_records_per_destination == 0 {
            return Err(DeliveryError::Config(
                "max_stored_records_per_destination must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.debounce_delay_ms, 500);
        assert_eq!(config.max_batch_size, 50);
        assert_eq!(config.backoff_base_ms, 30_000);
        assert_eq!(config.backoff_max_ms, 3_600_000);
        assert_eq!(config.max_attempts_before_discard, 10);
        assert_eq!(config.unregistered_backend, UnregisteredBackendPolicy::Fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "debounce_delay_ms": 100, "unregistered_backend": "defer" }"#)
                .unwrap();
        assert_eq!(config.debounce_delay_ms, 100);
        assert_eq!(config.unregistered_backend, UnregisteredBackendPolicy::Defer);
        assert_eq!(config.max_batch_size, 50);
    }

    #[test]
    fn test_store_config_carries_limit() {
        let config = SchedulerConfig {
            max_stored_records_per_destination: 7,
            ..Default::default()
        };
        assert_eq!(config.store_config().max_records_per_destination, Some(7));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            SchedulerConfig {
                max_batch_size: 0,
                ..Default::default()
            },
            SchedulerConfig {
                backoff_base_ms: 0,
                ..Default::default()
            },
            SchedulerConfig {
                backoff_multiplier: 0.5,
                ..Default::default()
            },
            SchedulerConfig {
                backoff_multiplier: f64::NAN,
                ..Default::default()
            },
            SchedulerConfig {
                backoff_base_ms: 10_000,
                backoff_max_ms: 1_000,
                ..Default::default()
            },
            SchedulerConfig {
                max_attempts_before_discard: 0,
                ..Default::default()
            },
            SchedulerConfig {
                max_stored_records_per_destination: 0,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(DeliveryError::Config(_))),
                "expected {:?} to be rejected",
                config
            );
        }
    }
}
