//! Retry delay growth.

use serde::{Deserialize, Serialize};

/// Exponential backoff: `base * multiplier^failures`, capped at `max`.
///
/// No jitter: the same failure count always yields the same delay.
///
/// | Consecutive failures | Delay (base 30s, x2, max 1h) |
/// |----------------------|------------------------------|
/// | 0                    | 30s                          |
/// | 1                    | 60s                          |
/// | 2                    | 120s                         |
/// | 7+                   | 3600s (capped)               |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    pub base_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    pub fn new(base_ms: u64, multiplier: f64, max_ms: u64) -> Self {
        Self {
            base_ms,
            multiplier,
            max_ms,
        }
    }

    /// Delay before the next attempt, given how many attempts in a row have
    /// already failed before this one.
    pub fn delay_ms(&self, consecutive_failures: u32) -> u64 {
        let exponent = i32::try_from(consecutive_failures).unwrap_or(i32::MAX);
        let delay = self.base_ms as f64 * self.multiplier.powi(exponent);
        if !delay.is_finite() || delay >= self.max_ms as f64 {
            return self.max_ms;
        }
        (delay as u64).max(self.base_ms.min(self.max_ms))
    }
}
