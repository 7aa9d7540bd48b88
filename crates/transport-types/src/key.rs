//! Identifiers and scheduling keys.

use crate::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier generated by the event store for a persisted record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordinal scheduling class of an event.
///
/// Each priority of a destination has its own batch and its own backoff
/// timer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Default,
    VeryLow,
    Highest,
}

impl Priority {
    /// All priorities, in storage order.
    pub const ALL: [Priority; 3] = [Priority::Default, Priority::VeryLow, Priority::Highest];

    /// Stable integer encoding used by the store.
    pub fn to_i64(self) -> i64 {
        match self {
            Priority::Default => 0,
            Priority::VeryLow => 1,
            Priority::Highest => 2,
        }
    }

    /// Decodes the stored integer encoding.
    pub fn from_i64(value: i64) -> TypesResult<Self> {
        match value {
            0 => Ok(Priority::Default),
            1 => Ok(Priority::VeryLow),
            2 => Ok(Priority::Highest),
            other => Err(TypesError::UnknownPriority(other)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Default => "default",
            Priority::VeryLow => "very_low",
            Priority::Highest => "highest",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Priority::Default),
            "very_low" | "very-low" | "low" => Ok(Priority::VeryLow),
            "highest" | "high" => Ok(Priority::Highest),
            _ => Err(TypesError::UnknownPriorityName(s.to_string())),
        }
    }
}

/// The (destination, priority) pair that scheduling state is keyed by.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DeliveryKey {
    pub destination: String,
    pub priority: Priority,
}

impl DeliveryKey {
    pub fn new(destination: impl Into<String>, priority: Priority) -> Self {
        Self {
            destination: destination.into(),
            priority,
        }
    }
}

impl fmt::Display for DeliveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.destination, self.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_storage_encoding_is_stable() {
        for priority in Priority::ALL {
            assert_eq!(Priority::from_i64(priority.to_i64()).unwrap(), priority);
        }
        assert_eq!(Priority::Default.to_i64(), 0);
        assert_eq!(Priority::Highest.to_i64(), 2);
    }

    #[test]
    fn unknown_priority_is_rejected() {
        assert_eq!(
            Priority::from_i64(7),
            Err(TypesError::UnknownPriority(7))
        );
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_parses_aliases() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::Highest);
        assert_eq!("very-low".parse::<Priority>().unwrap(), Priority::VeryLow);
        assert_eq!("default".parse::<Priority>().unwrap(), Priority::Default);
    }

    #[test]
    fn delivery_key_display() {
        let key = DeliveryKey::new("d1", Priority::Highest);
        assert_eq!(key.to_string(), "d1/highest");
    }

    #[test]
    fn delivery_keys_differ_by_priority() {
        let a = DeliveryKey::new("d1", Priority::Default);
        let b = DeliveryKey::new("d1", Priority::Highest);
        assert_ne!(a, b);
    }
}
