//! Configuration for the primitives.
//!
//! Every section has a `Default` matching the built-in behavior, and every
//! field is optional when deserializing, so a partial document works:
//!
//! ```rust,ignore
//! let config = TrellisConfig::from_json(r#"{ "history": { "capacity": 200 } }"#)?;
//! assert_eq!(config.debounce.delay_ms, 300);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrellisError};

/// Default number of entries a history log retains.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Default debounce quiescence delay in milliseconds.
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 300;

/// Settings for [`History`](crate::primitives::History).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of retained entries, the current one included.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Settings for [`Debounced`](crate::primitives::Debounced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// How long the input must stay unchanged before it reaches the output.
    pub delay_ms: u64,
}

impl DebounceConfig {
    /// The delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
        }
    }
}

/// All primitive settings in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    /// Settings for [`History`](crate::primitives::History). The `"history"` key.
    pub history: HistoryConfig,
    /// Settings for [`Debounced`](crate::primitives::Debounced). The `"debounce"` key.
    pub debounce: DebounceConfig,
}

impl TrellisConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no primitive can honor.
    pub fn validate(&self) -> Result<()> {
        if self.history.capacity == 0 {
            return Err(TrellisError::invalid_config(
                "history.capacity must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TrellisConfig::default();
        assert_eq!(config.history.capacity, 50);
        assert_eq!(config.debounce.delay(), Duration::from_millis(300));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = TrellisConfig::from_json(r#"{ "debounce": { "delay_ms": 25 } }"#).unwrap();
        assert_eq!(config.debounce.delay_ms, 25);
        assert_eq!(config.history, HistoryConfig::default());
    }

    #[test]
    fn sections_serialize_under_their_documented_keys() {
        let value = serde_json::to_value(TrellisConfig::default()).unwrap();
        assert_eq!(value["history"]["capacity"], 50);
        assert_eq!(value["debounce"]["delay_ms"], 300);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = TrellisConfig::from_json(r#"{ "history": { "capacity": 0 } }"#).unwrap_err();
        assert!(matches!(err, TrellisError::InvalidConfig { .. }));
    }

    #[test]
    fn malformed_document_is_a_serialization_error() {
        let err = TrellisConfig::from_json("{ history: ").unwrap_err();
        assert!(matches!(err, TrellisError::Serialization(_)));
    }
}
