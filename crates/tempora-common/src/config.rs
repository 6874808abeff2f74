//! Database configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_REOPEN_DELAY, DEFAULT_STORE_COUNT, MAX_STORE_COUNT};

/// Configuration for one TemporaDB database.
///
/// # Example
///
/// ```rust
/// use tempora_common::config::DbConfig;
///
/// let config = DbConfig::default();
/// assert_eq!(config.store_count, 64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Number of physical stores created at first open.
    ///
    /// Fixed at database-creation time; reopening an existing database uses
    /// the count persisted at creation. Default: 64.
    pub store_count: usize,

    /// Delay between reopen attempts after a lost connection.
    /// Default: 200ms
    #[serde(with = "humantime_serde")]
    pub reopen_delay: Duration,

    /// Use relaxed durability for write transactions.
    ///
    /// Writes may be acknowledged before they are fully flushed, trading
    /// durability for throughput. Time-series rows are typically
    /// re-derivable from their source, so this defaults to true.
    pub relaxed_durability: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            store_count: DEFAULT_STORE_COUNT,
            reopen_delay: DEFAULT_REOPEN_DELAY,
            relaxed_durability: true,
        }
    }
}

impl DbConfig {
    /// Creates a configuration with the given store count.
    #[must_use]
    pub fn with_store_count(store_count: usize) -> Self {
        Self {
            store_count,
            ..Default::default()
        }
    }

    /// Creates a minimal configuration for testing.
    ///
    /// Few stores, short reopen delay so reconnect tests stay fast.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            store_count: 4,
            reopen_delay: Duration::from_millis(25),
            relaxed_durability: true,
        }
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.store_count == 0 {
            return Err("store_count must be at least 1".to_string());
        }

        if self.store_count > MAX_STORE_COUNT {
            return Err(format!("store_count must be at most {MAX_STORE_COUNT}"));
        }

        if self.reopen_delay.is_zero() {
            return Err("reopen_delay must be non-zero".to_string());
        }

        Ok(())
    }
}

/// Serde helper for Duration using humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.store_count, DEFAULT_STORE_COUNT);
        assert_eq!(config.reopen_delay, DEFAULT_REOPEN_DELAY);
        assert!(config.relaxed_durability);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DbConfig::default();
        config.store_count = 0;
        assert!(config.validate().is_err());

        config.store_count = MAX_STORE_COUNT + 1;
        assert!(config.validate().is_err());

        config.store_count = 8;
        config.reopen_delay = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_testing_config() {
        let config = DbConfig::for_testing();
        assert!(config.validate().is_ok());
        assert!(config.reopen_delay < DEFAULT_REOPEN_DELAY);
    }
}
