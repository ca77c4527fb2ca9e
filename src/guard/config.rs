//! Call guard configuration.

use crate::core::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a call guard.
///
/// Immutable once the guard is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Maximum time to wait for the wrapped call.
    pub call_timeout: Duration,

    /// Consecutive failures required to open the guard.
    pub failure_threshold: u32,

    /// How long the guard stays open before admitting a trial call.
    pub reset_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl GuardConfig {
    /// Creates a configuration from its three parameters.
    pub fn new(call_timeout: Duration, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            call_timeout,
            failure_threshold,
            reset_timeout,
        }
    }

    /// Sets the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the reset timeout.
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    /// Checks the configuration for the guard called `name`.
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::InvalidThreshold { name: name.into() });
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: name.into(),
                field: "call_timeout",
            });
        }
        if self.reset_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: name.into(),
                field: "reset_timeout",
            });
        }
        Ok(())
    }
}

/// Serializable form of [`GuardConfig`], with durations in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardSettings {
    /// Call timeout in milliseconds.
    pub call_timeout_ms: u64,
    /// Consecutive failures required to open.
    pub failure_threshold: u32,
    /// Reset window in milliseconds.
    pub reset_timeout_ms: u64,
}

impl From<GuardSettings> for GuardConfig {
    fn from(settings: GuardSettings) -> Self {
        Self {
            call_timeout: Duration::from_millis(settings.call_timeout_ms),
            failure_threshold: settings.failure_threshold,
            reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
        }
    }
}

impl From<&GuardConfig> for GuardSettings {
    fn from(config: &GuardConfig) -> Self {
        Self {
            call_timeout_ms: saturating_millis(config.call_timeout),
            failure_threshold: config.failure_threshold,
            reset_timeout_ms: saturating_millis(config.reset_timeout),
        }
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_timeout, Duration::from_secs(30));
        assert!(config.validate("default").is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = GuardConfig::default()
            .with_call_timeout(Duration::from_millis(5000))
            .with_failure_threshold(3)
            .with_reset_timeout(Duration::from_millis(1000));

        assert_eq!(
            config,
            GuardConfig::new(Duration::from_secs(5), 3, Duration::from_secs(1))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GuardConfig::default();
        assert!(matches!(config.validate("  "), Err(ConfigError::EmptyName)));

        let config = GuardConfig::default().with_failure_threshold(0);
        assert!(matches!(
            config.validate("push"),
            Err(ConfigError::InvalidThreshold { .. })
        ));

        let config = GuardConfig::default().with_call_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate("push"),
            Err(ConfigError::ZeroDuration { field: "call_timeout", .. })
        ));

        let config = GuardConfig::default().with_reset_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate("push"),
            Err(ConfigError::ZeroDuration { field: "reset_timeout", .. })
        ));
    }

    #[test]
    fn test_settings_conversion() {
        let settings: GuardSettings = serde_json::from_str(
            r#"{"call_timeout_ms": 5000, "failure_threshold": 3, "reset_timeout_ms": 1000}"#,
        )
        .unwrap();

        let config = GuardConfig::from(settings);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.reset_timeout, Duration::from_secs(1));
        assert_eq!(GuardSettings::from(&config), settings);
    }

    #[test]
    fn test_settings_saturate_huge_durations() {
        let config = GuardConfig::new(Duration::MAX, 1, Duration::from_secs(u64::MAX));
        let settings = GuardSettings::from(&config);

        assert_eq!(settings.call_timeout_ms, u64::MAX);
        assert_eq!(settings.reset_timeout_ms, u64::MAX);
        assert_eq!(settings.failure_threshold, 1);
    }
}
