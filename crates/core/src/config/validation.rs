//! Configuration validation rules.
//!
//! Checks `AppConfig` values after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// Largest accepted UTC offset magnitude (±18:00), in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `delay_min_ms` is greater than `delay_max_ms`
    /// - `utc_offset_minutes` is outside ±18 hours
    /// - `summarize_max_attempts` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::Invalid {
                field: "delay_min_ms".into(),
                reason: format!("must not exceed delay_max_ms ({})", self.delay_max_ms),
            });
        }

        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::Invalid {
                field: "utc_offset_minutes".into(),
                reason: "must be within ±1080 minutes".into(),
            });
        }

        if self.summarize_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "summarize_max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.delay_max_ms == 0 {
            tracing::warn!("delay_max_ms is 0; product pages will be fetched back to back");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_inverted_delay_range() {
        let config = AppConfig { delay_min_ms: 6_000, delay_max_ms: 5_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "delay_min_ms"));
    }

    #[test]
    fn test_validate_zero_delay_allowed() {
        let config = AppConfig { delay_min_ms: 0, delay_max_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_utc_offset() {
        let config = AppConfig { utc_offset_minutes: -300, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = AppConfig { utc_offset_minutes: 19 * 60, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "utc_offset_minutes"));
    }

    #[test]
    fn test_validate_summarize_attempts() {
        let config = AppConfig { summarize_max_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "summarize_max_attempts"));
    }
}
