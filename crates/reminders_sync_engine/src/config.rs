//! Configuration for the sync engine.

use reminders_http::RetryConfig;
use reminders_protocol::cloudkit::{CONTAINER, DESIRED_KEYS, ENVIRONMENT, ZONE_NAME};

/// Configuration for record transport and sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Container identifier.
    pub container: String,
    /// Container environment.
    pub environment: String,
    /// Zone holding lists and reminders.
    pub zone_name: String,
    /// Fields requested on every change fetch.
    pub desired_keys: Vec<String>,
    /// Retry configuration for database calls.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates the production configuration.
    pub fn new() -> Self {
        Self {
            container: CONTAINER.to_string(),
            environment: ENVIRONMENT.to_string(),
            zone_name: ZONE_NAME.to_string(),
            desired_keys: DESIRED_KEYS.iter().map(|k| k.to_string()).collect(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the container identifier.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Sets the container environment.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the zone name.
    pub fn with_zone_name(mut self, zone_name: impl Into<String>) -> Self {
        self.zone_name = zone_name.into();
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_reminders_zone() {
        let config = SyncConfig::default();
        assert_eq!(config.container, "com.apple.reminders");
        assert_eq!(config.environment, "production");
        assert_eq!(config.zone_name, "Reminders");
        assert_eq!(config.desired_keys.len(), 10);
        assert!(config.desired_keys.iter().any(|k| k == "TitleDocument"));
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new()
            .with_zone_name("Other")
            .with_environment("development")
            .with_retry(RetryConfig::no_retry());
        assert_eq!(config.zone_name, "Other");
        assert_eq!(config.environment, "development");
        assert_eq!(config.retry.max_attempts, 1);
    }
}
