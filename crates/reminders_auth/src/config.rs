//! Configuration for the authenticator.

use reminders_http::RetryConfig;

/// Identity provider base URL.
pub const AUTH_ENDPOINT: &str = "https://idmsa.apple.com/appleauth/auth";
/// Account setup service base URL.
pub const SETUP_ENDPOINT: &str = "https://setup.icloud.com/setup/ws/1";
/// Web front-end origin, used as OAuth redirect target.
pub const HOME_ENDPOINT: &str = "https://www.icloud.com";
/// Public client key of the web front-end.
pub const WIDGET_KEY: &str = "d39ba9916b7251055b22c7f910e2ea796ee65e98b2ddecea8f5dde8d9d1a815d";
/// Browser identity presented to the identity provider.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Configuration for sign-in.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Identity provider base URL.
    pub auth_endpoint: String,
    /// Account setup base URL.
    pub setup_endpoint: String,
    /// Web front-end origin.
    pub home_endpoint: String,
    /// Client key sent as `X-Apple-Widget-Key`.
    pub widget_key: String,
    /// User agent for handshake requests.
    pub user_agent: String,
    /// Retry policy for every request the authenticator makes.
    pub retry: RetryConfig,
}

impl AuthConfig {
    /// Creates the production configuration.
    pub fn new() -> Self {
        Self {
            auth_endpoint: AUTH_ENDPOINT.to_string(),
            setup_endpoint: SETUP_ENDPOINT.to_string(),
            home_endpoint: HOME_ENDPOINT.to_string(),
            widget_key: WIDGET_KEY.to_string(),
            user_agent: USER_AGENT.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the identity provider base URL.
    pub fn with_auth_endpoint(mut self, url: impl Into<String>) -> Self {
        self.auth_endpoint = url.into();
        self
    }

    /// Sets the account setup base URL.
    pub fn with_setup_endpoint(mut self, url: impl Into<String>) -> Self {
        self.setup_endpoint = url.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let config = AuthConfig::new()
            .with_auth_endpoint("https://auth.test")
            .with_setup_endpoint("https://setup.test")
            .with_retry(RetryConfig::no_retry());
        assert_eq!(config.auth_endpoint, "https://auth.test");
        assert_eq!(config.setup_endpoint, "https://setup.test");
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.widget_key, WIDGET_KEY);
    }
}
