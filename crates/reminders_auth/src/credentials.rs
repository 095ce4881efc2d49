//! Credential seam.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{AuthError, AuthResult};

/// Account name and password. The password is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies what a full sign-in needs from the user.
///
/// Both methods are called lazily, only when a persisted session cannot be
/// reused.
pub trait CredentialProvider {
    /// Account name and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Credentials`] if they cannot be obtained.
    fn credentials(&self) -> AuthResult<Credentials>;

    /// The one-time code shown on a trusted device.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Credentials`] if no code can be obtained.
    fn two_factor_code(&self) -> AuthResult<String>;
}

/// Fixed credentials and code.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
    code: Option<String>,
}

impl StaticCredentials {
    /// Provides `username` and `password` and no one-time code.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
            code: None,
        }
    }

    /// Sets the one-time code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> AuthResult<Credentials> {
        Ok(self.credentials.clone())
    }

    fn two_factor_code(&self) -> AuthResult<String> {
        self.code
            .clone()
            .ok_or_else(|| AuthError::credentials("no two-factor code available"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("me@example.com"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(creds.password(), "hunter2");
    }

    #[test]
    fn static_provider() {
        let provider = StaticCredentials::new("a", "b");
        assert_eq!(provider.credentials().unwrap().username, "a");
        assert!(provider.two_factor_code().is_err());
        assert_eq!(provider.with_code("123456").two_factor_code().unwrap(), "123456");
    }
}
