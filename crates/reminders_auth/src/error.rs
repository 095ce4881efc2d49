//! Error types for authentication.

use reminders_http::HttpError;
use reminders_storage::StorageError;
use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while establishing a session.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider rejected the account name or password (403).
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The identity provider refused the sign-in (401).
    #[error("unauthorized - check credentials")]
    Unauthorized,

    /// The account must accept updated terms in a browser first (412).
    #[error("privacy acknowledgment required - visit https://appleid.apple.com")]
    AcknowledgementRequired,

    /// The one-time code was not accepted.
    #[error("2FA verification failed: HTTP {status}")]
    TwoFactorRejected {
        /// Response status.
        status: u16,
    },

    /// A handshake step answered with a status it does not allow.
    #[error("{step} failed: HTTP {status}: {body}")]
    UnexpectedStatus {
        /// Name of the handshake step.
        step: &'static str,
        /// Response status.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// A response lacked a field the flow depends on.
    #[error("{step} response missing {field}")]
    MissingField {
        /// Name of the handshake step.
        step: &'static str,
        /// The absent field.
        field: &'static str,
    },

    /// The SRP exchange could not be completed.
    #[error("SRP error: {0}")]
    Srp(String),

    /// Credentials or the one-time code could not be obtained.
    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The session file could not be read or written.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Create an unexpected-status error, truncating the body.
    pub fn unexpected_status(step: &'static str, status: u16, body: &str) -> Self {
        let body = match HttpError::status(status, body) {
            HttpError::Status { body, .. } => body,
            _ => String::new(),
        };
        Self::UnexpectedStatus { step, status, body }
    }

    /// Create an SRP error.
    pub fn srp(message: impl Into<String>) -> Self {
        Self::Srp(message.into())
    }

    /// Create a credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Returns true for errors caused by what the user supplied.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::Unauthorized
                | Self::AcknowledgementRequired
                | Self::TwoFactorRejected { .. }
        )
    }
}
