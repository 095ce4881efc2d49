//! Error types for the HTTP layer.

use thiserror::Error;

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Longest response body kept in a status error.
pub const MAX_ERROR_BODY: usize = 500;

/// Returns true for statuses worth retrying: 429, 500, 502, 503, 504.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Errors that can occur while sending a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("request failed: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// A request body could not be serialized.
    #[error("failed to encode request: {message}")]
    Encode {
        /// Description of the failure.
        message: String,
    },

    /// A response body could not be parsed.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Description of the failure.
        message: String,
    },

    /// A URL could not be parsed.
    #[error("invalid URL '{url}'")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },
}

impl HttpError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a status error, truncating the body.
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: truncate(body, MAX_ERROR_BODY),
        }
    }

    /// Create an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Status code, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
