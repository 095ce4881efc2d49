//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while converting user input into protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A date was not in `YYYY-MM-DD` form.
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// A priority label was not one of high, medium, low, none.
    #[error("invalid priority '{value}': expected high, medium, low or none")]
    InvalidPriority {
        /// The rejected input.
        value: String,
    },
}

impl ProtocolError {
    /// Create an invalid date error.
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Create an invalid priority error.
    pub fn invalid_priority(value: impl Into<String>) -> Self {
        Self::InvalidPriority {
            value: value.into(),
        }
    }
}
