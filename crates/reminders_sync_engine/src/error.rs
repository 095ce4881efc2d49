//! Error types for sync and write operations.

use reminders_codec::CodecError;
use reminders_http::HttpError;
use reminders_protocol::cloudkit::RecordFailure;
use reminders_protocol::ProtocolError;
use reminders_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Errors that can occur while talking to the record database or syncing.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network, HTTP status, or response decoding failure.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The account has no record zones.
    #[error("no record zones found for this account")]
    NoZones,

    /// The session does not know where the storage service lives.
    #[error("session has no storage service URL, run 'auth' first")]
    MissingSession,

    /// Cache persistence failed.
    #[error("save cache: {0}")]
    Storage(#[from] StorageError),

    /// A sync cycle is already running.
    #[error("sync already in progress")]
    AlreadySyncing,
}

impl SyncError {
    /// Returns true if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Errors that can occur while creating or changing reminders.
#[derive(Error, Debug)]
pub enum WriteError {
    /// No list with the requested name.
    #[error("list '{name}' not found")]
    ListNotFound {
        /// Requested list name.
        name: String,
    },

    /// No reminder matches the parent identifier.
    #[error("parent reminder '{id}' not found")]
    ParentNotFound {
        /// Requested parent identifier or prefix.
        id: String,
    },

    /// No reminder matches the identifier.
    #[error("reminder '{id}' not found")]
    ReminderNotFound {
        /// Requested identifier or prefix.
        id: String,
    },

    /// The cached reminder has no change tag to guard the write with.
    #[error("missing change tag for '{id}', try running 'sync' first")]
    MissingChangeTag {
        /// Short identifier of the reminder.
        id: String,
    },

    /// The request never produced a usable response.
    #[error(transparent)]
    Transport(#[from] SyncError),

    /// The provider refused the operation for a record.
    #[error("CloudKit error {code}: {reason}")]
    Rejected {
        /// Server error code, e.g. `CONFLICT`.
        code: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Bad arguments, caught before any network call.
    #[error("{0}")]
    InvalidInput(String),

    /// A title or notes document could not be built.
    #[error("encode document: {0}")]
    Codec(#[from] CodecError),
}

impl WriteError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns true if the cache is likely stale and a sync would help.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            WriteError::MissingChangeTag { .. } | WriteError::ReminderNotFound { .. }
        )
    }
}

impl From<ProtocolError> for WriteError {
    fn from(e: ProtocolError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<RecordFailure> for WriteError {
    fn from(failure: RecordFailure) -> Self {
        Self::Rejected {
            code: failure.code,
            reason: failure.reason,
        }
    }
}

impl From<HttpError> for WriteError {
    fn from(e: HttpError) -> Self {
        Self::Transport(SyncError::Transport(e))
    }
}
