//! Storage backend trait definition.

use crate::error::StorageResult;
use std::sync::Arc;

/// A whole-document byte store.
///
/// Each backend holds one document (the session file or the cache file).
/// Reads return the full document; writes replace it. Backends do not
/// interpret the bytes.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`
/// - `read` returns `None` if nothing was ever written
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    fn write(&self, data: &[u8]) -> StorageResult<()>;
}

impl<B: StorageBackend> StorageBackend for Arc<B> {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        (**self).read()
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        (**self).write(data)
    }
}
