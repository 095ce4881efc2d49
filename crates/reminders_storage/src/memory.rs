//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;

/// An in-memory backend.
///
/// Counts writes so tests can assert how often state was persisted.
///
/// # Example
///
/// ```rust
/// use reminders_storage::{InMemoryBackend, StorageBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.write(b"test data").unwrap();
/// assert_eq!(backend.read().unwrap().unwrap(), b"test data");
/// assert_eq!(backend.write_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Option<Vec<u8>>>,
    writes: RwLock<usize>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`.
    #[must_use]
    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: RwLock::new(Some(data.into())),
            writes: RwLock::new(0),
        }
    }

    /// Returns a copy of the stored document.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.data.read().clone()
    }

    /// Number of successful writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.read()
    }

    /// Drops the stored document.
    pub fn clear(&self) {
        *self.data.write() = None;
    }
}

impl StorageBackend for InMemoryBackend {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().clone())
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        *self.data.write() = Some(data.to_vec());
        *self.writes.write() += 1;
        Ok(())
    }
}
