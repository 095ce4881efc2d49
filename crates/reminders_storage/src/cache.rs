//! Local record cache.

use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use reminders_protocol::ReminderRecord;

const UPDATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Snapshot of every reminder and list seen so far, plus the sync cursor.
///
/// Maps are ordered by identifier, so iteration and prefix lookups are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCache {
    /// Reminders keyed by record identifier.
    #[serde(default)]
    pub reminders: BTreeMap<String, ReminderRecord>,
    /// List names keyed by record identifier.
    #[serde(default)]
    pub lists: BTreeMap<String, String>,
    /// Cursor for the next delta fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    /// Owner of the reminders zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Local time of the last save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl RecordCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor, if one is stored and non-empty.
    pub fn cursor(&self) -> Option<&str> {
        self.sync_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Owner id, if one is stored and non-empty.
    pub fn owner(&self) -> Option<&str> {
        self.owner_id.as_deref().filter(|o| !o.is_empty())
    }

    /// Drops all records and the cursor. The owner id survives since it
    /// never changes for an account.
    pub fn reset(&mut self) {
        self.reminders.clear();
        self.lists.clear();
        self.sync_token = None;
    }

    /// Number of reminders not yet completed.
    pub fn active_count(&self) -> usize {
        self.reminders.values().filter(|r| !r.completed).count()
    }

    /// Name of the list `id`, if known.
    pub fn list_name(&self, id: &str) -> Option<&str> {
        self.lists.get(id).map(String::as_str)
    }
}

/// Loads and saves the [`RecordCache`] document.
#[derive(Debug)]
pub struct CacheStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> CacheStore<B> {
    /// Creates a store over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Loads the cache. Missing or unreadable documents yield an empty
    /// cache, which makes the next sync a full one.
    pub fn load(&self) -> RecordCache {
        let bytes = match self.backend.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return RecordCache::new(),
            Err(e) => {
                warn!(error = %e, "cannot read cache, starting empty");
                return RecordCache::new();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable cache file");
            RecordCache::new()
        })
    }

    /// Stamps `updated_at` and persists `cache`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, cache: &mut RecordCache) -> StorageResult<()> {
        cache.updated_at = Some(Local::now().format(UPDATED_AT_FORMAT).to_string());
        let bytes = serde_json::to_vec_pretty(cache)?;
        self.backend.write(&bytes)
    }
}
