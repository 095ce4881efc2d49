//! Sync engine state machine and read projections.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::folding::fold_records;
use crate::transport::RecordTransport;
use reminders_protocol::{short_id, Reminder, ReminderList, ReminderRecord, UNKNOWN_LIST};
use reminders_storage::{CacheStore, RecordCache, StorageBackend, StorageResult};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Engine is resolving the zone owner.
    Discovering,
    /// Engine is fetching change pages.
    Fetching,
    /// Engine has completed a sync cycle.
    Synced,
    /// Engine encountered an error.
    Error,
}

impl SyncState {
    /// Returns true if the engine is in an active sync state.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Discovering | SyncState::Fetching)
    }

    /// Returns true if the engine can start a new sync.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Synced | SyncState::Error)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of change pages folded.
    pub pages_fetched: u64,
    /// Total number of records folded.
    pub records_fetched: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Number of non-empty pages folded.
    pub pages: u32,
    /// Number of records folded.
    pub records: u64,
    /// Whether the cycle started without a cursor.
    pub full: bool,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

/// Keeps the local record cache in step with the reminders zone.
///
/// The engine owns the cache for the lifetime of an invocation: it loads it
/// once at construction, folds change pages into it, and persists it after
/// every cycle. The [`Writer`](crate::Writer) shares the same cache for its
/// local echo.
pub struct SyncEngine<T: RecordTransport, B: StorageBackend> {
    config: SyncConfig,
    transport: Arc<T>,
    store: CacheStore<B>,
    cache: RwLock<RecordCache>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<T: RecordTransport, B: StorageBackend> SyncEngine<T, B> {
    /// Creates an engine, loading the cache from `backend`.
    pub fn new(config: SyncConfig, transport: T, backend: B) -> Self {
        let store = CacheStore::new(backend);
        let cache = store.load();
        Self {
            config,
            transport: Arc::new(transport),
            store,
            cache: RwLock::new(cache),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the cache store.
    pub fn store(&self) -> &CacheStore<B> {
        &self.store
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Snapshot of the cache.
    pub fn cache(&self) -> RecordCache {
        self.cache.read().clone()
    }

    /// Persists the cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be written.
    pub fn save(&self) -> StorageResult<()> {
        let mut cache = self.cache.write();
        self.store.save(&mut cache)
    }

    pub(crate) fn read_cache<R>(&self, f: impl FnOnce(&RecordCache) -> R) -> R {
        f(&self.cache.read())
    }

    pub(crate) fn update_cache<R>(&self, f: impl FnOnce(&mut RecordCache) -> R) -> R {
        f(&mut self.cache.write())
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Owner of the reminders zone, discovering and caching it if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub fn owner_id(&self) -> SyncResult<String> {
        let cached = self.cache.read().owner().map(str::to_string);
        if let Some(owner) = cached {
            return Ok(owner);
        }
        let owner = self.transport.discover_owner()?;
        debug!(owner = %owner, "discovered zone owner");
        self.cache.write().owner_id = Some(owner.clone());
        Ok(owner)
    }

    /// Fetches and folds zone changes.
    ///
    /// With `force`, the cursor and every cached record are discarded first
    /// (the owner id is kept) so the whole zone is fetched again. Otherwise
    /// only changes after the stored cursor are fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if a fetch fails or the cache cannot be saved. Pages
    /// folded before the failure stay in memory but are not persisted.
    pub fn sync(&self, force: bool) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();

        if !self.state().can_start_sync() {
            return Err(SyncError::AlreadySyncing);
        }

        match self.run_cycle(force) {
            Ok(mut result) => {
                result.duration = start.elapsed();
                self.set_state(SyncState::Synced);
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.pages_fetched += u64::from(result.pages);
                stats.records_fetched += result.records;
                stats.last_sync_time = Some(Instant::now());
                stats.last_error = None;
                Ok(result)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    fn run_cycle(&self, force: bool) -> SyncResult<SyncCycleResult> {
        if force {
            self.cache.write().reset();
        }

        self.set_state(SyncState::Discovering);
        let owner = self.owner_id()?;

        self.set_state(SyncState::Fetching);
        let mut cursor = self.cache.read().cursor().map(str::to_string);
        let mut result = SyncCycleResult {
            pages: 0,
            records: 0,
            full: cursor.is_none(),
            duration: Duration::ZERO,
        };
        debug!(full = result.full, "starting sync");

        loop {
            let response = self.transport.fetch_changes(&owner, cursor.as_deref())?;
            let Some(page) = response.page() else {
                debug!("response carried no zone, stopping");
                break;
            };
            if page.records.is_empty() {
                break;
            }

            let next = page.sync_token.clone().filter(|t| !t.is_empty());
            {
                let mut cache = self.cache.write();
                let summary = fold_records(&mut cache, &page.records);
                debug!(
                    records = page.records.len(),
                    upserted = summary.upserted,
                    removed = summary.removed,
                    more = page.more_coming,
                    "folded page"
                );
                if next.is_some() {
                    cache.sync_token = next.clone();
                }
            }
            result.pages += 1;
            result.records += page.records.len() as u64;

            if !page.more_coming {
                break;
            }
            if next.is_none() || next == cursor {
                warn!("more pages announced without a new cursor, stopping");
                break;
            }
            cursor = next;
        }

        let mut cache = self.cache.write();
        self.store.save(&mut cache)?;
        info!(
            "Synced: {} reminders ({} active), {} lists",
            cache.reminders.len(),
            cache.active_count(),
            cache.lists.len()
        );
        Ok(result)
    }

    fn handle_error(&self, error: &SyncError) {
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }

    /// Cached reminders ordered by identifier, with list names resolved.
    pub fn get_reminders(&self, include_completed: bool) -> Vec<Reminder> {
        let cache = self.cache.read();
        cache
            .reminders
            .iter()
            .filter(|(_, r)| include_completed || !r.completed)
            .map(|(id, record)| project(&cache, id, record.clone()))
            .collect()
    }

    /// A single cached reminder by exact identifier.
    pub fn get_reminder(&self, id: &str) -> Option<Reminder> {
        let cache = self.cache.read();
        let record = cache.reminders.get(id)?.clone();
        Some(project(&cache, id, record))
    }

    /// Cached lists ordered by identifier.
    pub fn get_lists(&self) -> Vec<ReminderList> {
        self.cache
            .read()
            .lists
            .iter()
            .map(|(id, name)| ReminderList {
                id: id.clone(),
                name: name.clone(),
            })
            .collect()
    }

    /// Identifier of the list named `name`, compared case-insensitively.
    pub fn find_list_by_name(&self, name: &str) -> Option<String> {
        let wanted = name.to_lowercase();
        self.cache
            .read()
            .lists
            .iter()
            .find(|(_, n)| n.to_lowercase() == wanted)
            .map(|(id, _)| id.clone())
    }

    /// Identifier of the first reminder, in identifier order, whose short id
    /// starts with `partial` (case-insensitive).
    pub fn find_reminder_by_id(&self, partial: &str) -> Option<String> {
        let wanted = short_id(partial.trim()).to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.cache
            .read()
            .reminders
            .keys()
            .find(|id| short_id(id).to_lowercase().starts_with(&wanted))
            .cloned()
    }

    /// Reminders whose title contains `query` (case-insensitive).
    pub fn search(&self, query: &str, include_completed: bool) -> Vec<Reminder> {
        let wanted = query.to_lowercase();
        self.get_reminders(include_completed)
            .into_iter()
            .filter(|r| r.title().to_lowercase().contains(&wanted))
            .collect()
    }
}

fn project(cache: &RecordCache, id: &str, record: ReminderRecord) -> Reminder {
    let list_name = record
        .list_ref
        .as_deref()
        .and_then(|list| cache.list_name(list))
        .unwrap_or(UNKNOWN_LIST)
        .to_string();
    Reminder {
        id: id.to_string(),
        list_name,
        record,
    }
}

impl<T: RecordTransport, B: StorageBackend> std::fmt::Debug for SyncEngine<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.read();
        f.debug_struct("SyncEngine")
            .field("state", &self.state())
            .field("reminders", &cache.reminders.len())
            .field("lists", &cache.lists.len())
            .field("has_cursor", &cache.cursor().is_some())
            .finish()
    }
}
