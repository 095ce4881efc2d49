//! Record transport abstraction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{SyncError, SyncResult};
use reminders_http::HttpError;
use reminders_protocol::cloudkit::{
    ChangesResponse, ModifyResponse, RawRecord, RecordOperation, ZoneChanges,
};

/// The three database calls the engine and writer need.
///
/// This trait abstracts the network layer so the engine can run against the
/// live service or a scripted transport.
pub trait RecordTransport: Send + Sync {
    /// Owner record name of the reminders zone.
    fn discover_owner(&self) -> SyncResult<String>;

    /// Fetches one page of zone changes after `cursor` (all changes if none).
    fn fetch_changes(&self, owner: &str, cursor: Option<&str>) -> SyncResult<ChangesResponse>;

    /// Submits `operations` as one atomic batch.
    ///
    /// Record-level failures come back inside an `Ok` response; an `Err`
    /// means no usable response was received.
    fn modify_records(
        &self,
        owner: &str,
        operations: Vec<RecordOperation>,
    ) -> SyncResult<ModifyResponse>;
}

impl<T: RecordTransport + ?Sized> RecordTransport for Arc<T> {
    fn discover_owner(&self) -> SyncResult<String> {
        (**self).discover_owner()
    }

    fn fetch_changes(&self, owner: &str, cursor: Option<&str>) -> SyncResult<ChangesResponse> {
        (**self).fetch_changes(owner, cursor)
    }

    fn modify_records(
        &self,
        owner: &str,
        operations: Vec<RecordOperation>,
    ) -> SyncResult<ModifyResponse> {
        (**self).modify_records(owner, operations)
    }
}

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// `discover_owner`.
    DiscoverOwner,
    /// `fetch_changes` with its arguments.
    FetchChanges {
        /// Owner passed in.
        owner: String,
        /// Cursor passed in.
        cursor: Option<String>,
    },
    /// `modify_records` with its arguments.
    ModifyRecords {
        /// Owner passed in.
        owner: String,
        /// Operations submitted.
        operations: Vec<RecordOperation>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    owner: Option<String>,
    pages: HashMap<Option<String>, ChangesResponse>,
    modify_replies: VecDeque<SyncResult<ModifyResponse>>,
    calls: Vec<TransportCall>,
    tag_counter: u64,
}

/// A scripted transport for testing.
///
/// Change pages are keyed by the cursor they answer. A cursor with no
/// scripted page gets an empty page that echoes the cursor back. Modify
/// calls consume queued replies; once the queue is empty every operation
/// succeeds and receives a fresh change tag.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a transport with no owner and no pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owner returned by `discover_owner`.
    pub fn set_owner(&self, owner: impl Into<String>) {
        self.state.lock().owner = Some(owner.into());
    }

    /// Answers fetches after `cursor` with `page`.
    pub fn set_page(&self, cursor: Option<&str>, page: ChangesResponse) {
        self.state
            .lock()
            .pages
            .insert(cursor.map(str::to_string), page);
    }

    /// Queues a modify response.
    pub fn push_modify_response(&self, response: ModifyResponse) {
        self.state.lock().modify_replies.push_back(Ok(response));
    }

    /// Queues a modify transport failure.
    pub fn push_modify_failure(&self, message: &str) {
        self.state
            .lock()
            .modify_replies
            .push_back(Err(SyncError::Transport(HttpError::transport(message))));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Operations of every modify call, in order.
    pub fn modify_calls(&self) -> Vec<Vec<RecordOperation>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::ModifyRecords { operations, .. } => Some(operations.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of fetch calls made so far.
    pub fn fetch_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::FetchChanges { .. }))
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl RecordTransport for MockTransport {
    fn discover_owner(&self) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.calls.push(TransportCall::DiscoverOwner);
        state.owner.clone().ok_or(SyncError::NoZones)
    }

    fn fetch_changes(&self, owner: &str, cursor: Option<&str>) -> SyncResult<ChangesResponse> {
        let mut state = self.state.lock();
        state.calls.push(TransportCall::FetchChanges {
            owner: owner.to_string(),
            cursor: cursor.map(str::to_string),
        });
        let key = cursor.map(str::to_string);
        Ok(state.pages.get(&key).cloned().unwrap_or_else(|| ChangesResponse {
            zones: vec![ZoneChanges {
                sync_token: key,
                ..ZoneChanges::default()
            }],
        }))
    }

    fn modify_records(
        &self,
        owner: &str,
        operations: Vec<RecordOperation>,
    ) -> SyncResult<ModifyResponse> {
        let mut state = self.state.lock();
        state.calls.push(TransportCall::ModifyRecords {
            owner: owner.to_string(),
            operations: operations.clone(),
        });
        if let Some(reply) = state.modify_replies.pop_front() {
            return reply;
        }
        let mut records = Vec::with_capacity(operations.len());
        for op in operations {
            state.tag_counter += 1;
            records.push(RawRecord {
                record_name: op.record.record_name,
                record_type: op.record.record_type.unwrap_or_default(),
                record_change_tag: Some(format!("tag-{}", state.tag_counter)),
                ..RawRecord::default()
            });
        }
        Ok(ModifyResponse { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminders_protocol::cloudkit::RecordFields;

    #[test]
    fn owner_must_be_scripted() {
        let transport = MockTransport::new();
        assert!(matches!(transport.discover_owner(), Err(SyncError::NoZones)));
        transport.set_owner("_abc");
        assert_eq!(transport.discover_owner().unwrap(), "_abc");
    }

    #[test]
    fn unscripted_cursor_echoes_empty_page() {
        let transport = MockTransport::new();
        let response = transport.fetch_changes("_abc", Some("t1")).unwrap();
        let page = response.page().unwrap();
        assert!(page.records.is_empty());
        assert!(!page.more_coming);
        assert_eq!(page.sync_token.as_deref(), Some("t1"));
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn default_modify_assigns_fresh_tags() {
        let transport = MockTransport::new();
        let ops = vec![
            RecordOperation::create("A", RecordFields::new()),
            RecordOperation::create("B", RecordFields::new()),
        ];
        let response = transport.modify_records("_abc", ops).unwrap();
        assert_eq!(response.change_tag_for("A"), Some("tag-1"));
        assert_eq!(response.change_tag_for("B"), Some("tag-2"));
        assert_eq!(transport.modify_calls()[0].len(), 2);
    }

    #[test]
    fn queued_failure_is_served_first() {
        let transport = MockTransport::new();
        transport.push_modify_failure("connection reset");
        assert!(transport.modify_records("_abc", Vec::new()).is_err());
        assert!(transport.modify_records("_abc", Vec::new()).is_ok());
    }
}
