//! Creating and changing reminders with optimistic concurrency.
//!
//! Every mutation of an existing reminder carries the change tag last seen
//! for it; the provider rejects the write if the record changed since. A
//! reminder cached without a tag cannot be mutated until the next sync
//! brings one in.
//!
//! Accepted writes are echoed into the shared cache straight away, so the
//! next read reflects them without waiting for a sync.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::SyncEngine;
use crate::error::{WriteError, WriteResult};
use crate::transport::RecordTransport;
use reminders_codec::encode_document;
use reminders_protocol::cloudkit::{ModifyResponse, RecordFields, RecordOperation};
use reminders_protocol::time::{date_to_timestamp, now_millis, timestamp_to_date};
use reminders_protocol::{short_id, Priority, Reminder, ReminderRecord};
use reminders_storage::StorageBackend;

/// A reminder to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewReminder {
    /// Title text.
    pub title: String,
    /// Name of the list to put it in.
    pub list: Option<String>,
    /// Due date as `YYYY-MM-DD`.
    pub due: Option<String>,
    /// Priority.
    pub priority: Priority,
    /// Notes text.
    pub notes: Option<String>,
    /// Identifier or prefix of the parent reminder.
    pub parent: Option<String>,
}

impl NewReminder {
    /// A reminder with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the list name.
    pub fn with_list(mut self, list: impl Into<String>) -> Self {
        self.list = Some(list.into());
        self
    }

    /// Sets the due date.
    pub fn with_due(mut self, due: impl Into<String>) -> Self {
        self.due = Some(due.into());
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Makes it a subtask of `parent`.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Fields to change on an existing reminder. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderEdit {
    /// New title.
    pub title: Option<String>,
    /// New due date as `YYYY-MM-DD`; an empty string clears it.
    pub due: Option<String>,
    /// New notes; an empty string clears them.
    pub notes: Option<String>,
    /// New priority.
    pub priority: Option<Priority>,
}

impl ReminderEdit {
    /// Returns true if nothing would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.due.is_none() && self.notes.is_none() && self.priority.is_none()
    }
}

/// Submits record operations and echoes accepted ones into the cache.
pub struct Writer<T: RecordTransport, B: StorageBackend> {
    engine: Arc<SyncEngine<T, B>>,
}

impl<T: RecordTransport, B: StorageBackend> Writer<T, B> {
    /// Creates a writer sharing `engine`'s cache and transport.
    pub fn new(engine: Arc<SyncEngine<T, B>>) -> Self {
        Self { engine }
    }

    /// The engine this writer echoes into.
    pub fn engine(&self) -> &SyncEngine<T, B> {
        &self.engine
    }

    /// Creates one reminder.
    ///
    /// A subtask created without an explicit list lands in its parent's list.
    ///
    /// # Errors
    ///
    /// Fails before any network call if the list or parent cannot be resolved
    /// or the due date is malformed. Returns [`WriteError::Rejected`] if the
    /// provider refuses the record; the cache is then left untouched.
    pub fn create(&self, new: NewReminder) -> WriteResult<Reminder> {
        let due = parse_due(new.due.as_deref())?;
        let (list_ref, parent_ref) = self.resolve_placement(new.list.as_deref(), new.parent.as_deref())?;
        let notes = new.notes.filter(|n| !n.is_empty());

        let id = new_record_id();
        let mut fields = create_fields(&new.title, list_ref.as_deref(), parent_ref.as_deref())?;
        if let Some(ts) = due {
            fields = fields.with_value("DueDate", ts);
        }
        if new.priority != Priority::None {
            fields = fields.with_value("Priority", new.priority.value());
        }
        if let Some(notes) = notes.as_deref() {
            fields = fields.with_value("NotesDocument", encode_document(notes)?);
        }

        let response = self.submit(vec![RecordOperation::create(id.clone(), fields)])?;
        let record = ReminderRecord {
            title: new.title,
            due: due.and_then(timestamp_to_date),
            priority: new.priority.value(),
            notes,
            list_ref,
            parent_ref,
            modified_ts: Some(now_millis()),
            change_tag: response.change_tag_for(&id).map(str::to_string),
            ..ReminderRecord::default()
        };
        info!(id = %id, title = %record.title, "created reminder");
        self.engine.update_cache(|cache| cache.reminders.insert(id.clone(), record));
        self.persist();
        self.echoed(&id)
    }

    /// Creates several reminders in one atomic batch.
    ///
    /// Batch-created entries are cached without change tags, so they cannot
    /// be completed or deleted until the next sync.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidInput`] for an empty `titles`, plus the
    /// same resolution and provider errors as [`create`](Self::create).
    pub fn create_batch(
        &self,
        titles: &[String],
        list: Option<&str>,
        parent: Option<&str>,
    ) -> WriteResult<Vec<Reminder>> {
        if titles.is_empty() {
            return Err(WriteError::invalid_input("no titles given"));
        }
        let (list_ref, parent_ref) = self.resolve_placement(list, parent)?;

        let mut ids = Vec::with_capacity(titles.len());
        let mut operations = Vec::with_capacity(titles.len());
        for title in titles {
            let id = new_record_id();
            let fields = create_fields(title, list_ref.as_deref(), parent_ref.as_deref())?;
            operations.push(RecordOperation::create(id.clone(), fields));
            ids.push(id);
        }

        self.submit(operations)?;
        let now = now_millis();
        self.engine.update_cache(|cache| {
            for (id, title) in ids.iter().zip(titles) {
                cache.reminders.insert(
                    id.clone(),
                    ReminderRecord {
                        title: title.clone(),
                        list_ref: list_ref.clone(),
                        parent_ref: parent_ref.clone(),
                        modified_ts: Some(now),
                        ..ReminderRecord::default()
                    },
                );
            }
        });
        info!(count = ids.len(), "created reminders");
        self.persist();
        ids.iter().map(|id| self.echoed(id)).collect()
    }

    /// Marks a reminder completed as of now.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::ReminderNotFound`] or
    /// [`WriteError::MissingChangeTag`] without any network call when the
    /// cache cannot guard the write.
    pub fn complete(&self, partial_id: &str) -> WriteResult<Reminder> {
        let (id, tag) = self.resolve_tagged(partial_id)?;
        let now = now_millis();
        let fields = RecordFields::new()
            .with_value("Completed", true)
            .with_value("CompletionDate", now);

        let response = self.submit(vec![RecordOperation::update(id.clone(), tag, fields)])?;
        let new_tag = response.change_tag_for(&id).map(str::to_string);
        self.engine.update_cache(|cache| {
            if let Some(entry) = cache.reminders.get_mut(&id) {
                entry.completed = true;
                entry.completion_date = timestamp_to_date(now);
                if new_tag.is_some() {
                    entry.change_tag = new_tag;
                }
            }
        });
        info!(id = %id, "completed reminder");
        self.persist();
        self.echoed(&id)
    }

    /// Deletes a reminder, returning its last cached state.
    ///
    /// # Errors
    ///
    /// Same staleness errors as [`complete`](Self::complete).
    pub fn delete(&self, partial_id: &str) -> WriteResult<Reminder> {
        let (id, tag) = self.resolve_tagged(partial_id)?;
        let snapshot = self.echoed(&id)?;

        self.submit(vec![RecordOperation::delete(id.clone(), tag)])?;
        self.engine.update_cache(|cache| cache.reminders.remove(&id));
        info!(id = %id, "deleted reminder");
        self.persist();
        Ok(snapshot)
    }

    /// Changes the given fields of a reminder.
    ///
    /// An empty `due` sends a null `DueDate`, which clears the date.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidInput`] if `edit` changes nothing or the
    /// due date is malformed, plus the staleness errors of
    /// [`complete`](Self::complete).
    pub fn edit(&self, partial_id: &str, edit: ReminderEdit) -> WriteResult<Reminder> {
        if edit.is_empty() {
            return Err(WriteError::invalid_input(
                "nothing to change: give a new title, due date, notes or priority",
            ));
        }
        let clear_due = edit.due.as_deref().is_some_and(|d| d.trim().is_empty());
        let due = parse_due(edit.due.as_deref())?;
        let (id, tag) = self.resolve_tagged(partial_id)?;

        let mut fields = RecordFields::new();
        if let Some(title) = edit.title.as_deref() {
            fields = fields.with_value("TitleDocument", encode_document(title)?);
        }
        if let Some(ts) = due {
            fields = fields.with_value("DueDate", ts);
        } else if clear_due {
            fields = fields.with_value("DueDate", serde_json::Value::Null);
        }
        if let Some(notes) = edit.notes.as_deref() {
            fields = fields.with_value("NotesDocument", encode_document(notes)?);
        }
        if let Some(priority) = edit.priority {
            fields = fields.with_value("Priority", priority.value());
        }

        let response = self.submit(vec![RecordOperation::update(id.clone(), tag, fields)])?;
        let new_tag = response.change_tag_for(&id).map(str::to_string);
        self.engine.update_cache(|cache| {
            let Some(entry) = cache.reminders.get_mut(&id) else {
                return;
            };
            if let Some(title) = edit.title {
                entry.title = title;
            }
            if due.is_some() || clear_due {
                entry.due = due.and_then(timestamp_to_date);
            }
            if let Some(notes) = edit.notes {
                entry.notes = Some(notes).filter(|n| !n.is_empty());
            }
            if let Some(priority) = edit.priority {
                entry.priority = priority.value();
            }
            if new_tag.is_some() {
                entry.change_tag = new_tag;
            }
            entry.modified_ts = Some(now_millis());
        });
        info!(id = %id, "edited reminder");
        self.persist();
        self.echoed(&id)
    }

    fn resolve_placement(
        &self,
        list: Option<&str>,
        parent: Option<&str>,
    ) -> WriteResult<(Option<String>, Option<String>)> {
        let mut list_ref = match list.filter(|l| !l.is_empty()) {
            Some(name) => Some(self.engine.find_list_by_name(name).ok_or_else(|| {
                WriteError::ListNotFound {
                    name: name.to_string(),
                }
            })?),
            None => None,
        };
        let parent_ref = match parent.filter(|p| !p.is_empty()) {
            Some(partial) => {
                let id = self.engine.find_reminder_by_id(partial).ok_or_else(|| {
                    WriteError::ParentNotFound {
                        id: partial.to_string(),
                    }
                })?;
                if list_ref.is_none() {
                    list_ref = self
                        .engine
                        .read_cache(|cache| cache.reminders.get(&id).and_then(|p| p.list_ref.clone()));
                }
                Some(id)
            }
            None => None,
        };
        Ok((list_ref, parent_ref))
    }

    fn resolve_tagged(&self, partial_id: &str) -> WriteResult<(String, String)> {
        let id = self
            .engine
            .find_reminder_by_id(partial_id)
            .ok_or_else(|| WriteError::ReminderNotFound {
                id: partial_id.to_string(),
            })?;
        let tag = self.engine.read_cache(|cache| {
            cache
                .reminders
                .get(&id)
                .and_then(ReminderRecord::change_tag)
                .map(str::to_string)
        });
        match tag {
            Some(tag) => Ok((id, tag)),
            None => Err(WriteError::MissingChangeTag {
                id: short_id(&id).to_string(),
            }),
        }
    }

    fn submit(&self, operations: Vec<RecordOperation>) -> WriteResult<ModifyResponse> {
        let owner = self.engine.owner_id()?;
        debug!(operations = operations.len(), "submitting record operations");
        let response = self.engine.transport().modify_records(&owner, operations)?;
        if let Some(failure) = response.first_error() {
            warn!(record = %failure.record_name, code = %failure.code, "record rejected");
            return Err(failure.into());
        }
        Ok(response)
    }

    fn echoed(&self, id: &str) -> WriteResult<Reminder> {
        self.engine
            .get_reminder(id)
            .ok_or_else(|| WriteError::ReminderNotFound { id: id.to_string() })
    }

    fn persist(&self) {
        if let Err(e) = self.engine.save() {
            warn!(error = %e, "failed to save cache after write");
        }
    }
}

fn new_record_id() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}

fn parse_due(due: Option<&str>) -> WriteResult<Option<i64>> {
    match due.filter(|d| !d.trim().is_empty()) {
        Some(date) => Ok(Some(date_to_timestamp(date)?)),
        None => Ok(None),
    }
}

fn create_fields(
    title: &str,
    list_ref: Option<&str>,
    parent_ref: Option<&str>,
) -> WriteResult<RecordFields> {
    let mut fields = RecordFields::new()
        .with_value("TitleDocument", encode_document(title)?)
        .with_value("Completed", 0);
    if let Some(list) = list_ref {
        fields = fields.with_reference("List", list);
    }
    if let Some(parent) = parent_ref {
        fields = fields.with_reference("ParentReminder", parent);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::transport::MockTransport;
    use reminders_codec::decode_document;
    use reminders_protocol::cloudkit::OperationType;
    use reminders_storage::InMemoryBackend;

    fn writer() -> Writer<MockTransport, InMemoryBackend> {
        let transport = MockTransport::new();
        transport.set_owner("_owner");
        let engine = SyncEngine::new(SyncConfig::default(), transport, InMemoryBackend::new());
        engine.update_cache(|cache| {
            cache.owner_id = Some("_owner".into());
            cache.lists.insert("List/L1".into(), "Shopping".into());
            cache.lists.insert("List/L2".into(), "Work".into());
            cache.reminders.insert(
                "Reminder/PARENT-1".into(),
                ReminderRecord {
                    title: "Trip".into(),
                    list_ref: Some("List/L2".into()),
                    change_tag: Some("p1".into()),
                    ..ReminderRecord::default()
                },
            );
            cache.reminders.insert(
                "Reminder/UNTAGGED-2".into(),
                ReminderRecord {
                    title: "Stale".into(),
                    ..ReminderRecord::default()
                },
            );
        });
        Writer::new(Arc::new(engine))
    }

    #[test]
    fn create_builds_fields_and_echoes() {
        let writer = writer();
        let created = writer
            .create(
                NewReminder::new("Buy milk")
                    .with_list("shopping")
                    .with_due("2026-03-01")
                    .with_priority(Priority::High)
                    .with_notes("2%"),
            )
            .unwrap();

        assert_eq!(created.list_name, "Shopping");
        assert_eq!(created.record.due.as_deref(), Some("2026-03-01"));
        assert_eq!(created.record.priority, 1);
        assert_eq!(created.record.change_tag.as_deref(), Some("tag-1"));
        assert_eq!(created.id.len(), 36);
        assert_eq!(created.id, created.id.to_uppercase());

        let ops = writer.engine().transport().modify_calls();
        let op = &ops[0][0];
        assert_eq!(op.operation_type, OperationType::Create);
        let fields = &op.record.fields;
        assert_eq!(decode_document(fields.str("TitleDocument").unwrap()), "Buy milk");
        assert_eq!(decode_document(fields.str("NotesDocument").unwrap()), "2%");
        assert_eq!(fields.reference("List"), Some("List/L1"));
        assert_eq!(fields.i64("Completed"), 0);
        assert_eq!(fields.i64("Priority"), 1);
        assert!(fields.contains("DueDate"));
        assert!(!fields.contains("ParentReminder"));
    }

    #[test]
    fn plain_create_omits_optional_fields() {
        let writer = writer();
        writer.create(NewReminder::new("Bare")).unwrap();
        let ops = writer.engine().transport().modify_calls();
        let fields = &ops[0][0].record.fields;
        assert_eq!(fields.len(), 2);
        assert!(!fields.contains("Priority"));
        assert!(!fields.contains("NotesDocument"));
    }

    #[test]
    fn subtask_inherits_parent_list() {
        let writer = writer();
        let created = writer
            .create(NewReminder::new("Pack").with_parent("parent"))
            .unwrap();
        assert_eq!(created.list_name, "Work");
        assert_eq!(created.record.parent_ref.as_deref(), Some("Reminder/PARENT-1"));
    }

    #[test]
    fn resolution_failures_make_no_calls() {
        let writer = writer();
        assert!(matches!(
            writer.create(NewReminder::new("x").with_list("Nope")),
            Err(WriteError::ListNotFound { .. })
        ));
        assert!(matches!(
            writer.create(NewReminder::new("x").with_parent("zzz")),
            Err(WriteError::ParentNotFound { .. })
        ));
        assert!(matches!(
            writer.create(NewReminder::new("x").with_due("03/01/2026")),
            Err(WriteError::InvalidInput(_))
        ));
        assert!(writer.engine().transport().calls().is_empty());
    }

    #[test]
    fn batch_is_one_atomic_call_without_tags() {
        let writer = writer();
        let titles = vec!["Eggs".to_string(), "Bread".to_string()];
        let created = writer.create_batch(&titles, Some("Shopping"), None).unwrap();

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|r| r.record.change_tag.is_none()));
        assert!(created.iter().all(|r| r.list_name == "Shopping"));
        assert_eq!(writer.engine().transport().modify_calls().len(), 1);
        assert_eq!(writer.engine().transport().modify_calls()[0].len(), 2);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let writer = writer();
        assert!(matches!(
            writer.create_batch(&[], None, None),
            Err(WriteError::InvalidInput(_))
        ));
    }

    #[test]
    fn complete_carries_tag_and_refreshes_it() {
        let writer = writer();
        let done = writer.complete("PARENT").unwrap();
        assert!(done.is_completed());
        assert_eq!(done.record.completion_date, timestamp_to_date(now_millis()));
        assert_eq!(done.record.change_tag.as_deref(), Some("tag-1"));

        let op = &writer.engine().transport().modify_calls()[0][0];
        assert_eq!(op.operation_type, OperationType::Update);
        assert_eq!(op.record.record_change_tag.as_deref(), Some("p1"));
        assert_eq!(op.record.fields.i64("Completed"), 1);
    }

    #[test]
    fn untagged_reminder_cannot_be_mutated() {
        let writer = writer();
        for result in [
            writer.complete("untagged"),
            writer.delete("untagged"),
            writer.edit(
                "untagged",
                ReminderEdit {
                    title: Some("x".into()),
                    ..ReminderEdit::default()
                },
            ),
        ] {
            match result {
                Err(WriteError::MissingChangeTag { id }) => assert_eq!(id, "UNTAGGED-2"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert!(writer.engine().transport().calls().is_empty());
    }

    #[test]
    fn delete_removes_entry() {
        let writer = writer();
        let removed = writer.delete("parent-1").unwrap();
        assert_eq!(removed.title(), "Trip");
        assert!(writer.engine().get_reminder("Reminder/PARENT-1").is_none());

        let op = &writer.engine().transport().modify_calls()[0][0];
        assert_eq!(op.operation_type, OperationType::Delete);
        assert_eq!(op.record.record_type, None);
    }

    #[test]
    fn edit_sends_only_changed_fields() {
        let writer = writer();
        let edited = writer
            .edit(
                "PARENT",
                ReminderEdit {
                    title: Some("Road trip".into()),
                    priority: Some(Priority::Low),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(edited.title(), "Road trip");
        assert_eq!(edited.record.priority, 9);
        assert_eq!(edited.record.change_tag.as_deref(), Some("tag-1"));

        let fields = &writer.engine().transport().modify_calls()[0][0].record.fields;
        assert_eq!(fields.len(), 2);
        assert!(fields.contains("TitleDocument"));
        assert!(fields.contains("Priority"));
    }

    #[test]
    fn empty_due_clears_the_date() {
        let writer = writer();
        let dated = writer
            .edit(
                "PARENT",
                ReminderEdit {
                    due: Some("2026-05-01".into()),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(dated.record.due.as_deref(), Some("2026-05-01"));

        let cleared = writer
            .edit(
                "PARENT",
                ReminderEdit {
                    due: Some(String::new()),
                    ..ReminderEdit::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.record.due, None);

        let calls = writer.engine().transport().modify_calls();
        let fields = &calls[1][0].record.fields;
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.value("DueDate"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn empty_edit_is_rejected() {
        let writer = writer();
        assert!(matches!(
            writer.edit("PARENT", ReminderEdit::default()),
            Err(WriteError::InvalidInput(_))
        ));
    }

    #[test]
    fn transport_failure_leaves_cache_untouched() {
        let writer = writer();
        writer.engine().transport().push_modify_failure("connection reset");
        let before = writer.engine().cache();
        assert!(matches!(
            writer.complete("PARENT"),
            Err(WriteError::Transport(_))
        ));
        assert_eq!(writer.engine().cache(), before);
    }
}
