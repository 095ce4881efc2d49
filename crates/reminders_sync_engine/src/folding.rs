//! Folding change records into the local cache.
//!
//! Folding is an upsert keyed by record identifier, so applying the same page
//! twice leaves the cache exactly as applying it once.

use reminders_codec::decode_document;
use reminders_protocol::cloudkit::{RawRecord, RecordKind};
use reminders_protocol::time::timestamp_to_date;
use reminders_protocol::{ReminderRecord, UNTITLED};
use reminders_storage::RecordCache;

/// Counts of what a fold changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldSummary {
    /// Lists and reminders inserted or replaced.
    pub upserted: usize,
    /// Lists and reminders removed.
    pub removed: usize,
    /// Records of other types, or lists without a usable name.
    pub skipped: usize,
}

/// Applies `records` to `cache` in order; later records win.
pub fn fold_records(cache: &mut RecordCache, records: &[RawRecord]) -> FoldSummary {
    let mut summary = FoldSummary::default();
    for record in records {
        let id = record.record_name.clone();
        match record.kind() {
            RecordKind::List if record.is_deleted() => {
                cache.lists.remove(&id);
                summary.removed += 1;
            }
            RecordKind::List => match list_name(record) {
                Some(name) => {
                    cache.lists.insert(id, name);
                    summary.upserted += 1;
                }
                None => summary.skipped += 1,
            },
            RecordKind::Reminder if record.is_deleted() => {
                cache.reminders.remove(&id);
                summary.removed += 1;
            }
            RecordKind::Reminder => {
                cache.reminders.insert(id, reminder_from_record(record));
                summary.upserted += 1;
            }
            RecordKind::Other => summary.skipped += 1,
        }
    }
    summary
}

/// Display name of a list record: `Name`, else the decoded `TitleDocument`.
pub fn list_name(record: &RawRecord) -> Option<String> {
    let name = match record.fields.str("Name").filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => record
            .fields
            .str("TitleDocument")
            .map(decode_document)
            .unwrap_or_default(),
    };
    (!name.is_empty()).then_some(name)
}

/// Builds the cached snapshot of a live reminder record.
pub fn reminder_from_record(record: &RawRecord) -> ReminderRecord {
    let fields = &record.fields;
    let title = fields
        .str("TitleDocument")
        .map(decode_document)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let notes = fields
        .str("NotesDocument")
        .map(decode_document)
        .filter(|n| !n.is_empty());

    ReminderRecord {
        title,
        completed: fields.i64("Completed") != 0,
        completion_date: timestamp_to_date(fields.i64("CompletionDate")),
        due: timestamp_to_date(fields.i64("DueDate")),
        priority: fields.i64("Priority"),
        notes,
        list_ref: fields.reference("List").map(str::to_string),
        parent_ref: fields.reference("ParentReminder").map(str::to_string),
        modified_ts: record.modified_ts(),
        change_tag: record.change_tag().map(str::to_string),
    }
}
