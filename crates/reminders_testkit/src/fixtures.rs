//! Record builders and canned responses.
//!
//! Records are built in their wire shape so tests exercise the same folding
//! code the live service feeds.

use reminders_codec::encode_document;
use reminders_protocol::cloudkit::{
    ChangesResponse, ModifyResponse, RawRecord, RecordFields, RecordStamp, ZoneChanges, ZoneId,
};
use reminders_storage::ConfigPaths;
use tempfile::TempDir;

/// Encodes `text` as a title or notes document.
pub fn document(text: &str) -> String {
    encode_document(text).expect("Failed to encode document")
}

/// A live list record with a `Name` field.
pub fn list_record(id: &str, name: &str) -> RawRecord {
    RawRecord {
        record_name: id.to_string(),
        record_type: "ReminderList".to_string(),
        fields: RecordFields::new().with_value("Name", name),
        record_change_tag: Some(format!("{id}-tag")),
        ..RawRecord::default()
    }
}

/// A live list record named only by its `TitleDocument`.
pub fn titled_list_record(id: &str, title: &str) -> RawRecord {
    RawRecord {
        record_name: id.to_string(),
        record_type: "List".to_string(),
        fields: RecordFields::new().with_value("TitleDocument", document(title)),
        ..RawRecord::default()
    }
}

/// A hard-deleted list record.
pub fn deleted_list_record(id: &str) -> RawRecord {
    RawRecord {
        record_name: id.to_string(),
        record_type: "ReminderList".to_string(),
        deleted: true,
        ..RawRecord::default()
    }
}

/// Builder for reminder change records.
#[derive(Debug, Clone)]
pub struct ReminderFixture {
    record: RawRecord,
}

impl ReminderFixture {
    /// A live, incomplete reminder with a change tag derived from `id`.
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            record: RawRecord {
                record_name: id.to_string(),
                record_type: "Reminder".to_string(),
                fields: RecordFields::new()
                    .with_value("TitleDocument", document(title))
                    .with_value("Completed", 0),
                record_change_tag: Some(format!("{id}-tag")),
                ..RawRecord::default()
            },
        }
    }

    fn field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.record.fields = self.record.fields.with_value(key, value);
        self
    }

    /// Puts the reminder in list `list_id`.
    pub fn in_list(mut self, list_id: &str) -> Self {
        self.record.fields = self.record.fields.with_reference("List", list_id);
        self
    }

    /// Makes it a subtask of `parent_id`.
    pub fn parent(mut self, parent_id: &str) -> Self {
        self.record.fields = self.record.fields.with_reference("ParentReminder", parent_id);
        self
    }

    /// Marks it completed at `millis`.
    pub fn completed_at(self, millis: i64) -> Self {
        self.field("Completed", 1).field("CompletionDate", millis)
    }

    /// Sets the due timestamp.
    pub fn due(self, millis: i64) -> Self {
        self.field("DueDate", millis)
    }

    /// Sets the raw priority value.
    pub fn priority(self, value: i64) -> Self {
        self.field("Priority", value)
    }

    /// Sets the notes document.
    pub fn notes(self, text: &str) -> Self {
        self.field("NotesDocument", document(text))
    }

    /// Sets the soft-delete field.
    pub fn soft_deleted(self) -> Self {
        self.field("Deleted", 1)
    }

    /// Sets the server delete flag.
    pub fn deleted(mut self) -> Self {
        self.record.deleted = true;
        self
    }

    /// Replaces the change tag; `None` removes it.
    pub fn tag(mut self, tag: Option<&str>) -> Self {
        self.record.record_change_tag = tag.map(str::to_string);
        self
    }

    /// Sets the modification timestamp.
    pub fn modified(mut self, millis: i64) -> Self {
        self.record.modified = Some(RecordStamp {
            timestamp: Some(millis as f64),
        });
        self
    }

    /// Finishes the record.
    pub fn build(self) -> RawRecord {
        self.record
    }
}

/// A single-zone change page.
pub fn change_page(records: Vec<RawRecord>, sync_token: &str, more_coming: bool) -> ChangesResponse {
    ChangesResponse {
        zones: vec![ZoneChanges {
            zone_id: Some(ZoneId::new("Reminders", "_owner")),
            records,
            more_coming,
            sync_token: Some(sync_token.to_string()),
        }],
    }
}

/// A modify response accepting `record_name` with a new change tag.
pub fn accepted(record_name: &str, change_tag: &str) -> ModifyResponse {
    ModifyResponse {
        records: vec![RawRecord {
            record_name: record_name.to_string(),
            record_type: "Reminder".to_string(),
            record_change_tag: Some(change_tag.to_string()),
            ..RawRecord::default()
        }],
    }
}

/// A modify response rejecting `record_name` in-band.
pub fn rejected(record_name: &str, code: &str, reason: &str) -> ModifyResponse {
    ModifyResponse {
        records: vec![RawRecord {
            record_name: record_name.to_string(),
            server_error_code: Some(code.to_string()),
            reason: Some(reason.to_string()),
            ..RawRecord::default()
        }],
    }
}

/// A configuration directory that is removed on drop.
pub struct TempConfig {
    /// File locations inside the directory.
    pub paths: ConfigPaths,
    _temp_dir: TempDir,
}

impl TempConfig {
    /// Creates an empty configuration directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            paths: ConfigPaths::new(temp_dir.path()),
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TempConfig {
    fn default() -> Self {
        Self::new()
    }
}
