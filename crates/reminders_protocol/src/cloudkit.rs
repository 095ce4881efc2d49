//! CloudKit database request and response shapes.
//!
//! Envelopes are typed. Record fields stay a generic JSON map because the
//! service adds fields freely and each record type uses a different subset.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// CloudKit container holding reminders.
pub const CONTAINER: &str = "com.apple.reminders";

/// Zone holding reminders and lists.
pub const ZONE_NAME: &str = "Reminders";

/// Container environment.
pub const ENVIRONMENT: &str = "production";

/// Record fields requested on every change fetch.
pub const DESIRED_KEYS: [&str; 10] = [
    "TitleDocument",
    "NotesDocument",
    "Name",
    "Completed",
    "CompletionDate",
    "DueDate",
    "List",
    "Deleted",
    "Priority",
    "ParentReminder",
];

/// The three database calls this client makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// List zones, used for owner discovery and session probing.
    ZonesList,
    /// Fetch a page of zone changes.
    ChangesZone,
    /// Create, update, or delete records.
    RecordsModify,
}

impl Endpoint {
    /// Trailing path segment.
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::ZonesList => "zones/list",
            Endpoint::ChangesZone => "changes/zone",
            Endpoint::RecordsModify => "records/modify",
        }
    }

    /// Path relative to the storage base URL.
    pub fn path(self, container: &str, environment: &str) -> String {
        format!(
            "database/1/{container}/{environment}/private/{}",
            self.as_str()
        )
    }
}

/// Joins a storage base URL and an endpoint path.
pub fn endpoint_url(base_url: &str, container: &str, environment: &str, endpoint: Endpoint) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.path(container, environment)
    )
}

/// Zone identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneId {
    /// Zone name.
    #[serde(default)]
    pub zone_name: String,
    /// Owner record name.
    #[serde(default)]
    pub owner_record_name: String,
}

impl ZoneId {
    /// Creates a zone identifier.
    pub fn new(zone_name: impl Into<String>, owner_record_name: impl Into<String>) -> Self {
        Self {
            zone_name: zone_name.into(),
            owner_record_name: owner_record_name.into(),
        }
    }
}

/// One entry of a zone listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone identifier.
    #[serde(rename = "zoneID")]
    pub zone_id: ZoneId,
}

/// Response of `zones/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonesListResponse {
    /// Zones visible to the account.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

impl ZonesListResponse {
    /// Owner of `zone_name`, falling back to the first listed zone's owner.
    pub fn owner_of(&self, zone_name: &str) -> Option<&str> {
        self.zones
            .iter()
            .find(|z| z.zone_id.zone_name == zone_name)
            .or_else(|| self.zones.first())
            .map(|z| z.zone_id.owner_record_name.as_str())
            .filter(|owner| !owner.is_empty())
    }
}

/// Per-zone part of a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChangesQuery {
    /// Zone to read.
    #[serde(rename = "zoneID")]
    pub zone_id: ZoneId,
    /// Record fields to return.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub desired_keys: Vec<String>,
    /// Cursor from the previous page; absent for a full fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
}

/// Request body of `changes/zone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesRequest {
    /// Zones to read.
    pub zones: Vec<ZoneChangesQuery>,
}

impl ChangesRequest {
    /// A single-zone request with the given desired keys and cursor.
    pub fn new(zone_id: ZoneId, desired_keys: &[String], cursor: Option<&str>) -> Self {
        Self {
            zones: vec![ZoneChangesQuery {
                zone_id,
                desired_keys: desired_keys.to_vec(),
                sync_token: cursor.filter(|c| !c.is_empty()).map(str::to_string),
            }],
        }
    }
}

/// One zone's page of changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChanges {
    /// Zone the page belongs to.
    #[serde(rename = "zoneID", default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<ZoneId>,
    /// Changed records, in server order.
    #[serde(default)]
    pub records: Vec<RawRecord>,
    /// Whether another page follows.
    #[serde(default)]
    pub more_coming: bool,
    /// Cursor to resume from after this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
}

/// Response of `changes/zone`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangesResponse {
    /// One entry per requested zone.
    #[serde(default)]
    pub zones: Vec<ZoneChanges>,
}

impl ChangesResponse {
    /// The page for the first (and only) requested zone.
    pub fn page(&self) -> Option<&ZoneChanges> {
        self.zones.first()
    }
}

/// Record fields keyed by name. Each value is wrapped as `{"value": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordFields(Map<String, Value>);

impl RecordFields {
    /// An empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to a wrapped scalar or object value.
    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), json!({ "value": value.into() }));
        self
    }

    /// Sets `key` to a reference to another record.
    pub fn with_reference(mut self, key: &str, record_name: &str) -> Self {
        self.0.insert(
            key.to_string(),
            json!({ "value": { "recordName": record_name, "action": "NONE" } }),
        );
        self
    }

    /// The unwrapped value of `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)?.get("value")
    }

    /// String value of `key`.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key)?.as_str()
    }

    /// Integer value of `key`. Booleans read as 0 or 1; anything else as 0.
    pub fn i64(&self, key: &str) -> i64 {
        match self.value(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    /// Record name of the reference stored in `key`.
    pub fn reference(&self, key: &str) -> Option<&str> {
        self.value(key)?
            .get("recordName")?
            .as_str()
            .filter(|name| !name.is_empty())
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Modification stamp of a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStamp {
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Kind of a record, derived from its record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A reminder list.
    List,
    /// A reminder.
    Reminder,
    /// Anything else in the zone.
    Other,
}

/// A record as returned by `changes/zone` or `records/modify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Record identifier.
    #[serde(default)]
    pub record_name: String,
    /// Record type name.
    #[serde(default)]
    pub record_type: String,
    /// Hard-delete flag set by the server.
    #[serde(default)]
    pub deleted: bool,
    /// Record fields.
    #[serde(default)]
    pub fields: RecordFields,
    /// Change tag for optimistic concurrency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_change_tag: Option<String>,
    /// Last modification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<RecordStamp>,
    /// Record-level error code, present only on failed operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_error_code: Option<String>,
    /// Record-level error reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RawRecord {
    /// Classifies the record type.
    pub fn kind(&self) -> RecordKind {
        match self.record_type.as_str() {
            "ReminderList" | "List" => RecordKind::List,
            "Reminder" => RecordKind::Reminder,
            _ => RecordKind::Other,
        }
    }

    /// Server delete flag OR-ed with the soft-delete `Deleted` field.
    pub fn is_deleted(&self) -> bool {
        self.deleted || self.fields.i64("Deleted") != 0
    }

    /// Change tag, if non-empty.
    pub fn change_tag(&self) -> Option<&str> {
        self.record_change_tag.as_deref().filter(|t| !t.is_empty())
    }

    /// Modification timestamp in epoch milliseconds.
    pub fn modified_ts(&self) -> Option<i64> {
        self.modified.as_ref()?.timestamp.map(|ts| ts as i64)
    }

    /// The record-level failure, if this record reports one.
    pub fn failure(&self) -> Option<RecordFailure> {
        let code = self.server_error_code.as_deref().filter(|c| !c.is_empty())?;
        Some(RecordFailure {
            record_name: self.record_name.clone(),
            code: code.to_string(),
            reason: self.reason.clone().unwrap_or_default(),
        })
    }
}

/// Operation type of a modify request entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Create a new record.
    Create,
    /// Update an existing record, guarded by its change tag.
    Update,
    /// Delete a record, guarded by its change tag.
    Delete,
}

/// Record part of a modify operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Record type; omitted for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    /// Record identifier.
    pub record_name: String,
    /// Change tag the server must still hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_change_tag: Option<String>,
    /// Fields to write.
    #[serde(default, skip_serializing_if = "RecordFields::is_empty")]
    pub fields: RecordFields,
}

/// One entry of a modify request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOperation {
    /// What to do.
    pub operation_type: OperationType,
    /// Which record, with what fields.
    pub record: OperationRecord,
}

impl RecordOperation {
    /// Creates a new reminder record.
    pub fn create(record_name: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            operation_type: OperationType::Create,
            record: OperationRecord {
                record_type: Some("Reminder".to_string()),
                record_name: record_name.into(),
                record_change_tag: None,
                fields,
            },
        }
    }

    /// Updates the given fields of a reminder record.
    pub fn update(
        record_name: impl Into<String>,
        change_tag: impl Into<String>,
        fields: RecordFields,
    ) -> Self {
        Self {
            operation_type: OperationType::Update,
            record: OperationRecord {
                record_type: Some("Reminder".to_string()),
                record_name: record_name.into(),
                record_change_tag: Some(change_tag.into()),
                fields,
            },
        }
    }

    /// Deletes a record.
    pub fn delete(record_name: impl Into<String>, change_tag: impl Into<String>) -> Self {
        Self {
            operation_type: OperationType::Delete,
            record: OperationRecord {
                record_type: None,
                record_name: record_name.into(),
                record_change_tag: Some(change_tag.into()),
                fields: RecordFields::new(),
            },
        }
    }
}

/// Request body of `records/modify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// Zone the records live in.
    #[serde(rename = "zoneID")]
    pub zone_id: ZoneId,
    /// Operations, applied all-or-nothing when `atomic` is set.
    pub operations: Vec<RecordOperation>,
    /// Whether the batch is atomic.
    pub atomic: bool,
}

impl ModifyRequest {
    /// An atomic batch.
    pub fn atomic(zone_id: ZoneId, operations: Vec<RecordOperation>) -> Self {
        Self {
            zone_id,
            operations,
            atomic: true,
        }
    }
}

/// Response of `records/modify`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyResponse {
    /// One entry per operation: the saved record or a failure.
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

impl ModifyResponse {
    /// The first record-level failure.
    pub fn first_error(&self) -> Option<RecordFailure> {
        self.records.iter().find_map(RawRecord::failure)
    }

    /// New change tag for `record_name`, falling back to the first record's.
    pub fn change_tag_for(&self, record_name: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.record_name == record_name)
            .or_else(|| self.records.first())
            .and_then(RawRecord::change_tag)
    }
}

/// A record-level error delivered inside a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Record the error applies to.
    pub record_name: String,
    /// Server error code, e.g. `CONFLICT`.
    pub code: String,
    /// Human-readable reason.
    pub reason: String,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CloudKit error {}: {}", self.code, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths() {
        assert_eq!(
            Endpoint::ChangesZone.path(CONTAINER, ENVIRONMENT),
            "database/1/com.apple.reminders/production/private/changes/zone"
        );
        assert_eq!(
            endpoint_url("https://ck.test:443/", CONTAINER, ENVIRONMENT, Endpoint::ZonesList),
            "https://ck.test:443/database/1/com.apple.reminders/production/private/zones/list"
        );
    }

    #[test]
    fn owner_prefers_named_zone() {
        let response: ZonesListResponse = serde_json::from_value(json!({
            "zones": [
                {"zoneID": {"zoneName": "Other", "ownerRecordName": "_first"}},
                {"zoneID": {"zoneName": "Reminders", "ownerRecordName": "_owner"}}
            ]
        }))
        .unwrap();
        assert_eq!(response.owner_of(ZONE_NAME), Some("_owner"));
    }

    #[test]
    fn owner_falls_back_to_first_zone() {
        let response: ZonesListResponse = serde_json::from_value(json!({
            "zones": [{"zoneID": {"zoneName": "Other", "ownerRecordName": "_first"}}]
        }))
        .unwrap();
        assert_eq!(response.owner_of(ZONE_NAME), Some("_first"));
        assert_eq!(ZonesListResponse::default().owner_of(ZONE_NAME), None);
    }

    #[test]
    fn changes_request_omits_empty_cursor() {
        let keys: Vec<String> = DESIRED_KEYS.iter().map(|k| k.to_string()).collect();
        let request = ChangesRequest::new(ZoneId::new(ZONE_NAME, "_o"), &keys, Some(""));
        let value = serde_json::to_value(&request).unwrap();
        let zone = &value["zones"][0];
        assert_eq!(zone["zoneID"]["ownerRecordName"], "_o");
        assert_eq!(zone["desiredKeys"].as_array().unwrap().len(), 10);
        assert!(zone.get("syncToken").is_none());

        let delta = ChangesRequest::new(ZoneId::new(ZONE_NAME, "_o"), &keys, Some("tok"));
        assert_eq!(serde_json::to_value(&delta).unwrap()["zones"][0]["syncToken"], "tok");
    }

    #[test]
    fn field_accessors() {
        let record: RawRecord = serde_json::from_value(json!({
            "recordName": "Reminder/A",
            "recordType": "Reminder",
            "recordChangeTag": "t1",
            "modified": {"timestamp": 1700000000000.0},
            "fields": {
                "Completed": {"value": true},
                "Priority": {"value": 5},
                "DueDate": {"value": 1.7e12},
                "List": {"value": {"recordName": "List/S", "action": "NONE"}},
                "TitleDocument": {"value": "abc"},
                "Mystery": {"value": [1, 2]}
            }
        }))
        .unwrap();
        assert_eq!(record.kind(), RecordKind::Reminder);
        assert_eq!(record.fields.i64("Completed"), 1);
        assert_eq!(record.fields.i64("Priority"), 5);
        assert_eq!(record.fields.i64("DueDate"), 1_700_000_000_000);
        assert_eq!(record.fields.i64("Mystery"), 0);
        assert_eq!(record.fields.reference("List"), Some("List/S"));
        assert_eq!(record.fields.str("TitleDocument"), Some("abc"));
        assert_eq!(record.change_tag(), Some("t1"));
        assert_eq!(record.modified_ts(), Some(1_700_000_000_000));
        assert!(!record.is_deleted());
    }

    #[test]
    fn soft_delete_field_counts_as_deleted() {
        let record: RawRecord = serde_json::from_value(json!({
            "recordName": "List/X",
            "recordType": "ReminderList",
            "fields": {"Deleted": {"value": 1}}
        }))
        .unwrap();
        assert_eq!(record.kind(), RecordKind::List);
        assert!(record.is_deleted());
    }

    #[test]
    fn operations_serialize_to_wire_shape() {
        let fields = RecordFields::new()
            .with_value("Completed", 0)
            .with_reference("List", "List/S");
        let create = serde_json::to_value(RecordOperation::create("ABC", fields)).unwrap();
        assert_eq!(create["operationType"], "create");
        assert_eq!(create["record"]["recordType"], "Reminder");
        assert_eq!(create["record"]["fields"]["List"]["value"]["action"], "NONE");
        assert!(create["record"].get("recordChangeTag").is_none());

        let delete = serde_json::to_value(RecordOperation::delete("ABC", "t9")).unwrap();
        assert_eq!(delete["operationType"], "delete");
        assert_eq!(delete["record"]["recordChangeTag"], "t9");
        assert!(delete["record"].get("fields").is_none());
        assert!(delete["record"].get("recordType").is_none());
    }

    #[test]
    fn modify_response_errors_and_tags() {
        let ok: ModifyResponse = serde_json::from_value(json!({
            "records": [{"recordName": "A", "recordChangeTag": "t2"}]
        }))
        .unwrap();
        assert!(ok.first_error().is_none());
        assert_eq!(ok.change_tag_for("A"), Some("t2"));
        assert_eq!(ok.change_tag_for("B"), Some("t2"));

        let failed: ModifyResponse = serde_json::from_value(json!({
            "records": [{"recordName": "A", "serverErrorCode": "CONFLICT", "reason": "stale tag"}]
        }))
        .unwrap();
        let failure = failed.first_error().unwrap();
        assert_eq!(failure.code, "CONFLICT");
        assert_eq!(failure.to_string(), "CloudKit error CONFLICT: stale tag");
    }
}
