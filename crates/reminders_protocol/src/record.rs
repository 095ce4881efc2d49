//! Cached record types and read projections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// List name shown when a reminder's list reference does not resolve.
pub const UNKNOWN_LIST: &str = "?";

/// Title given to reminders whose title document decodes to nothing.
pub const UNTITLED: &str = "(untitled)";

/// Returns the trailing segment of a record identifier.
///
/// `"Reminder/ABC-123"` becomes `"ABC-123"`; identifiers without a kind
/// prefix are returned unchanged.
pub fn short_id(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Reminder priority.
///
/// The service stores priority as an integer. Only the four canonical
/// values are ever written; anything else read back is bucketed by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// No priority (0).
    #[default]
    None,
    /// High priority (1).
    High,
    /// Medium priority (5).
    Medium,
    /// Low priority (9).
    Low,
}

impl Priority {
    /// Wire value written to the `Priority` field.
    pub fn value(self) -> i64 {
        match self {
            Priority::None => 0,
            Priority::High => 1,
            Priority::Medium => 5,
            Priority::Low => 9,
        }
    }

    /// Maps a raw stored value onto a priority.
    pub fn from_value(raw: i64) -> Self {
        match raw {
            1..=4 => Priority::High,
            5 => Priority::Medium,
            6..=9 => Priority::Low,
            _ => Priority::None,
        }
    }

    /// Lowercase label.
    pub fn label(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Priority::None),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(ProtocolError::invalid_priority(s)),
        }
    }
}

/// Cached snapshot of one reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRecord {
    /// Decoded title.
    #[serde(default)]
    pub title: String,
    /// Whether the reminder is completed.
    #[serde(default)]
    pub completed: bool,
    /// Completion date as `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<String>,
    /// Due date as `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    /// Raw priority value (0 none, 1 high, 5 medium, 9 low).
    #[serde(default)]
    pub priority: i64,
    /// Decoded notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Identifier of the owning list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_ref: Option<String>,
    /// Identifier of the parent reminder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ref: Option<String>,
    /// Last modification time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_ts: Option<i64>,
    /// Provider change tag for optimistic concurrency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_tag: Option<String>,
}

impl ReminderRecord {
    /// Priority bucket for the raw value.
    pub fn priority(&self) -> Priority {
        Priority::from_value(self.priority)
    }

    /// Change tag, if present and non-empty.
    pub fn change_tag(&self) -> Option<&str> {
        self.change_tag.as_deref().filter(|t| !t.is_empty())
    }
}

/// A reminder list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderList {
    /// List record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Read projection of a cached reminder with its list resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Reminder record identifier.
    pub id: String,
    /// Resolved list name, or [`UNKNOWN_LIST`].
    pub list_name: String,
    /// Cached fields.
    #[serde(flatten)]
    pub record: ReminderRecord,
}

impl Reminder {
    /// Trailing segment of the identifier.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    /// Decoded title.
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// Whether the reminder is completed.
    pub fn is_completed(&self) -> bool {
        self.record.completed
    }
}
