//! Canonical issue model and raw-record normalization.
//!
//! The remote API returns per-type record shapes that differ in field
//! presence. Everything funnels through [`Issue::from_raw`] so the rest of
//! the engine only ever sees the one canonical shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable unique identifier for an issue (project-prefixed, e.g. `APP-42`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueKey(pub String);

impl IssueKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IssueKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Hierarchy level of an issue.
///
/// `Other` folds every source type outside the core hierarchy (Bug,
/// Spike, Documentation, ...) into one variant, keeping the source name
/// for display. `Other` issues sit outside the hierarchy: they never
/// require a parent and may never be one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    /// Hierarchy root; parents Stories and Tasks.
    Epic,
    /// Mid-level work item; parents Subtasks.
    Story,
    /// Mid-level work item; parents Subtasks.
    Task,
    /// Leaf item; never a parent.
    Subtask,
    /// Any other source type, with its original name.
    Other(String),
}

impl IssueType {
    /// Map a source type name onto the hierarchy.
    ///
    /// The remote API spells the leaf type `Sub-task`; both spellings are
    /// accepted.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Epic" => Self::Epic,
            "Story" => Self::Story,
            "Task" => Self::Task,
            "Sub-task" | "Subtask" => Self::Subtask,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this type structurally requires a parent link.
    ///
    /// Epics are hierarchy roots and `Other` types sit outside the
    /// hierarchy, so neither can ever be unlinked.
    #[must_use]
    pub fn requires_parent(&self) -> bool {
        matches!(self, Self::Story | Self::Task | Self::Subtask)
    }

    /// Whether this type is a valid parent for `child`.
    ///
    /// Valid pairs: Epic→Story, Epic→Task, Story→Subtask, Task→Subtask.
    #[must_use]
    pub fn is_valid_parent_of(&self, child: &IssueType) -> bool {
        matches!(
            (self, child),
            (Self::Epic, Self::Story | Self::Task)
                | (Self::Story | Self::Task, Self::Subtask)
        )
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epic => write!(f, "Epic"),
            Self::Story => write!(f, "Story"),
            Self::Task => write!(f, "Task"),
            Self::Subtask => write!(f, "Subtask"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// One tracked item in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique key within a snapshot.
    pub key: IssueKey,

    /// Hierarchy level.
    pub issue_type: IssueType,

    /// One-line summary.
    pub summary: String,

    /// Workflow status name as reported by the source.
    pub status: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,

    /// Lookup key of the parent issue. Never an ownership relation; may
    /// reference an issue that was not fetched or does not exist.
    pub parent_key: Option<IssueKey>,

    /// Additional source fields kept for filter/sort/display (assignee,
    /// creator, project, custom fields). Keys are unique; order is
    /// irrelevant.
    pub raw_attributes: HashMap<String, Value>,
}

/// A raw record that could not be normalized.
///
/// Per-record and non-fatal: the caller skips the record, logs it, and
/// counts it in the run report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRecord {
    /// The record is not a JSON object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// The record has no `key` field.
    #[error("record has no key")]
    MissingKey,

    /// The record has no issue type.
    #[error("record {key} has no issue type")]
    MissingType {
        /// Key of the offending record.
        key: String,
    },
}

/// Source fields consumed into dedicated [`Issue`] fields; everything
/// else lands in `raw_attributes`.
const CONSUMED_FIELDS: [&str; 6] = [
    "issuetype",
    "parent",
    "summary",
    "status",
    "created",
    "updated",
];

impl Issue {
    /// Normalize one raw record into the canonical shape.
    ///
    /// Tolerates the per-type field variance of the source API: only
    /// `key` and the issue type are required; descriptive fields default
    /// to empty and timestamps to the Unix epoch when absent or
    /// unparsable.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRecord`] when `key` or the issue type is
    /// missing.
    pub fn from_raw(raw: &Value) -> std::result::Result<Self, MalformedRecord> {
        let record = raw.as_object().ok_or(MalformedRecord::NotAnObject)?;

        let key = record
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or(MalformedRecord::MissingKey)?;

        let empty = serde_json::Map::new();
        let fields = record
            .get("fields")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let type_name = fields
            .get("issuetype")
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedRecord::MissingType {
                key: key.to_string(),
            })?;

        let summary = fields
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let status = fields
            .get("status")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let parent_key = fields
            .get("parent")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .map(IssueKey::from);

        let created_at = parse_timestamp(fields.get("created"));
        let updated_at = parse_timestamp(fields.get("updated"));

        let raw_attributes = fields
            .iter()
            .filter(|(name, value)| !CONSUMED_FIELDS.contains(&name.as_str()) && !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Self {
            key: IssueKey::new(key),
            issue_type: IssueType::from_name(type_name),
            summary,
            status,
            created_at,
            updated_at,
            parent_key,
            raw_attributes,
        })
    }
}

/// Parse a source timestamp, falling back to the Unix epoch.
///
/// The source emits RFC 3339-adjacent timestamps with a colonless zone
/// offset (`2024-01-15T10:30:00.000+0100`); both that form and strict
/// RFC 3339 are accepted. A missing or unparsable timestamp maps to the
/// epoch so downstream sorting stays deterministic.
fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    let Some(text) = value.and_then(Value::as_str) else {
        return DateTime::UNIX_EPOCH;
    };

    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
