//! Raw input rows and the typed events they normalize into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;
use crate::types::{Category, UserId};

/// One row of the input log, exactly as read from the source table.
///
/// Extra columns in the source are ignored. `open_type` may be missing
/// entirely or left blank on close rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub user_id: String,
    /// Free-text label; classified by substring into open or close.
    pub event: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_type: Option<String>,
}

impl RawRow {
    pub fn new(
        user_id: impl Into<String>,
        event: impl Into<String>,
        timestamp: i64,
        open_type: Option<&str>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            event: event.into(),
            timestamp,
            open_type: open_type.map(str::to_string),
        }
    }
}

/// A classified, validated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// Only ever set on open events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// 1-based position of the source row among data rows.
    pub row: usize,
}
