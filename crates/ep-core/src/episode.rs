//! Reconstructed open-to-close intervals.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Category, UserId};

/// A reconstructed open-to-close interval.
///
/// Episodes are only created by the reconstructor and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub user_id: UserId,
    #[serde(default)]
    pub category: Option<Category>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Closed at the dataset horizon rather than by a close event.
    #[serde(default)]
    pub synthetic: bool,
}

impl Episode {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration().num_milliseconds()
    }

    /// Category name used for grouping; `None` for uncategorized episodes.
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(Category::as_str)
    }
}
