//! Event normalization.
//!
//! Turns raw rows into per-user, chronologically ordered event sequences.
//! This is the only place where labels are classified and timestamps are
//! converted; the reconstructor relies on the ordering established here.
//!
//! # Ordering
//!
//! Users are ordered by identifier. Within a user, events are ordered by
//! timestamp ascending; ties keep their original row order (stable sort).
//!
//! # Horizon
//!
//! The horizon is the maximum timestamp of every row whose timestamp could
//! be converted, including rows skipped as malformed. It is computed once
//! here and handed to the resolver explicitly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::{Event, RawRow};
use crate::event_kind::EventKind;
use crate::types::{Category, MalformedPolicy, UserId};

/// Structural problems that abort normalization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The label classified as neither open nor close.
    #[error("malformed event on row {row}: label {label:?} is neither open nor close")]
    MalformedEvent { row: usize, label: String },

    /// The user identifier was blank.
    #[error("empty user_id on row {row}")]
    EmptyUserId { row: usize },

    /// The timestamp cannot be represented as a UTC instant.
    #[error("timestamp out of range on row {row}: {millis} ms")]
    TimestampOutOfRange { row: usize, millis: i64 },
}

/// The time-ordered events of a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvents {
    pub user_id: UserId,
    pub events: Vec<Event>,
}

/// Output of normalization: per-user ordered sequences plus the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedLog {
    users: Vec<UserEvents>,
    horizon: Option<DateTime<Utc>>,
    skipped_rows: usize,
}

impl NormalizedLog {
    /// Per-user sequences, ordered by user identifier.
    pub fn users(&self) -> &[UserEvents] {
        &self.users
    }

    /// Maximum timestamp seen anywhere in the input, if any row was read.
    pub const fn horizon(&self) -> Option<DateTime<Utc>> {
        self.horizon
    }

    /// Rows dropped under [`MalformedPolicy::Skip`].
    pub const fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// All events in processing order (grouped by user, then by time).
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.users.iter().flat_map(|user| user.events.iter())
    }

    pub fn event_count(&self) -> usize {
        self.users.iter().map(|user| user.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Normalizes raw rows into per-user ordered event sequences.
///
/// Rows are numbered from 1 in the order they are yielded.
pub fn normalize<I>(rows: I, policy: MalformedPolicy) -> Result<NormalizedLog, NormalizeError>
where
    I: IntoIterator<Item = RawRow>,
{
    let mut by_user: BTreeMap<UserId, Vec<Event>> = BTreeMap::new();
    let mut horizon: Option<DateTime<Utc>> = None;
    let mut skipped_rows = 0;

    for (idx, raw) in rows.into_iter().enumerate() {
        let row = idx + 1;

        let timestamp = DateTime::from_timestamp_millis(raw.timestamp).ok_or(
            NormalizeError::TimestampOutOfRange {
                row,
                millis: raw.timestamp,
            },
        )?;
        horizon = Some(horizon.map_or(timestamp, |h| h.max(timestamp)));

        let user_id = UserId::new(raw.user_id).map_err(|_| NormalizeError::EmptyUserId { row })?;

        let Some(kind) = EventKind::classify(&raw.event) else {
            match policy {
                MalformedPolicy::Reject => {
                    return Err(NormalizeError::MalformedEvent {
                        row,
                        label: raw.event,
                    });
                }
                MalformedPolicy::Skip => {
                    tracing::warn!(row, label = %raw.event, "skipping malformed event");
                    skipped_rows += 1;
                    continue;
                }
            }
        };

        let category = match kind {
            EventKind::Open => Category::from_cell(raw.open_type.as_deref()),
            EventKind::Close => None,
        };

        by_user.entry(user_id.clone()).or_default().push(Event {
            user_id,
            kind,
            timestamp,
            category,
            row,
        });
    }

    let users: Vec<UserEvents> = by_user
        .into_iter()
        .map(|(user_id, mut events)| {
            // Stable: equal timestamps keep row order.
            events.sort_by_key(|event| event.timestamp);
            UserEvents { user_id, events }
        })
        .collect();

    tracing::debug!(
        users = users.len(),
        skipped_rows,
        horizon = ?horizon,
        "normalized event log"
    );

    Ok(NormalizedLog {
        users,
        horizon,
        skipped_rows,
    })
}
