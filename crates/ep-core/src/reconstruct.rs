//! Episode reconstruction.
//!
//! Pairs open and close events into episodes with a per-user LIFO
//! discipline, then resolves whatever opens are still pending at the end
//! of the log.
//!
//! # Algorithm Summary
//!
//! 1. Each user owns a stack of pending opens, created on first sight.
//! 2. An open pushes `{start_time, category}` onto its user's stack.
//! 3. A close pops the most recent pending open and emits an episode, or
//!    counts as an orphan close when the stack is empty.
//! 4. After the last event every residual open is counted as unmatched and,
//!    if configured, closed at the dataset horizon.
//!
//! Users never interact, so [`reconstruct`] runs each user's sequence on
//! the rayon pool and merges the results in user order. The output is
//! identical to a sequential pass.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::episode::Episode;
use crate::event::Event;
use crate::event_kind::EventKind;
use crate::normalize::NormalizedLog;
use crate::types::{Category, UserId};

/// Configuration for reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructConfig {
    /// Close opens that never saw a close at the dataset horizon instead of
    /// discarding them. They are counted as unmatched either way.
    /// Default: false.
    pub close_unmatched_at_end: bool,
}

/// Errors from feeding events to a [`Reconstructor`] by hand.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// An event arrived earlier than the previous event of the same user.
    #[error("event on row {row} for user {user_id} is earlier than the previous event")]
    OutOfOrder { user_id: UserId, row: usize },
}

/// Data-quality counters. None of these abort processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub open_events: usize,
    pub close_events: usize,
    /// Episodes produced by a real close event.
    pub matched_episodes: usize,
    /// Episodes closed at the horizon.
    pub synthesized_episodes: usize,
    /// Closes that found no pending open.
    pub orphan_closes: usize,
    /// Opens still pending at the end of the log.
    pub unmatched_opens: usize,
}

impl DataQuality {
    fn absorb(&mut self, other: &Self) {
        self.open_events += other.open_events;
        self.close_events += other.close_events;
        self.matched_episodes += other.matched_episodes;
        self.synthesized_episodes += other.synthesized_episodes;
        self.orphan_closes += other.orphan_closes;
        self.unmatched_opens += other.unmatched_opens;
    }
}

/// Counters for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTally {
    pub user_id: UserId,
    #[serde(flatten)]
    pub quality: DataQuality,
}

/// Result of reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    matched: Vec<Episode>,
    synthesized: Vec<Episode>,
    quality: DataQuality,
    per_user: Vec<UserTally>,
}

impl Reconstruction {
    /// Matched episodes first, in close order, then synthesized ones.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.matched.iter().chain(self.synthesized.iter())
    }

    pub fn episode_count(&self) -> usize {
        self.matched.len() + self.synthesized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episode_count() == 0
    }

    pub const fn quality(&self) -> &DataQuality {
        &self.quality
    }

    /// Per-user counters, ordered by user identifier.
    pub fn per_user(&self) -> &[UserTally] {
        &self.per_user
    }

    /// Appends another result. Used to combine per-user partitions.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.matched.extend(other.matched);
        self.synthesized.extend(other.synthesized);
        self.quality.absorb(&other.quality);
        self.per_user.extend(other.per_user);
        self
    }
}

/// An open waiting for its close.
#[derive(Debug, Clone)]
struct PendingOpen {
    start_time: DateTime<Utc>,
    category: Option<Category>,
}

/// Working state for one user.
#[derive(Debug, Default)]
struct UserState {
    stack: Vec<PendingOpen>,
    last_seen: Option<DateTime<Utc>>,
    tally: DataQuality,
}

/// The per-user LIFO state machine.
///
/// Feed events with [`observe`](Self::observe), then call
/// [`finish`](Self::finish) to resolve pending opens.
#[derive(Debug, Default)]
pub struct Reconstructor {
    users: BTreeMap<UserId, UserState>,
    matched: Vec<Episode>,
    latest: Option<DateTime<Utc>>,
}

impl Reconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event.
    ///
    /// Events of the same user must arrive in non-decreasing timestamp
    /// order; events of different users may interleave freely.
    pub fn observe(&mut self, event: &Event) -> Result<(), ReconstructError> {
        if let Some(state) = self.users.get(&event.user_id) {
            if state.last_seen.is_some_and(|last| event.timestamp < last) {
                return Err(ReconstructError::OutOfOrder {
                    user_id: event.user_id.clone(),
                    row: event.row,
                });
            }
        }
        self.apply(event);
        Ok(())
    }

    /// Applies one event whose ordering is already guaranteed.
    fn apply(&mut self, event: &Event) {
        let state = self.users.entry(event.user_id.clone()).or_default();
        state.last_seen = Some(event.timestamp);
        self.latest = Some(self.latest.map_or(event.timestamp, |l| l.max(event.timestamp)));

        match event.kind {
            EventKind::Open => {
                state.tally.open_events += 1;
                state.stack.push(PendingOpen {
                    start_time: event.timestamp,
                    category: event.category.clone(),
                });
            }
            EventKind::Close => {
                state.tally.close_events += 1;
                let Some(open) = state.stack.pop() else {
                    state.tally.orphan_closes += 1;
                    tracing::debug!(user_id = %event.user_id, row = event.row, "orphan close");
                    return;
                };
                state.tally.matched_episodes += 1;
                let episode = Episode {
                    user_id: event.user_id.clone(),
                    category: open.category,
                    start_time: open.start_time,
                    end_time: event.timestamp,
                    synthetic: false,
                };
                tracing::trace!(
                    user_id = %episode.user_id,
                    duration_ms = episode.duration_ms(),
                    "matched episode"
                );
                self.matched.push(episode);
            }
        }
    }

    /// Resolves every pending open and returns the final result.
    ///
    /// `horizon` is the end time for synthesized episodes. When absent, the
    /// latest timestamp this reconstructor observed is used. A horizon
    /// earlier than an open's start is clamped to that start.
    pub fn finish(
        self,
        config: &ReconstructConfig,
        horizon: Option<DateTime<Utc>>,
    ) -> Reconstruction {
        let horizon = horizon.or(self.latest);
        let mut synthesized = Vec::new();
        let mut quality = DataQuality::default();
        let mut per_user = Vec::with_capacity(self.users.len());

        for (user_id, mut state) in self.users {
            while let Some(open) = state.stack.pop() {
                state.tally.unmatched_opens += 1;
                if !config.close_unmatched_at_end {
                    continue;
                }
                let Some(end) = horizon else { continue };
                state.tally.synthesized_episodes += 1;
                synthesized.push(Episode {
                    user_id: user_id.clone(),
                    category: open.category,
                    start_time: open.start_time,
                    end_time: end.max(open.start_time),
                    synthetic: true,
                });
            }
            quality.absorb(&state.tally);
            per_user.push(UserTally {
                user_id,
                quality: state.tally,
            });
        }

        Reconstruction {
            matched: self.matched,
            synthesized,
            quality,
            per_user,
        }
    }
}

/// Reconstructs episodes from a normalized log.
pub fn reconstruct(log: &NormalizedLog, config: &ReconstructConfig) -> Reconstruction {
    let horizon = log.horizon();

    let parts: Vec<Reconstruction> = log
        .users()
        .par_iter()
        .map(|user| {
            let mut reconstructor = Reconstructor::new();
            for event in &user.events {
                reconstructor.apply(event);
            }
            reconstructor.finish(config, horizon)
        })
        .collect();

    let result = parts
        .into_iter()
        .fold(Reconstruction::default(), Reconstruction::merge);

    let quality = result.quality();
    tracing::debug!(
        users = result.per_user().len(),
        matched = quality.matched_episodes,
        synthesized = quality.synthesized_episodes,
        orphan_closes = quality.orphan_closes,
        unmatched_opens = quality.unmatched_opens,
        "reconstructed episodes"
    );

    result
}
