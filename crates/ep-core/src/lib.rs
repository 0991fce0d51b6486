//! Core domain logic for episode duration analysis.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: classifying raw rows into ordered per-user open/close events
//! - Reconstruction: LIFO matching of opens and closes into episodes
//! - Statistics: per-category duration summaries and Welch's t-test

pub mod episode;
pub mod event;
pub mod event_kind;
pub mod normalize;
pub mod reconstruct;
mod special;
pub mod stats;
pub mod types;
pub mod welch;

pub use episode::Episode;
pub use event::{Event, RawRow};
pub use event_kind::{EventKind, UnknownEventKind};
pub use normalize::{NormalizeError, NormalizedLog, UserEvents, normalize};
pub use reconstruct::{
    DataQuality, ReconstructConfig, ReconstructError, Reconstruction, Reconstructor, UserTally,
    reconstruct,
};
pub use stats::{CategorySummary, Comparison, DurationStats, TestOutcome, compare, summarize};
pub use types::{Category, MalformedPolicy, UserId, ValidationError};
pub use welch::{DEFAULT_ALPHA, TestSkip, WelchTest};
