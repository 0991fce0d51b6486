//! Open/close classification of free-text event labels.
//!
//! Labels are sniffed exactly once, at ingestion. Everything downstream
//! matches on [`EventKind`] and never looks at the label again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an event starts or ends an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Open,
    Close,
}

impl EventKind {
    /// Classifies a free-text label.
    ///
    /// The label is trimmed and lower-cased. It is an open if it contains
    /// `open`, otherwise a close if it contains `close`. A label containing
    /// both classifies as an open.
    pub fn classify(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if label.contains("open") {
            Some(Self::Open)
        } else if label.contains("close") {
            Some(Self::Close)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::classify(s).ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for labels that are neither an open nor a close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(String);

impl UnknownEventKind {
    /// The offending label, as it appeared in the input.
    pub fn label(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label is neither open nor close: {:?}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}
