//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid malformed-row policy value.
    #[error("invalid malformed policy: {value} (expected \"reject\" or \"skip\")")]
    InvalidMalformedPolicy { value: String },
}

/// What to do with a row whose label is neither an open nor a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail normalization on the first malformed row.
    #[default]
    Reject,
    /// Drop the row, count it and log a warning.
    Skip,
}

impl MalformedPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MalformedPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(Self::Reject),
            "skip" => Ok(Self::Skip),
            _ => Err(ValidationError::InvalidMalformedPolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after trimming and validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                if trimmed.len() == id.len() {
                    Ok(Self(id))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier.
    ///
    /// User IDs are opaque, non-empty strings. They partition the event log:
    /// every user owns an independent stack of pending opens.
    UserId, "user ID"
);

define_string_id!(
    /// A free-form episode category (e.g. "manual", "auto").
    ///
    /// Categories only appear on open events and are carried onto the
    /// episode the open produces. An absent category is modeled as
    /// `Option<Category>::None`, never as an empty string.
    Category, "category"
);

impl Category {
    /// Builds an optional category from a raw cell, treating blank as absent.
    pub fn from_cell(cell: Option<&str>) -> Option<Self> {
        cell.and_then(|raw| Self::new(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rejects_empty() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("   ").is_err());
        assert!(UserId::new("u-1").is_ok());
    }

    #[test]
    fn user_id_is_trimmed() {
        let id = UserId::new("  u-1 ").unwrap();
        assert_eq!(id.as_str(), "u-1");
    }

    #[test]
    fn user_id_serde_roundtrip() {
        let id = UserId::new("u-42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-42\"");
        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn user_id_serde_rejects_empty() {
        let result: Result<UserId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn category_from_cell_treats_blank_as_absent() {
        assert_eq!(Category::from_cell(None), None);
        assert_eq!(Category::from_cell(Some("")), None);
        assert_eq!(Category::from_cell(Some("  ")), None);
        assert_eq!(
            Category::from_cell(Some(" manual ")),
            Some(Category::new("manual").unwrap())
        );
    }

    #[test]
    fn category_as_ref() {
        let category = Category::new("auto").unwrap();
        let s: &str = category.as_ref();
        assert_eq!(s, "auto");
    }

    #[test]
    fn malformed_policy_from_str() {
        assert_eq!(
            "reject".parse::<MalformedPolicy>().unwrap(),
            MalformedPolicy::Reject
        );
        assert_eq!(
            "skip".parse::<MalformedPolicy>().unwrap(),
            MalformedPolicy::Skip
        );
        assert!("ignore".parse::<MalformedPolicy>().is_err());
    }

    #[test]
    fn malformed_policy_defaults_to_reject() {
        assert_eq!(MalformedPolicy::default(), MalformedPolicy::Reject);
    }

    #[test]
    fn malformed_policy_serde_roundtrip() {
        let json = serde_json::to_string(&MalformedPolicy::Skip).unwrap();
        assert_eq!(json, "\"skip\"");
        let parsed: MalformedPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MalformedPolicy::Skip);
    }
}
