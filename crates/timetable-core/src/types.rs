//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A millisecond quantity that must be positive was not.
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: i64 },

    /// A millisecond quantity that must not be negative was.
    #[error("{field} cannot be negative, got {value}")]
    Negative { field: &'static str, value: i64 },

    /// An instant falls outside the years the store can represent.
    #[error("{field} must fall within years 0000 to 9999")]
    OutOfRange { field: &'static str },

    /// An occurrence id did not match `index@uuid`.
    #[error("invalid occurrence id: {value}")]
    InvalidOccurrenceId { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
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
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
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
    /// A validated timetable entry identifier.
    ///
    /// Entry IDs are UUIDs assigned by the store when the entry is created.
    EntryId, "entry ID"
);

define_string_id!(
    /// A validated timetable override identifier.
    OverrideId, "override ID"
);

define_string_id!(
    /// A validated timetable group identifier.
    ///
    /// Groups are the audience buckets entries and overrides are visible to.
    GroupId, "group ID"
);

define_string_id!(
    /// A validated user identifier.
    UserId, "user ID"
);

/// Public identifier of a resolved occurrence: `{position}@{uuid}`.
///
/// `position` counts occurrences within the record named by `record`, which is
/// either an entry or the override that produced the visible occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceId {
    pub position: u32,
    pub record: String,
}

impl OccurrenceId {
    pub fn new(position: u32, record: impl Into<String>) -> Self {
        Self {
            position,
            record: record.into(),
        }
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.position, self.record)
    }
}

impl FromStr for OccurrenceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidOccurrenceId {
            value: s.to_string(),
        };
        let (position, record) = s.split_once('@').ok_or_else(invalid)?;
        if position.is_empty() || !position.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let position: u32 = position.parse().map_err(|_| invalid())?;
        let record = Uuid::parse_str(record).map_err(|_| invalid())?;
        Ok(Self {
            position,
            record: record.hyphenated().to_string(),
        })
    }
}

impl Serialize for OccurrenceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OccurrenceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
