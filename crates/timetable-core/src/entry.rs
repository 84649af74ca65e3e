//! Timetable entries and the overrides layered on top of them.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::Progression;
use crate::types::{EntryId, GroupId, OverrideId, ValidationError};

/// Stride between successive occurrence starts of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Repeat {
    /// Occurrences start every `n` milliseconds.
    Every(i64),
    /// The entry never repeats; only occurrence 0 exists.
    Never,
}

impl Repeat {
    /// Creates a repeating stride after validation.
    pub const fn every_ms(ms: i64) -> Result<Self, ValidationError> {
        if ms <= 0 {
            return Err(ValidationError::NotPositive {
                field: "repeat stride",
                value: ms,
            });
        }
        Ok(Self::Every(ms))
    }

    /// Interprets a stored stride where `None` means "never repeats".
    pub fn from_ms(ms: Option<i64>) -> Result<Self, ValidationError> {
        ms.map_or(Ok(Self::Never), Self::every_ms)
    }

    /// Stride in milliseconds, `None` for [`Repeat::Never`].
    #[must_use]
    pub const fn as_ms(self) -> Option<i64> {
        match self {
            Self::Every(ms) => Some(ms),
            Self::Never => None,
        }
    }
}

impl Serialize for Repeat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_ms().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Repeat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let ms = Option::<i64>::deserialize(deserializer)?;
        Self::from_ms(ms).map_err(serde::de::Error::custom)
    }
}

/// Adds a signed millisecond offset to an instant, `None` on overflow.
pub(crate) fn offset_ms(instant: DateTime<Utc>, ms: i64) -> Option<DateTime<Utc>> {
    instant.checked_add_signed(TimeDelta::try_milliseconds(ms)?)
}

/// Whether `instant` has a four-digit year, the range RFC 3339 can carry.
fn is_storable(instant: DateTime<Utc>) -> bool {
    (0..=9999).contains(&instant.year())
}

/// A recurring event template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: EntryId,
    /// Start of occurrence 0.
    pub event_start: DateTime<Utc>,
    pub occurrence_duration_ms: i64,
    pub occurrences_count: u32,
    pub repeat: Repeat,
    pub location: String,
    pub groups: BTreeSet<GroupId>,
    pub created_at: DateTime<Utc>,
}

impl TimetableEntry {
    /// Number of occurrences that actually exist.
    ///
    /// A non-repeating entry has a single occurrence whatever its stored count.
    pub const fn effective_count(&self) -> u32 {
        match self.repeat {
            Repeat::Every(_) => self.occurrences_count,
            Repeat::Never => 1,
        }
    }

    /// Start of occurrence `index`, `None` if the index does not exist.
    pub fn occurrence_start(&self, index: u32) -> Option<DateTime<Utc>> {
        if index >= self.effective_count() {
            return None;
        }
        match self.repeat {
            Repeat::Every(stride) => offset_ms(self.event_start, i64::from(index).checked_mul(stride)?),
            Repeat::Never => Some(self.event_start),
        }
    }

    /// Start of the final occurrence.
    pub fn last_occurrence_start(&self) -> Option<DateTime<Utc>> {
        self.occurrence_start(self.effective_count().saturating_sub(1))
    }

    pub fn has_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }
}

/// Fields of an entry supplied by the caller on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub event_start: DateTime<Utc>,
    pub occurrence_duration_ms: i64,
    pub occurrences_count: u32,
    pub repeat: Repeat,
    pub location: String,
    pub groups: BTreeSet<GroupId>,
}

impl NewEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.occurrence_duration_ms < 0 {
            return Err(ValidationError::Negative {
                field: "occurrence duration",
                value: self.occurrence_duration_ms,
            });
        }
        if self.occurrences_count == 0 {
            return Err(ValidationError::NotPositive {
                field: "occurrences count",
                value: 0,
            });
        }
        if let Repeat::Every(ms) = self.repeat {
            if ms <= 0 {
                return Err(ValidationError::NotPositive {
                    field: "repeat stride",
                    value: ms,
                });
            }
        }
        if self.groups.is_empty() {
            return Err(ValidationError::Empty { field: "groups" });
        }

        // Occurrence ends grow with the index, so the first start and the
        // last end bound every instant of the entry.
        let last_offset = match self.repeat {
            Repeat::Every(ms) => i64::from(self.occurrences_count - 1).checked_mul(ms),
            Repeat::Never => Some(0),
        };
        let last_end = last_offset
            .and_then(|offset| offset_ms(self.event_start, offset))
            .and_then(|start| offset_ms(start, self.occurrence_duration_ms));
        if !is_storable(self.event_start) {
            return Err(ValidationError::OutOfRange {
                field: "event start",
            });
        }
        if !last_end.is_some_and(is_storable) {
            return Err(ValidationError::OutOfRange {
                field: "last occurrence end",
            });
        }
        Ok(())
    }

    /// Materializes the entry under a store-assigned id.
    pub fn into_entry(self, id: EntryId, created_at: DateTime<Utc>) -> TimetableEntry {
        TimetableEntry {
            id,
            event_start: self.event_start,
            occurrence_duration_ms: self.occurrence_duration_ms,
            occurrences_count: self.occurrences_count,
            repeat: self.repeat,
            location: self.location,
            groups: self.groups,
            created_at,
        }
    }
}

/// What an override does to each occurrence it affects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEffect {
    /// Offset added to the occurrence's original start.
    pub relative_start_ms: i64,
    /// Replacement duration; the occurrence keeps its own when `None`.
    pub duration_ms: Option<i64>,
    /// Replacement location; `None` keeps whatever the slot resolves to.
    pub location: Option<String>,
    pub deletion: bool,
}

impl OverrideEffect {
    /// Effect that only moves the occurrence to another location.
    pub fn relocate(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    /// Effect that cancels the occurrence.
    pub fn deletion() -> Self {
        Self {
            deletion: true,
            ..Self::default()
        }
    }
}

/// A correction applied to a stride-aligned subset of one entry's occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimetableOverride {
    pub id: OverrideId,
    pub entry_id: EntryId,
    /// Affected indices in the parent entry's index space.
    pub range: Progression,
    pub effect: OverrideEffect,
    pub groups: BTreeSet<GroupId>,
    pub created_at: DateTime<Utc>,
}

impl TimetableOverride {
    pub const fn affects(&self, index: u32) -> bool {
        self.range.contains(index)
    }

    /// Whether the override is visible through any of the given groups.
    pub fn visible_to<'a>(&self, mut groups: impl Iterator<Item = &'a GroupId>) -> bool {
        groups.any(|group| self.groups.contains(group))
    }
}

/// An override the mutation planner wants the store to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOverride {
    pub entry_id: EntryId,
    pub range: Progression,
    pub effect: OverrideEffect,
    pub groups: BTreeSet<GroupId>,
    pub created_at: DateTime<Utc>,
}

impl NewOverride {
    pub fn into_override(self, id: OverrideId) -> TimetableOverride {
        TimetableOverride {
            id,
            entry_id: self.entry_id,
            range: self.range,
            effect: self.effect,
            groups: self.groups,
            created_at: self.created_at,
        }
    }
}
