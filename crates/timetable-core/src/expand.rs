//! Expansion of entry templates into concrete occurrences.
//!
//! Expansion knows nothing about overrides; it only lays occurrences out on
//! the time axis and clips them to a query window.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::entry::{Repeat, TimetableEntry, offset_ms};
use crate::types::{EntryId, OccurrenceId, OverrideId};

/// The record responsible for how an occurrence looks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    /// The occurrence is exactly as its entry defines it.
    Entry(EntryId),
    /// An override replaced the occurrence; `position` counts within the override.
    Override { id: OverrideId, position: u32 },
}

impl Author {
    /// Id of the authoring record as a string.
    pub fn record_id(&self) -> &str {
        match self {
            Self::Entry(id) => id.as_str(),
            Self::Override { id, .. } => id.as_str(),
        }
    }
}

/// One concrete instance of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub entry_id: EntryId,
    /// Index within the parent entry.
    pub index: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub author: Author,
}

impl Occurrence {
    /// Public `{position}@{record}` identifier.
    pub fn occurrence_id(&self) -> OccurrenceId {
        match &self.author {
            Author::Entry(id) => OccurrenceId::new(self.index, id.as_str()),
            Author::Override { id, position } => OccurrenceId::new(*position, id.as_str()),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Expands `entry` into the occurrences overlapping `[window_start, window_end)`.
///
/// An occurrence overlaps when it starts before `window_end` and ends at or
/// after `window_start`. Results are ordered by index.
pub fn expand(
    entry: &TimetableEntry,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Occurrence> {
    if window_end <= window_start {
        return Vec::new();
    }

    let Some(first) = first_candidate_index(entry, window_start) else {
        return Vec::new();
    };

    let mut occurrences = Vec::new();
    for index in first..entry.effective_count() {
        let Some(start) = entry.occurrence_start(index) else {
            break;
        };
        if start >= window_end {
            break;
        }
        let Some(end) = offset_ms(start, entry.occurrence_duration_ms) else {
            break;
        };
        occurrences.push(Occurrence {
            entry_id: entry.id.clone(),
            index,
            start,
            end,
            location: entry.location.clone(),
            author: Author::Entry(entry.id.clone()),
        });
    }
    occurrences
}

/// Smallest index whose occurrence ends at or after `window_start`.
fn first_candidate_index(entry: &TimetableEntry, window_start: DateTime<Utc>) -> Option<u32> {
    // Occurrence i ends at event_start + i * stride + duration; solve for the
    // first i where that reaches window_start.
    let lead = (window_start - entry.event_start)
        .num_milliseconds()
        .saturating_sub(entry.occurrence_duration_ms);
    if lead <= 0 {
        return Some(0);
    }
    let Repeat::Every(stride) = entry.repeat else {
        return None;
    };
    let index = lead.div_euclid(stride) + i64::from(lead.rem_euclid(stride) != 0);
    u32::try_from(index)
        .ok()
        .filter(|index| *index < entry.effective_count())
}

/// Expands many entries in parallel, keeping the per-entry grouping.
pub fn expand_all(
    entries: &[TimetableEntry],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<Vec<Occurrence>> {
    entries
        .par_iter()
        .map(|entry| expand(entry, window_start, window_end))
        .collect()
}
