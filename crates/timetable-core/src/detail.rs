//! Caller-facing views of entries, overrides and resolved occurrences.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{TimetableEntry, TimetableOverride};
use crate::expand::Occurrence;
use crate::priority::GroupPriority;
use crate::sort::{Direction, SortValue, sort_by_keys};
use crate::types::{EntryId, GroupId, OccurrenceId, OverrideId};

/// Serializes instants as RFC 3339 with millisecond precision.
mod instant {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// One row of a user's timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableItem {
    pub occurrence_id: OccurrenceId,
    #[serde(with = "instant")]
    pub start: DateTime<Utc>,
    #[serde(with = "instant")]
    pub end: DateTime<Utc>,
    pub location: String,
}

impl From<&Occurrence> for TimetableItem {
    fn from(occurrence: &Occurrence) -> Self {
        Self {
            occurrence_id: occurrence.occurrence_id(),
            start: occurrence.start,
            end: occurrence.end,
            location: occurrence.location.clone(),
        }
    }
}

/// An override as shown inside its entry's detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideDetail {
    pub id: OverrideId,
    pub first_occurrence_override: u32,
    /// Last index the override actually hits, which may be below the `until`
    /// of the edit that created it: `0..=5` every 2 is reported as `0..=4`.
    pub last_occurrence_override: u32,
    /// Stride between affected indices; `1` when only one index is affected.
    pub override_frequency: u32,
    pub occurrence_relative_start: i64,
    pub occurrence_duration: Option<i64>,
    pub location: Option<String>,
    pub deletion: bool,
    pub groups: BTreeSet<GroupId>,
    #[serde(with = "instant")]
    pub created_at: DateTime<Utc>,
}

impl From<&TimetableOverride> for OverrideDetail {
    fn from(o: &TimetableOverride) -> Self {
        Self {
            id: o.id.clone(),
            first_occurrence_override: o.range.from(),
            last_occurrence_override: o.range.until(),
            override_frequency: o.range.every(),
            occurrence_relative_start: o.effect.relative_start_ms,
            occurrence_duration: o.effect.duration_ms,
            location: o.effect.location.clone(),
            deletion: o.effect.deletion,
            groups: o.groups.clone(),
            created_at: o.created_at,
        }
    }
}

/// An entry with its repetition bounds and the overrides visible to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetail {
    pub id: EntryId,
    #[serde(with = "instant")]
    pub first_repetition_date: DateTime<Utc>,
    #[serde(with = "instant")]
    pub last_repetition_date: DateTime<Utc>,
    pub occurrence_duration: i64,
    pub occurrences_count: u32,
    /// Milliseconds between occurrence starts; `null` when the entry never repeats.
    pub repeat_every: Option<i64>,
    pub location: String,
    pub groups: BTreeSet<GroupId>,
    pub overrides: Vec<OverrideDetail>,
}

impl EntryDetail {
    /// Renders `entry` with `overrides`, most important first.
    ///
    /// Overrides are ordered by the user's best priority among their groups,
    /// then newest first.
    pub fn render<P: GroupPriority>(
        entry: &TimetableEntry,
        overrides: &[TimetableOverride],
        ranks: &P,
    ) -> Self {
        let mut ordered: Vec<&TimetableOverride> = overrides.iter().collect();
        let priority = |o: &&TimetableOverride| {
            SortValue::from(ranks.best_rank(&o.groups).map(|rank| rank.priority))
        };
        let created = |o: &&TimetableOverride| SortValue::from(o.created_at);
        let id = |o: &&TimetableOverride| SortValue::from(o.id.as_str());
        sort_by_keys(
            &mut ordered,
            &[
                (&priority, Direction::Descending),
                (&created, Direction::Descending),
                (&id, Direction::Ascending),
            ],
        );

        Self {
            id: entry.id.clone(),
            first_repetition_date: entry.event_start,
            last_repetition_date: entry
                .last_occurrence_start()
                .unwrap_or(entry.event_start),
            occurrence_duration: entry.occurrence_duration_ms,
            occurrences_count: entry.occurrences_count,
            repeat_every: entry.repeat.as_ms(),
            location: entry.location.clone(),
            groups: entry.groups.clone(),
            overrides: ordered.into_iter().map(OverrideDetail::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::entry::{OverrideEffect, Repeat};
    use crate::priority::{GroupRank, Memberships};
    use crate::progression::Progression;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn group(id: &str) -> GroupId {
        GroupId::new(id).unwrap()
    }

    fn entry() -> TimetableEntry {
        TimetableEntry {
            id: EntryId::new("entry-1").unwrap(),
            event_start: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
            occurrence_duration_ms: 5_400_000,
            occurrences_count: 3,
            repeat: Repeat::Every(86_400_000),
            location: "Room 101".to_string(),
            groups: BTreeSet::from([group("g1"), group("g2")]),
            created_at: at_ms(0),
        }
    }

    fn override_of(id: &str, group_id: &str, created_ms: i64) -> TimetableOverride {
        TimetableOverride {
            id: OverrideId::new(id).unwrap(),
            entry_id: EntryId::new("entry-1").unwrap(),
            range: Progression::new(0, 2, 2).unwrap(),
            effect: OverrideEffect::relocate("Lab"),
            groups: BTreeSet::from([group(group_id)]),
            created_at: at_ms(created_ms),
        }
    }

    #[test]
    fn render_computes_repetition_bounds() {
        let detail = EntryDetail::render(&entry(), &[], &Memberships::new());
        assert_eq!(
            detail.last_repetition_date,
            Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap()
        );
        assert!(detail.overrides.is_empty());
    }

    #[test]
    fn render_orders_overrides_by_priority_then_recency() {
        let ranks: Memberships = [
            (group("g1"), GroupRank { priority: 1, joined_at: at_ms(0) }),
            (group("g2"), GroupRank { priority: 5, joined_at: at_ms(0) }),
        ]
        .into_iter()
        .collect();
        let overrides = [
            override_of("old-low", "g1", 10),
            override_of("new-low", "g1", 20),
            override_of("high", "g2", 0),
        ];

        let detail = EntryDetail::render(&entry(), &overrides, &ranks);
        let ids: Vec<&str> = detail.overrides.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "new-low", "old-low"]);
        assert_eq!(detail.overrides[0].override_frequency, 2);
        assert_eq!(detail.overrides[0].last_occurrence_override, 2);
    }

    #[test]
    fn override_bounds_report_indices_actually_hit() {
        let mut stepped = override_of("stepped", "g1", 0);
        stepped.range = Progression::new(0, 5, 2).unwrap();
        let mut lone = override_of("lone", "g1", 0);
        lone.range = Progression::new(3, 4, 2).unwrap();

        let stepped = OverrideDetail::from(&stepped);
        assert_eq!(stepped.last_occurrence_override, 4);
        assert_eq!(stepped.override_frequency, 2);

        let lone = OverrideDetail::from(&lone);
        assert_eq!(lone.first_occurrence_override, 3);
        assert_eq!(lone.last_occurrence_override, 3);
        assert_eq!(lone.override_frequency, 1);
    }

    #[test]
    fn detail_serializes_camel_case_iso_instants() {
        let detail = EntryDetail::render(&entry(), &[], &Memberships::new());
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["firstRepetitionDate"], "2025-03-03T09:00:00.000Z");
        assert_eq!(json["lastRepetitionDate"], "2025-03-05T09:00:00.000Z");
        assert_eq!(json["repeatEvery"], 86_400_000);
        assert_eq!(json["overrides"], serde_json::json!([]));
    }
}
