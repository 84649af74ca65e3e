//! Timetable queries and edits over an injected store.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::detail::{EntryDetail, TimetableItem};
use crate::entry::{NewEntry, TimetableEntry, offset_ms};
use crate::error::{Result, TimetableError};
use crate::expand::{Occurrence, expand_all};
use crate::mutation::{RangeEdit, plan_range_edit};
use crate::priority::Memberships;
use crate::resolve::resolve;
use crate::store::TimetableStore;
use crate::types::{EntryId, GroupId, OccurrenceId, OverrideId, UserId, ValidationError};

/// Stateless timetable service over a store handle.
#[derive(Debug)]
pub struct Timetable<S> {
    store: S,
}

impl<S: TimetableStore> Timetable<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The user's resolved occurrences in `[window_start, window_start + window_duration_ms)`.
    pub fn timetable(
        &self,
        user: &UserId,
        window_start: DateTime<Utc>,
        window_duration_ms: i64,
    ) -> Result<Vec<TimetableItem>> {
        if window_duration_ms < 0 {
            return Err(TimetableError::Malformed(format!(
                "window duration cannot be negative, got {window_duration_ms}"
            )));
        }
        let window_end = offset_ms(window_start, window_duration_ms).ok_or_else(|| {
            TimetableError::Malformed(format!("window of {window_duration_ms}ms is out of range"))
        })?;

        let occurrences = self.occurrences(user, window_start, window_end)?;
        Ok(occurrences.iter().map(TimetableItem::from).collect())
    }

    /// Resolved occurrences in `[window_start, window_end)` for `user`.
    pub fn occurrences(
        &self,
        user: &UserId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>> {
        let memberships = self.store.memberships(user)?;
        if memberships.is_empty() || window_end <= window_start {
            return Ok(Vec::new());
        }
        let groups = memberships.groups();

        let entries = self.store.entries_in_window(&groups, window_end)?;
        let expanded: Vec<Occurrence> = expand_all(&entries, window_start, window_end)
            .into_iter()
            .flatten()
            .collect();

        let Some(index_range) = index_span(&expanded) else {
            return Ok(Vec::new());
        };
        let entry_ids: Vec<EntryId> = entries.iter().map(|entry| entry.id.clone()).collect();
        let overrides = self
            .store
            .overrides_for_entries(&entry_ids, &groups, Some(index_range))?;

        debug!(
            user = %user,
            entries = entries.len(),
            expanded = expanded.len(),
            overrides = overrides.len(),
            "expanded timetable window"
        );
        Ok(resolve(expanded, &overrides, &memberships))
    }

    /// Detail of the entry behind an `index@uuid` occurrence id.
    ///
    /// The id may name an override; its parent entry is shown instead.
    pub fn occurrence_detail(&self, user: &UserId, occurrence_id: &str) -> Result<EntryDetail> {
        let parsed: OccurrenceId = occurrence_id
            .parse()
            .map_err(|err: ValidationError| TimetableError::Malformed(err.to_string()))?;
        let record = parsed.record;

        let entry_id = match self.store.override_by_id(&OverrideId::new(record.as_str())?)? {
            Some(found) => found.entry_id,
            None => EntryId::new(record)?,
        };
        self.entry_detail(user, &entry_id)
    }

    /// Detail of an entry visible to `user`.
    pub fn entry_detail(&self, user: &UserId, entry_id: &EntryId) -> Result<EntryDetail> {
        let memberships = self.store.memberships(user)?;
        let entry = self.visible_entry(&memberships, entry_id)?;
        let overrides =
            self.store
                .overrides_for_entries(&[entry.id.clone()], &memberships.groups(), None)?;
        Ok(EntryDetail::render(&entry, &overrides, &memberships))
    }

    /// Creates an entry; its detail has no overrides yet.
    pub fn create_entry(&mut self, entry: NewEntry) -> Result<EntryDetail> {
        self.create_entry_at(entry, Utc::now())
    }

    pub fn create_entry_at(&mut self, entry: NewEntry, now: DateTime<Utc>) -> Result<EntryDetail> {
        entry.validate()?;
        for group in &entry.groups {
            if !self.store.group_exists(group)? {
                return Err(TimetableError::Conflict(format!(
                    "group {group} does not exist"
                )));
            }
        }

        let created = self.store.insert_entry(entry, now)?;
        info!(entry_id = %created.id, groups = created.groups.len(), "created timetable entry");
        Ok(EntryDetail::render(&created, &[], &Memberships::new()))
    }

    /// Applies `edit` to an entry and returns the entry as `user` now sees it.
    pub fn update_range(
        &mut self,
        user: &UserId,
        entry_id: &EntryId,
        edit: &RangeEdit,
    ) -> Result<EntryDetail> {
        self.update_range_at(user, entry_id, edit, Utc::now())
    }

    pub fn update_range_at(
        &mut self,
        user: &UserId,
        entry_id: &EntryId,
        edit: &RangeEdit,
        now: DateTime<Utc>,
    ) -> Result<EntryDetail> {
        let memberships = self.store.memberships(user)?;
        self.visible_entry(&memberships, entry_id)?;

        self.store.edit_overrides(entry_id, |entry, existing| {
            plan_range_edit(entry, existing, edit, now)
        })?;
        info!(
            entry_id = %entry_id,
            from = edit.from,
            until = edit.until,
            every = edit.every,
            deletion = edit.effect.deletion,
            "edited timetable range"
        );
        self.entry_detail(user, entry_id)
    }

    /// Cancels occurrences `from..=until` (every `every`-th) for `groups`.
    pub fn delete_range(
        &mut self,
        user: &UserId,
        entry_id: &EntryId,
        (from, until, every): (u32, u32, u32),
        groups: BTreeSet<GroupId>,
    ) -> Result<EntryDetail> {
        let edit = RangeEdit::delete(from, until, every, groups);
        self.update_range(user, entry_id, &edit)
    }

    fn visible_entry(&self, memberships: &Memberships, entry_id: &EntryId) -> Result<TimetableEntry> {
        self.store
            .entry(entry_id)?
            .filter(|entry| entry.groups.iter().any(|group| memberships.contains(group)))
            .ok_or(TimetableError::NotFound)
    }
}

/// Smallest and largest entry index among `occurrences`.
fn index_span(occurrences: &[Occurrence]) -> Option<(u32, u32)> {
    let min = occurrences.iter().map(|o| o.index).min()?;
    let max = occurrences.iter().map(|o| o.index).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::entry::{OverrideEffect, Repeat, TimetableOverride};
    use crate::mutation::MutationPlan;
    use crate::priority::GroupRank;
    use crate::progression::Progression;

    /// Vec-backed store with the same visibility rules as the database.
    #[derive(Default)]
    struct MemoryStore {
        groups: BTreeSet<GroupId>,
        memberships: HashMap<UserId, Memberships>,
        entries: Vec<TimetableEntry>,
        overrides: Vec<TimetableOverride>,
    }

    impl MemoryStore {
        fn join(&mut self, user: &str, group_id: &str, priority: i64) {
            let group = GroupId::new(group_id).unwrap();
            self.groups.insert(group.clone());
            self.memberships
                .entry(UserId::new(user).unwrap())
                .or_default()
                .insert(group, GroupRank { priority, joined_at: at_ms(0) });
        }

        fn apply(&mut self, plan: MutationPlan) {
            self.overrides.retain(|o| !plan.deletes.contains(&o.id));
            for update in plan.updates {
                if let Some(slot) = self.overrides.iter_mut().find(|o| o.id == update.id) {
                    *slot = update;
                }
            }
            for create in plan.creates {
                let id = OverrideId::new(Uuid::new_v4().to_string()).unwrap();
                self.overrides.push(create.into_override(id));
            }
        }
    }

    impl TimetableStore for MemoryStore {
        fn memberships(&self, user: &UserId) -> Result<Memberships> {
            Ok(self.memberships.get(user).cloned().unwrap_or_default())
        }

        fn entries_in_window(
            &self,
            groups: &[GroupId],
            window_end: DateTime<Utc>,
        ) -> Result<Vec<TimetableEntry>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.event_start < window_end && groups.iter().any(|g| e.has_group(g)))
                .cloned()
                .collect())
        }

        fn overrides_for_entries(
            &self,
            entries: &[EntryId],
            groups: &[GroupId],
            index_range: Option<(u32, u32)>,
        ) -> Result<Vec<TimetableOverride>> {
            let span = index_range.and_then(|(lo, hi)| Progression::new(lo, hi, 1));
            Ok(self
                .overrides
                .iter()
                .filter(|o| entries.contains(&o.entry_id))
                .filter(|o| o.visible_to(groups.iter()))
                .filter(|o| span.as_ref().is_none_or(|span| o.range.intersect(span).is_some()))
                .cloned()
                .collect())
        }

        fn entry(&self, id: &EntryId) -> Result<Option<TimetableEntry>> {
            Ok(self.entries.iter().find(|e| &e.id == id).cloned())
        }

        fn override_by_id(&self, id: &OverrideId) -> Result<Option<TimetableOverride>> {
            Ok(self.overrides.iter().find(|o| &o.id == id).cloned())
        }

        fn group_exists(&self, id: &GroupId) -> Result<bool> {
            Ok(self.groups.contains(id))
        }

        fn insert_entry(&mut self, entry: NewEntry, now: DateTime<Utc>) -> Result<TimetableEntry> {
            let id = EntryId::new(Uuid::new_v4().to_string())?;
            let entry = entry.into_entry(id, now);
            self.entries.push(entry.clone());
            Ok(entry)
        }

        fn edit_overrides<F>(&mut self, entry_id: &EntryId, planner: F) -> Result<()>
        where
            F: FnOnce(&TimetableEntry, &[TimetableOverride]) -> Result<MutationPlan>,
        {
            let entry = self.entry(entry_id)?.ok_or(TimetableError::NotFound)?;
            let existing: Vec<TimetableOverride> = self
                .overrides
                .iter()
                .filter(|o| &o.entry_id == entry_id)
                .cloned()
                .collect();
            let plan = planner(&entry, &existing)?;
            self.apply(plan);
            Ok(())
        }
    }

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn hour(h: i64) -> DateTime<Utc> {
        at_ms(h * 3_600_000)
    }

    fn groups(ids: &[&str]) -> BTreeSet<GroupId> {
        ids.iter().map(|id| GroupId::new(*id).unwrap()).collect()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    /// Three one-hour occurrences, a day apart, in Room 101 for `g1` and `g2`.
    fn service() -> (Timetable<MemoryStore>, EntryId) {
        let mut store = MemoryStore::default();
        store.join("alice", "g1", 1);
        store.join("alice", "g2", 5);
        store.join("bob", "g1", 1);
        store.join("carol", "g3", 1);

        let mut timetable = Timetable::new(store);
        let detail = timetable
            .create_entry_at(
                NewEntry {
                    event_start: hour(0),
                    occurrence_duration_ms: 3_600_000,
                    occurrences_count: 3,
                    repeat: Repeat::Every(86_400_000),
                    location: "Room 101".to_string(),
                    groups: groups(&["g1", "g2"]),
                },
                at_ms(0),
            )
            .unwrap();
        (timetable, detail.id)
    }

    const THREE_DAYS: i64 = 3 * 86_400_000;

    #[test]
    fn timetable_lists_every_occurrence_in_window() {
        let (timetable, entry_id) = service();
        let items = timetable.timetable(&user("bob"), hour(0), THREE_DAYS).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[2].start, hour(48));
        assert_eq!(items[2].occurrence_id.to_string(), format!("2@{entry_id}"));
        assert!(items.iter().all(|item| item.location == "Room 101"));
    }

    #[test]
    fn timetable_rejects_negative_window() {
        let (timetable, _) = service();
        let err = timetable.timetable(&user("bob"), hour(0), -1).unwrap_err();
        assert!(matches!(err, TimetableError::Malformed(_)));
    }

    #[test]
    fn user_without_groups_sees_nothing() {
        let (timetable, _) = service();
        let items = timetable.timetable(&user("nobody"), hour(0), THREE_DAYS).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn update_is_seen_only_by_its_groups() {
        let (mut timetable, entry_id) = service();
        let edit = RangeEdit::update(1, 1, 1, groups(&["g2"]), OverrideEffect::relocate("Lab"));
        let detail = timetable
            .update_range_at(&user("alice"), &entry_id, &edit, at_ms(10))
            .unwrap();
        assert_eq!(detail.overrides.len(), 1);

        let alice = timetable.timetable(&user("alice"), hour(0), THREE_DAYS).unwrap();
        assert_eq!(alice[1].location, "Lab");
        assert_eq!(
            alice[1].occurrence_id.to_string(),
            format!("0@{}", detail.overrides[0].id)
        );

        let bob = timetable.timetable(&user("bob"), hour(0), THREE_DAYS).unwrap();
        assert_eq!(bob[1].location, "Room 101");
    }

    #[test]
    fn delete_range_hides_occurrences() {
        let (mut timetable, entry_id) = service();
        timetable
            .delete_range(&user("bob"), &entry_id, (0, 2, 2), groups(&["g1"]))
            .unwrap();

        let items = timetable.timetable(&user("bob"), hour(0), THREE_DAYS).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, hour(24));
    }

    #[test]
    fn occurrence_detail_follows_override_to_entry() {
        let (mut timetable, entry_id) = service();
        let edit = RangeEdit::update(0, 0, 1, groups(&["g1"]), OverrideEffect::relocate("Lab"));
        timetable
            .update_range_at(&user("bob"), &entry_id, &edit, at_ms(10))
            .unwrap();

        let items = timetable.timetable(&user("bob"), hour(0), THREE_DAYS).unwrap();
        let detail = timetable
            .occurrence_detail(&user("bob"), &items[0].occurrence_id.to_string())
            .unwrap();
        assert_eq!(detail.id, entry_id);
        assert_eq!(detail.overrides[0].location.as_deref(), Some("Lab"));
    }

    #[test]
    fn occurrence_detail_rejects_malformed_ids() {
        let (timetable, _) = service();
        for raw in ["", "abc", "1@not-a-uuid", "-1@6f1c1b6e-6d8f-4c7e-9a57-2f3b8d1e0a42"] {
            let err = timetable.occurrence_detail(&user("bob"), raw).unwrap_err();
            assert!(matches!(err, TimetableError::Malformed(_)), "{raw}");
        }
    }

    #[test]
    fn unknown_record_is_not_found() {
        let (timetable, _) = service();
        let err = timetable
            .occurrence_detail(&user("bob"), "0@6f1c1b6e-6d8f-4c7e-9a57-2f3b8d1e0a42")
            .unwrap_err();
        assert!(matches!(err, TimetableError::NotFound));
    }

    #[test]
    fn outsiders_cannot_see_or_edit_entry() {
        let (mut timetable, entry_id) = service();
        let err = timetable.entry_detail(&user("carol"), &entry_id).unwrap_err();
        assert!(matches!(err, TimetableError::NotFound));

        let err = timetable
            .delete_range(&user("carol"), &entry_id, (0, 0, 1), groups(&["g1"]))
            .unwrap_err();
        assert!(matches!(err, TimetableError::NotFound));
        assert!(timetable.store().overrides.is_empty());
    }

    #[test]
    fn editing_foreign_group_conflicts() {
        let (mut timetable, entry_id) = service();
        let err = timetable
            .delete_range(&user("bob"), &entry_id, (0, 0, 1), groups(&["g3"]))
            .unwrap_err();
        assert!(matches!(err, TimetableError::Conflict(_)));
    }

    #[test]
    fn create_entry_requires_existing_groups() {
        let (mut timetable, _) = service();
        let err = timetable
            .create_entry_at(
                NewEntry {
                    event_start: hour(0),
                    occurrence_duration_ms: 1000,
                    occurrences_count: 1,
                    repeat: Repeat::Never,
                    location: "Hall".to_string(),
                    groups: groups(&["missing"]),
                },
                at_ms(0),
            )
            .unwrap_err();
        assert!(matches!(err, TimetableError::Conflict(_)));
    }

    #[test]
    fn create_entry_validates_before_touching_store() {
        let (mut timetable, _) = service();
        let err = timetable
            .create_entry_at(
                NewEntry {
                    event_start: hour(0),
                    occurrence_duration_ms: -5,
                    occurrences_count: 1,
                    repeat: Repeat::Never,
                    location: "Hall".to_string(),
                    groups: groups(&["g1"]),
                },
                at_ms(0),
            )
            .unwrap_err();
        assert!(matches!(err, TimetableError::Validation(_)));
        assert_eq!(timetable.store().entries.len(), 1);
    }
}
