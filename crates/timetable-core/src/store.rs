//! Persistence seam for the timetable service.

use chrono::{DateTime, Utc};

use crate::entry::{NewEntry, TimetableEntry, TimetableOverride};
use crate::error::Result;
use crate::mutation::MutationPlan;
use crate::priority::Memberships;
use crate::types::{EntryId, GroupId, OverrideId, UserId};

/// Records the timetable service reads and writes.
///
/// Implementations report their own failures as [`crate::TimetableError::Store`].
pub trait TimetableStore {
    /// Group memberships of `user`; empty when the user is unknown.
    fn memberships(&self, user: &UserId) -> Result<Memberships>;

    /// Entries visible to any of `groups` whose first occurrence starts
    /// before `window_end`.
    fn entries_in_window(
        &self,
        groups: &[GroupId],
        window_end: DateTime<Utc>,
    ) -> Result<Vec<TimetableEntry>>;

    /// Overrides of `entries` visible to any of `groups`, optionally only
    /// those whose range intersects `index_range` (inclusive).
    fn overrides_for_entries(
        &self,
        entries: &[EntryId],
        groups: &[GroupId],
        index_range: Option<(u32, u32)>,
    ) -> Result<Vec<TimetableOverride>>;

    fn entry(&self, id: &EntryId) -> Result<Option<TimetableEntry>>;

    fn override_by_id(&self, id: &OverrideId) -> Result<Option<TimetableOverride>>;

    fn group_exists(&self, id: &GroupId) -> Result<bool>;

    /// Inserts a validated entry under a fresh id.
    fn insert_entry(&mut self, entry: NewEntry, now: DateTime<Utc>) -> Result<TimetableEntry>;

    /// Loads `entry_id` and all its overrides, asks `planner` for a plan and
    /// applies it, all inside one write transaction.
    ///
    /// Nothing is written when the entry is missing or `planner` fails.
    fn edit_overrides<F>(&mut self, entry_id: &EntryId, planner: F) -> Result<()>
    where
        F: FnOnce(&TimetableEntry, &[TimetableOverride]) -> Result<MutationPlan>;
}
