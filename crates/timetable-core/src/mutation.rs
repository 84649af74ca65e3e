//! Planning of range-scoped edits to an entry's override set.
//!
//! An override claims every `(index, group)` pair in `range x groups`. After
//! any edit each pair has at most one claiming override; priorities between
//! overrides of different groups are only applied at read time.
//!
//! Planning is pure: it reads a snapshot of the entry's overrides and returns
//! the rows to update, insert and delete. The store applies the plan in the
//! same transaction the snapshot was read in.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::entry::{NewOverride, OverrideEffect, TimetableEntry, TimetableOverride, offset_ms};
use crate::error::{Result, TimetableError};
use crate::progression::Progression;
use crate::sort::{Direction, SortValue, sort_by_keys};
use crate::types::{GroupId, OverrideId};

/// A request to change occurrences `from..=until` (every `every`-th) for `groups`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEdit {
    pub from: u32,
    pub until: u32,
    pub every: u32,
    pub groups: BTreeSet<GroupId>,
    pub effect: OverrideEffect,
}

impl RangeEdit {
    pub const fn update(
        from: u32,
        until: u32,
        every: u32,
        groups: BTreeSet<GroupId>,
        effect: OverrideEffect,
    ) -> Self {
        Self {
            from,
            until,
            every,
            groups,
            effect,
        }
    }

    /// A delete is an update that tombstones the range and clears the location.
    pub fn delete(from: u32, until: u32, every: u32, groups: BTreeSet<GroupId>) -> Self {
        Self::update(from, until, every, groups, OverrideEffect::deletion())
    }
}

/// Row-level changes that realize a [`RangeEdit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationPlan {
    /// Existing overrides rewritten under their own id.
    pub updates: Vec<TimetableOverride>,
    pub creates: Vec<NewOverride>,
    pub deletes: Vec<OverrideId>,
}

impl MutationPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty() && self.deletes.is_empty()
    }
}

/// Validates `edit` against `entry` and plans the override rows it needs.
///
/// `existing` must be every override attached to `entry`. New rows created
/// for the request are stamped `now`; rows split off an existing override
/// keep its effect and creation time.
pub fn plan_range_edit(
    entry: &TimetableEntry,
    existing: &[TimetableOverride],
    edit: &RangeEdit,
    now: DateTime<Utc>,
) -> Result<MutationPlan> {
    let target = validate(entry, existing, edit)?;

    let mut ordered: Vec<&TimetableOverride> = existing.iter().collect();
    let created = |o: &&TimetableOverride| SortValue::from(o.created_at);
    let id = |o: &&TimetableOverride| SortValue::from(o.id.as_str());
    sort_by_keys(
        &mut ordered,
        &[(&created, Direction::Ascending), (&id, Direction::Ascending)],
    );

    let mut plan = MutationPlan::default();
    let mut reused = false;

    for current in ordered {
        if current.groups.is_disjoint(&edit.groups) {
            continue;
        }
        let Some(overlap) = current.range.intersect(&target) else {
            continue;
        };

        if !reused && current.range == target && current.groups == edit.groups {
            plan.updates.push(TimetableOverride {
                effect: edit.effect.clone(),
                ..current.clone()
            });
            reused = true;
            continue;
        }

        let mut remaining: Vec<(Progression, BTreeSet<GroupId>)> = current
            .range
            .difference(&target)
            .into_iter()
            .map(|range| (range, current.groups.clone()))
            .collect();
        let other_groups: BTreeSet<GroupId> =
            current.groups.difference(&edit.groups).cloned().collect();
        if !other_groups.is_empty() {
            remaining.push((overlap, other_groups));
        }

        let mut remaining = remaining.into_iter();
        let Some((range, groups)) = remaining.next() else {
            plan.deletes.push(current.id.clone());
            continue;
        };
        plan.updates.push(TimetableOverride {
            range,
            groups,
            ..current.clone()
        });
        plan.creates.extend(remaining.map(|(range, groups)| NewOverride {
            entry_id: current.entry_id.clone(),
            range,
            effect: current.effect.clone(),
            groups,
            created_at: current.created_at,
        }));
    }

    if !reused {
        plan.creates.push(NewOverride {
            entry_id: entry.id.clone(),
            range: target,
            effect: edit.effect.clone(),
            groups: edit.groups.clone(),
            created_at: now,
        });
    }

    debug!(
        entry_id = %entry.id,
        %target,
        updates = plan.updates.len(),
        creates = plan.creates.len(),
        deletes = plan.deletes.len(),
        "planned range edit"
    );
    Ok(plan)
}

fn validate(
    entry: &TimetableEntry,
    existing: &[TimetableOverride],
    edit: &RangeEdit,
) -> Result<Progression> {
    if edit.from > edit.until {
        return Err(TimetableError::Malformed(format!(
            "range start {} is after range end {}",
            edit.from, edit.until
        )));
    }
    if edit.every == 0 {
        return Err(TimetableError::Malformed(
            "range stride must be at least 1".to_string(),
        ));
    }
    let count = entry.effective_count();
    if edit.until >= count {
        return Err(TimetableError::Malformed(format!(
            "range end {} is outside the entry's {count} occurrences",
            edit.until
        )));
    }
    if edit.groups.is_empty() {
        return Err(TimetableError::Malformed(
            "at least one group is required".to_string(),
        ));
    }
    if !edit.effect.deletion && edit.effect == OverrideEffect::default() {
        return Err(TimetableError::Malformed(
            "update does not change anything".to_string(),
        ));
    }
    if let Some(duration) = edit.effect.duration_ms.filter(|duration| *duration < 0) {
        return Err(TimetableError::Malformed(format!(
            "occurrence duration cannot be negative, got {duration}"
        )));
    }
    if let Some(group) = edit.groups.iter().find(|group| !entry.has_group(group)) {
        return Err(TimetableError::Conflict(format!(
            "group {group} is not attached to entry {}",
            entry.id
        )));
    }
    if let Some(stray) = existing.iter().find(|o| o.entry_id != entry.id) {
        return Err(TimetableError::Conflict(format!(
            "override {} belongs to entry {}, not {}",
            stray.id, stray.entry_id, entry.id
        )));
    }

    let range = Progression::new(edit.from, edit.until, edit.every).ok_or_else(|| {
        TimetableError::Malformed(format!(
            "invalid range {}..={} every {}",
            edit.from, edit.until, edit.every
        ))
    })?;

    // Shifted starts and ends are monotonic in the index, so the range ends
    // bound every occurrence the edit touches.
    if !edit.effect.deletion {
        for index in [range.from(), range.until()] {
            if shifted_end(entry, index, &edit.effect).is_none() {
                return Err(TimetableError::Malformed(format!(
                    "shift of {}ms moves occurrence {index} out of range",
                    edit.effect.relative_start_ms
                )));
            }
        }
    }
    Ok(range)
}

fn shifted_end(entry: &TimetableEntry, index: u32, effect: &OverrideEffect) -> Option<DateTime<Utc>> {
    let start = offset_ms(entry.occurrence_start(index)?, effect.relative_start_ms)?;
    offset_ms(
        start,
        effect.duration_ms.unwrap_or(entry.occurrence_duration_ms),
    )
}
