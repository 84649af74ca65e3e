//! Override resolution over expanded occurrences.
//!
//! # Algorithm
//!
//! 1. Drop overrides that share no group with the user.
//! 2. Order the rest ascending by the user's best rank among the override's
//!    groups, so the most important override is applied last and wins.
//! 3. Apply each override to the aligned occurrences of its entry. Offsets are
//!    always taken from the original occurrence, never from an earlier
//!    override's output. Deletions leave a tombstone that a later override
//!    may fill again.
//! 4. Drop tombstones and order by `(start, end, author id)`.

use std::collections::HashMap;

use tracing::debug;

use crate::entry::{TimetableOverride, offset_ms};
use crate::expand::{Author, Occurrence};
use crate::priority::{GroupPriority, GroupRank};
use crate::sort::{Direction, SortValue, sort_by_keys};
use crate::types::EntryId;

/// Applies `overrides` to `expanded` as seen by the user owning `ranks`.
pub fn resolve<P: GroupPriority>(
    expanded: Vec<Occurrence>,
    overrides: &[TimetableOverride],
    ranks: &P,
) -> Vec<Occurrence> {
    let ordered = application_order(overrides, ranks);

    let mut by_entry: HashMap<EntryId, Vec<usize>> = HashMap::new();
    for (slot, occurrence) in expanded.iter().enumerate() {
        by_entry
            .entry(occurrence.entry_id.clone())
            .or_default()
            .push(slot);
    }

    let originals = expanded;
    let mut slots: Vec<Option<Occurrence>> = originals.iter().cloned().map(Some).collect();

    for candidate in &ordered {
        let Some(entry_slots) = by_entry.get(&candidate.entry_id) else {
            continue;
        };
        for &slot in entry_slots {
            let original = &originals[slot];
            let Some(position) = candidate.range.position_of(original.index) else {
                continue;
            };
            slots[slot] = apply(candidate, position, original, slots[slot].as_ref());
        }
    }

    let mut resolved: Vec<Occurrence> = slots.into_iter().flatten().collect();
    sort_occurrences(&mut resolved);
    debug!(
        overrides = ordered.len(),
        occurrences = resolved.len(),
        "resolved timetable occurrences"
    );
    resolved
}

/// Eligible overrides in the order they are applied.
fn application_order<'a, P: GroupPriority>(
    overrides: &'a [TimetableOverride],
    ranks: &P,
) -> Vec<&'a TimetableOverride> {
    let mut ranked: Vec<(GroupRank, &TimetableOverride)> = overrides
        .iter()
        .filter_map(|candidate| {
            ranks
                .best_rank(&candidate.groups)
                .map(|rank| (rank, candidate))
        })
        .collect();

    let priority = |(rank, _): &(GroupRank, &TimetableOverride)| SortValue::from(rank.priority);
    let joined = |(rank, _): &(GroupRank, &TimetableOverride)| SortValue::from(rank.joined_at);
    let created = |(_, o): &(GroupRank, &TimetableOverride)| SortValue::from(o.created_at);
    let id = |(_, o): &(GroupRank, &TimetableOverride)| SortValue::from(o.id.as_str());
    sort_by_keys(
        &mut ranked,
        &[
            (&priority, Direction::Ascending),
            (&joined, Direction::Ascending),
            (&created, Direction::Ascending),
            (&id, Direction::Ascending),
        ],
    );
    ranked.into_iter().map(|(_, candidate)| candidate).collect()
}

/// New content of one slot after `candidate` claims it.
fn apply(
    candidate: &TimetableOverride,
    position: u32,
    original: &Occurrence,
    current: Option<&Occurrence>,
) -> Option<Occurrence> {
    let effect = &candidate.effect;
    if effect.deletion {
        return None;
    }

    let start = offset_ms(original.start, effect.relative_start_ms).unwrap_or(original.start);
    let duration = effect.duration_ms.unwrap_or_else(|| original.duration_ms());
    let end = offset_ms(start, duration).unwrap_or(start);
    let location = effect
        .location
        .clone()
        .or_else(|| current.map(|occurrence| occurrence.location.clone()))
        .unwrap_or_else(|| original.location.clone());

    Some(Occurrence {
        entry_id: original.entry_id.clone(),
        index: original.index,
        start,
        end,
        location,
        author: Author::Override {
            id: candidate.id.clone(),
            position,
        },
    })
}

/// Orders occurrences by `(start, end, author id)`.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    let start = |o: &Occurrence| SortValue::from(o.start);
    let end = |o: &Occurrence| SortValue::from(o.end);
    let author = |o: &Occurrence| SortValue::from(o.author.record_id());
    sort_by_keys(
        occurrences,
        &[
            (&start, Direction::Ascending),
            (&end, Direction::Ascending),
            (&author, Direction::Ascending),
        ],
    );
}
