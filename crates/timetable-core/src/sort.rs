//! Multi-key sorting with per-key direction.
//!
//! Timetable orderings mix integers, instants and identifiers, each ascending
//! or descending. Keys are extracted into [`SortValue`] so one comparator
//! handles every combination.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A single extracted sort key.
///
/// `Missing` sorts before every present value when ascending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Int(i64),
    Instant(DateTime<Utc>),
    Text(String),
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for SortValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<DateTime<Utc>> for SortValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for SortValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One sort key: how to extract the value and which way it orders.
pub type SortKey<'a, T> = (&'a dyn Fn(&T) -> SortValue, Direction);

/// Compares two items key by key; the first non-equal key decides.
pub fn compare_by_keys<T>(a: &T, b: &T, keys: &[SortKey<'_, T>]) -> Ordering {
    for (extract, direction) in keys {
        let ordering = extract(a).cmp(&extract(b));
        let ordering = match direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable in-place sort by the given keys.
pub fn sort_by_keys<T>(items: &mut [T], keys: &[SortKey<'_, T>]) {
    items.sort_by(|a, b| compare_by_keys(a, b, keys));
}
