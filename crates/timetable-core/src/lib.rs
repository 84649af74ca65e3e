//! Core domain logic for shared timetables.
//!
//! This crate contains the fundamental types and logic for:
//! - Expansion: laying repeating entries out as concrete occurrences
//! - Resolution: applying group-scoped overrides by user priority
//! - Mutation planning: splitting and merging overrides on range edits
//! - The [`Timetable`] service over an injected [`TimetableStore`]

pub mod detail;
pub mod entry;
mod error;
pub mod expand;
pub mod mutation;
pub mod priority;
pub mod progression;
pub mod resolve;
mod service;
pub mod sort;
mod store;
pub mod types;

pub use detail::{EntryDetail, OverrideDetail, TimetableItem};
pub use entry::{NewEntry, NewOverride, OverrideEffect, Repeat, TimetableEntry, TimetableOverride};
pub use error::{Result, TimetableError};
pub use expand::{Author, Occurrence, expand, expand_all};
pub use mutation::{MutationPlan, RangeEdit, plan_range_edit};
pub use priority::{GroupPriority, GroupRank, Memberships};
pub use progression::Progression;
pub use resolve::resolve;
pub use service::Timetable;
pub use store::TimetableStore;
pub use types::{EntryId, GroupId, OccurrenceId, OverrideId, UserId, ValidationError};
