//! CLI subcommand implementations.

pub mod entry;
pub mod group;
pub mod occurrence;
pub mod status;
pub mod timetable;
pub mod util;
