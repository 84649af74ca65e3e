//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::entry::EntryAction;
use crate::commands::group::GroupAction;
use crate::commands::occurrence::OccurrenceArgs;
use crate::commands::timetable::TimetableArgs;

/// Shared group timetables.
///
/// Repeating entries are visible to groups; overrides change ranges of
/// occurrences for some of those groups, and each user sees the version
/// their highest-priority group decided on.
#[derive(Debug, Parser)]
#[command(name = "timetable", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage groups and memberships.
    #[command(subcommand)]
    Group(GroupAction),

    /// Create, inspect and edit entries.
    #[command(subcommand)]
    Entry(EntryAction),

    /// Show a user's occurrences in a time window.
    Timetable(TimetableArgs),

    /// Show the entry behind an occurrence id.
    Occurrence(OccurrenceArgs),

    /// Show database location and row counts.
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_range_edit_with_several_groups() {
        let cli = Cli::try_parse_from([
            "timetable",
            "entry",
            "update",
            "entry-1",
            "--user",
            "alice",
            "--from",
            "0",
            "--until",
            "4",
            "--every",
            "2",
            "--for",
            "g1",
            "g2",
            "--shift-ms",
            "-900000",
        ])
        .unwrap();
        let Some(Commands::Entry(EntryAction::Update(args))) = cli.command else {
            panic!("expected entry update");
        };
        assert_eq!(args.range.for_groups, vec!["g1", "g2"]);
        assert_eq!(args.range.every, 2);
        assert_eq!(args.shift_ms, -900_000);
        assert_eq!(args.location, None);
    }

    #[test]
    fn range_edit_requires_groups() {
        let result = Cli::try_parse_from([
            "timetable",
            "entry",
            "delete-range",
            "entry-1",
            "--user",
            "alice",
            "--from",
            "0",
            "--until",
            "0",
        ]);
        assert!(result.is_err());
    }
}
