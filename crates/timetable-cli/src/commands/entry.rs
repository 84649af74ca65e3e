//! Entry commands: create, show, and range edits.
//!
//! Every command prints the affected entry as pretty JSON, in the shape the
//! entry detail view serializes to.

use std::io::Write;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use timetable_core::{EntryDetail, EntryId, NewEntry, OverrideEffect, RangeEdit, Repeat};

use super::util::{open_timetable, parse_datetime, parse_groups, parse_user};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum EntryAction {
    /// Create a (possibly repeating) entry.
    Create(CreateArgs),

    /// Show an entry with the overrides visible to a user.
    Show(ShowArgs),

    /// Change a range of occurrences for some of the entry's groups.
    Update(UpdateArgs),

    /// Cancel a range of occurrences for some of the entry's groups.
    DeleteRange(DeleteRangeArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Start of the first occurrence (RFC 3339, `now`, `in 2 days`, ...).
    #[arg(long)]
    pub start: String,

    #[arg(long)]
    pub duration_ms: i64,

    /// Number of occurrences.
    #[arg(long, default_value_t = 1)]
    pub count: u32,

    /// Stride between occurrence starts; omit for a one-off entry.
    #[arg(long)]
    pub repeat_every_ms: Option<i64>,

    #[arg(long)]
    pub location: String,

    /// Groups that see the entry.
    #[arg(long = "group", required = true, num_args = 1..)]
    pub groups: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub entry_id: String,

    #[arg(long)]
    pub user: String,
}

/// Occurrence indices `from..=until`, every `every`-th, for some groups.
#[derive(Debug, Args)]
pub struct RangeArgs {
    #[arg(long)]
    pub from: u32,

    #[arg(long)]
    pub until: u32,

    #[arg(long, default_value_t = 1)]
    pub every: u32,

    /// Groups the change applies to.
    #[arg(long = "for", required = true, num_args = 1..)]
    pub for_groups: Vec<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub entry_id: String,

    #[arg(long)]
    pub user: String,

    #[command(flatten)]
    pub range: RangeArgs,

    /// New location for the selected occurrences.
    #[arg(long)]
    pub location: Option<String>,

    /// Offset added to each selected occurrence's start.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub shift_ms: i64,

    /// New duration of the selected occurrences.
    #[arg(long)]
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Args)]
pub struct DeleteRangeArgs {
    pub entry_id: String,

    #[arg(long)]
    pub user: String,

    #[command(flatten)]
    pub range: RangeArgs,
}

pub fn run<W: Write>(writer: &mut W, action: &EntryAction, config: &Config) -> Result<()> {
    let mut timetable = open_timetable(config)?;
    let detail = match action {
        EntryAction::Create(args) => {
            let entry = NewEntry {
                event_start: parse_datetime(&args.start)?,
                occurrence_duration_ms: args.duration_ms,
                occurrences_count: args.count,
                repeat: Repeat::from_ms(args.repeat_every_ms).context("invalid repeat stride")?,
                location: args.location.clone(),
                groups: parse_groups(&args.groups)?,
            };
            timetable.create_entry(entry)?
        }
        EntryAction::Show(args) => {
            let user = parse_user(&args.user)?;
            timetable.entry_detail(&user, &parse_entry_id(&args.entry_id)?)?
        }
        EntryAction::Update(args) => {
            let user = parse_user(&args.user)?;
            let effect = OverrideEffect {
                relative_start_ms: args.shift_ms,
                duration_ms: args.duration_ms,
                location: args.location.clone(),
                deletion: false,
            };
            let edit = range_edit(&args.range, effect)?;
            timetable.update_range(&user, &parse_entry_id(&args.entry_id)?, &edit)?
        }
        EntryAction::DeleteRange(args) => {
            let user = parse_user(&args.user)?;
            let range = &args.range;
            timetable.delete_range(
                &user,
                &parse_entry_id(&args.entry_id)?,
                (range.from, range.until, range.every),
                parse_groups(&range.for_groups)?,
            )?
        }
    };
    write_detail(writer, &detail)
}

fn range_edit(range: &RangeArgs, effect: OverrideEffect) -> Result<RangeEdit> {
    Ok(RangeEdit::update(
        range.from,
        range.until,
        range.every,
        parse_groups(&range.for_groups)?,
        effect,
    ))
}

fn parse_entry_id(raw: &str) -> Result<EntryId> {
    EntryId::new(raw.trim()).context("invalid entry id")
}

pub fn write_detail<W: Write>(writer: &mut W, detail: &EntryDetail) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(detail)?)?;
    Ok(())
}
