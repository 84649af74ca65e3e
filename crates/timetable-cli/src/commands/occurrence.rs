//! Occurrence command: drill down from a timetable row to its entry.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use super::entry::write_detail;
use super::util::{open_timetable, parse_user};
use crate::Config;

#[derive(Debug, Args)]
pub struct OccurrenceArgs {
    /// Occurrence id as printed by `timetable` (`index@uuid`).
    pub occurrence_id: String,

    #[arg(long)]
    pub user: String,
}

pub fn run<W: Write>(writer: &mut W, args: &OccurrenceArgs, config: &Config) -> Result<()> {
    let timetable = open_timetable(config)?;
    let user = parse_user(&args.user)?;
    let detail = timetable.occurrence_detail(&user, args.occurrence_id.trim())?;
    write_detail(writer, &detail)
}
