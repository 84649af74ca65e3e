//! Group commands: create groups, add members, list groups.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, Subcommand};
use timetable_core::GroupRank;

use super::util::{open_database, parse_datetime, parse_group, parse_user};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum GroupAction {
    /// Create a group.
    Create {
        /// Group name, used as its identifier.
        name: String,
    },

    /// Add a user to a group, or change their priority in it.
    Join(JoinArgs),

    /// List groups with member counts.
    List,
}

#[derive(Debug, Args)]
pub struct JoinArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub group: String,

    /// Higher priorities win when overrides of several groups collide.
    #[arg(long, allow_hyphen_values = true)]
    pub priority: i64,

    /// Membership start; breaks ties between equal priorities (default: now).
    #[arg(long)]
    pub joined_at: Option<String>,
}

pub fn run<W: Write>(writer: &mut W, action: &GroupAction, config: &Config) -> Result<()> {
    run_at(writer, action, config, Utc::now())
}

fn run_at<W: Write>(
    writer: &mut W,
    action: &GroupAction,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut db = open_database(config)?;
    match action {
        GroupAction::Create { name } => {
            let group = parse_group(name)?;
            if db.create_group(&group, now)? {
                writeln!(writer, "Created group {group}")?;
            } else {
                writeln!(writer, "Group {group} already exists")?;
            }
        }
        GroupAction::Join(args) => {
            let user = parse_user(&args.user)?;
            let group = parse_group(&args.group)?;
            let joined_at = match &args.joined_at {
                Some(raw) => parse_datetime(raw)?,
                None => now,
            };
            db.join_group(
                &user,
                &group,
                GroupRank {
                    priority: args.priority,
                    joined_at,
                },
            )?;
            writeln!(
                writer,
                "{user} joined {group} with priority {}",
                args.priority
            )?;
        }
        GroupAction::List => {
            let groups = db.list_groups()?;
            if groups.is_empty() {
                writeln!(writer, "No groups.")?;
                return Ok(());
            }
            writeln!(writer, "{:<16}  {:>7}  Created", "Group", "Members")?;
            for group in groups {
                writeln!(
                    writer,
                    "{:<16}  {:>7}  {}",
                    group.id.as_str(),
                    group.members,
                    group.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
                )?;
            }
        }
    }
    Ok(())
}
