//! Shared utilities for CLI commands.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use timetable_core::{GroupId, Timetable, UserId};
use timetable_db::Database;

use crate::Config;

/// Pre-compiled regexes for relative time parsing.
static PAST_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());
static FUTURE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^in\s+(\d+)\s+(minute|hour|day|week)s?$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as RFC 3339, `now`, or relative time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - "now"
/// - Relative: "2 hours ago", "in 3 days", "1 week ago"
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    parse_datetime_at(s, Utc::now())
}

/// Like [`parse_datetime`], resolving relative times against `now`.
pub fn parse_datetime_at(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    let (caps, sign) = if let Some(caps) = PAST_TIME_RE.captures(s) {
        (caps, -1)
    } else if let Some(caps) = FUTURE_TIME_RE.captures(s) {
        (caps, 1)
    } else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z), 'now', or relative (e.g., '2 hours ago', 'in 3 days')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now + Duration::minutes(sign * n * minutes_per_unit))
}

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Opens the timetable service over the configured database.
pub fn open_timetable(config: &Config) -> Result<Timetable<Database>> {
    Ok(Timetable::new(open_database(config)?))
}

pub fn parse_user(raw: &str) -> Result<UserId> {
    UserId::new(raw.trim()).context("invalid user")
}

pub fn parse_group(raw: &str) -> Result<GroupId> {
    GroupId::new(raw.trim()).context("invalid group")
}

/// Parses a non-empty list of group names.
pub fn parse_groups(raw: &[String]) -> Result<BTreeSet<GroupId>> {
    let groups = raw
        .iter()
        .map(|group| parse_group(group))
        .collect::<Result<BTreeSet<_>>>()?;
    if groups.is_empty() {
        anyhow::bail!("at least one group is required");
    }
    Ok(groups)
}
