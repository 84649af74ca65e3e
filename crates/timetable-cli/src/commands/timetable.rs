//! Timetable command: a user's resolved occurrences in a time window.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use timetable_core::TimetableItem;

use super::util::{open_timetable, parse_datetime, parse_user};
use crate::Config;

#[derive(Debug, Args)]
pub struct TimetableArgs {
    #[arg(long)]
    pub user: String,

    /// Window start (default: now).
    #[arg(long)]
    pub start: Option<String>,

    /// Window length (default: `default_window_ms` from the config).
    #[arg(long)]
    pub window_ms: Option<i64>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &TimetableArgs, config: &Config) -> Result<()> {
    let timetable = open_timetable(config)?;
    let user = parse_user(&args.user)?;
    let start = match &args.start {
        Some(raw) => parse_datetime(raw)?,
        None => Utc::now(),
    };
    let window_ms = args.window_ms.unwrap_or(config.default_window_ms);

    let items = timetable.timetable(&user, start, window_ms)?;
    tracing::debug!(user = %user, items = items.len(), "rendered timetable");

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&items)?)?;
    } else {
        write!(writer, "{}", format_items(&items))?;
    }
    Ok(())
}

fn instant(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format occurrences for human-readable output.
pub fn format_items(items: &[TimetableItem]) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    if items.is_empty() {
        writeln!(output, "No occurrences in this window.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{:<24}  {:<24}  {:<16}  Occurrence",
        "Start", "End", "Location"
    )
    .unwrap();
    for item in items {
        // Truncate by characters, not bytes, to avoid panics on multi-byte UTF-8
        let location = if item.location.chars().count() > 16 {
            format!("{}...", item.location.chars().take(13).collect::<String>())
        } else {
            item.location.clone()
        };
        writeln!(
            output,
            "{:<24}  {:<24}  {:<16}  {}",
            instant(item.start),
            instant(item.end),
            location,
            item.occurrence_id
        )
        .unwrap();
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use insta::assert_snapshot;
    use timetable_core::OccurrenceId;

    fn item(hour: u32, location: &str) -> TimetableItem {
        TimetableItem {
            occurrence_id: OccurrenceId::new(hour, "6f1c1b6e-6d8f-4c7e-9a57-2f3b8d1e0a42"),
            start: Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 3, 3, hour, 30, 0).unwrap(),
            location: location.to_string(),
        }
    }

    #[test]
    fn formats_table() {
        let output = format_items(&[item(9, "Room 101"), item(11, "Lecture Hall Nord-Ost")]);
        assert_snapshot!(output, @r"
        Start                     End                       Location          Occurrence
        2025-03-03T09:00:00.000Z  2025-03-03T09:30:00.000Z  Room 101          9@6f1c1b6e-6d8f-4c7e-9a57-2f3b8d1e0a42
        2025-03-03T11:00:00.000Z  2025-03-03T11:30:00.000Z  Lecture Hall ...  11@6f1c1b6e-6d8f-4c7e-9a57-2f3b8d1e0a42
        ");
    }

    #[test]
    fn formats_empty_window() {
        assert_snapshot!(format_items(&[]), @"No occurrences in this window.");
    }

    #[test]
    fn negative_window_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("timetable.db"),
            default_window_ms: 86_400_000,
        };
        let args = TimetableArgs {
            user: "alice".to_string(),
            start: Some("2025-03-03T00:00:00Z".to_string()),
            window_ms: Some(-1),
            json: true,
        };
        let mut output = Vec::new();
        let err = run(&mut output, &args, &config).unwrap_err();
        assert!(err.to_string().starts_with("malformed input"));
    }

    #[test]
    fn unknown_user_gets_empty_json() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("timetable.db"),
            default_window_ms: 86_400_000,
        };
        let args = TimetableArgs {
            user: "nobody".to_string(),
            start: None,
            window_ms: None,
            json: true,
        };
        let mut output = Vec::new();
        run(&mut output, &args, &config).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"[]");
    }
}
