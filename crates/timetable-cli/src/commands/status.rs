//! Status command for showing what the database holds.

use std::io::Write;

use anyhow::Result;

use super::util::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let stats = db.stats()?;

    writeln!(writer, "Timetable status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Groups: {}", stats.groups)?;
    writeln!(writer, "Memberships: {}", stats.memberships)?;
    writeln!(writer, "Entries: {}", stats.entries)?;
    writeln!(writer, "Overrides: {}", stats.overrides)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use timetable_core::{GroupId, GroupRank, UserId};
    use timetable_db::Database;

    use insta::assert_snapshot;

    #[test]
    fn status_command_outputs_row_counts() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("timetable.db");
        let mut db = Database::open(&db_path).unwrap();

        let now = Utc::now();
        for group in ["g1", "g2"] {
            db.create_group(&GroupId::new(group).unwrap(), now).unwrap();
        }
        db.join_group(
            &UserId::new("alice").unwrap(),
            &GroupId::new("g1").unwrap(),
            GroupRank {
                priority: 1,
                joined_at: now,
            },
        )
        .unwrap();

        let config = Config {
            database_path: db_path.clone(),
            default_window_ms: 86_400_000,
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/timetable.db");
        assert_snapshot!(output, @r"
        Timetable status
        Database: [TEMP]/timetable.db
        Groups: 2
        Memberships: 1
        Entries: 0
        Overrides: 0
        ");
    }
}
