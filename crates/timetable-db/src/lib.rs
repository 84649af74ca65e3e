//! Storage layer for shared timetables.
//!
//! Provides persistence for groups, memberships, entries and overrides using
//! `rusqlite`, and implements [`TimetableStore`] on top of it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! This means a `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! For multi-threaded access, either:
//! - Use a `Mutex<Database>` to serialize access
//! - Use separate `Database` instances per thread
//!
//! Range edits read and rewrite an entry's overrides inside a single
//! `BEGIN IMMEDIATE` transaction, so concurrent editors of the same file are
//! serialized by SQLite.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2025-03-03T09:00:00.000Z`). Lexicographic ordering matches
//! chronological ordering, which the window query relies on.
//!
//! ## Override Ranges
//!
//! An override row stores its index progression as `first_occurrence`,
//! `last_occurrence` and `frequency`, always normalized so that
//! `last_occurrence` is an index the progression actually hits.
//!
//! ## Audiences
//!
//! Entry and override audiences live in `timetable_entry_groups` and
//! `timetable_override_groups`; both cascade on delete.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use thiserror::Error;
use timetable_core::{
    EntryId, GroupId, GroupRank, Memberships, MutationPlan, NewEntry, OverrideEffect, OverrideId,
    Progression, Repeat, Result as TimetableResult, TimetableEntry, TimetableError,
    TimetableOverride, TimetableStore, UserId,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant.
    #[error("invalid record {record_id}: {message}")]
    InvalidRecord { record_id: String, message: String },
    /// A membership referenced a group that was never created.
    #[error("unknown group: {0}")]
    UnknownGroup(String),
}

impl From<DbError> for TimetableError {
    fn from(err: DbError) -> Self {
        Self::store(err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A group with its member count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: GroupId,
    pub created_at: DateTime<Utc>,
    pub members: usize,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbStats {
    pub groups: usize,
    pub memberships: usize,
    pub entries: usize,
    pub overrides: usize,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS timetable_groups (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS group_memberships (
                user_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                priority INTEGER NOT NULL,
                joined_at TEXT NOT NULL,
                PRIMARY KEY (user_id, group_id),
                FOREIGN KEY (group_id) REFERENCES timetable_groups(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_memberships_group ON group_memberships(group_id);

            -- repeat_every_ms: NULL means the entry never repeats
            CREATE TABLE IF NOT EXISTS timetable_entries (
                id TEXT PRIMARY KEY,
                event_start TEXT NOT NULL,
                occurrence_duration_ms INTEGER NOT NULL,
                occurrences_count INTEGER NOT NULL,
                repeat_every_ms INTEGER,
                location TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_event_start ON timetable_entries(event_start);

            CREATE TABLE IF NOT EXISTS timetable_entry_groups (
                entry_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                PRIMARY KEY (entry_id, group_id),
                FOREIGN KEY (entry_id) REFERENCES timetable_entries(id) ON DELETE CASCADE,
                FOREIGN KEY (group_id) REFERENCES timetable_groups(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_entry_groups_group ON timetable_entry_groups(group_id);

            -- first_occurrence/last_occurrence/frequency: normalized index progression
            -- location: NULL keeps the current location
            CREATE TABLE IF NOT EXISTS timetable_overrides (
                id TEXT PRIMARY KEY,
                entry_id TEXT NOT NULL,
                first_occurrence INTEGER NOT NULL,
                last_occurrence INTEGER NOT NULL,
                frequency INTEGER NOT NULL DEFAULT 1,
                relative_start_ms INTEGER NOT NULL DEFAULT 0,
                duration_ms INTEGER,
                location TEXT,
                deletion INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (entry_id) REFERENCES timetable_entries(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_overrides_entry ON timetable_overrides(entry_id);

            CREATE TABLE IF NOT EXISTS timetable_override_groups (
                override_id TEXT NOT NULL,
                group_id TEXT NOT NULL,
                PRIMARY KEY (override_id, group_id),
                FOREIGN KEY (override_id) REFERENCES timetable_overrides(id) ON DELETE CASCADE,
                FOREIGN KEY (group_id) REFERENCES timetable_groups(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_override_groups_group ON timetable_override_groups(group_id);
            ",
        )?;
        Ok(())
    }

    /// Creates a group, returning `false` when it already exists.
    pub fn create_group(&mut self, id: &GroupId, now: DateTime<Utc>) -> Result<bool, DbError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO timetable_groups (id, created_at) VALUES (?, ?)",
            params![id.as_str(), format_timestamp(now)],
        )?;
        if inserted > 0 {
            info!(group_id = %id, "created group");
        }
        Ok(inserted > 0)
    }

    /// Lists groups ordered by ID.
    pub fn list_groups(&self) -> Result<Vec<GroupSummary>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT g.id, g.created_at, COUNT(m.user_id)
            FROM timetable_groups g
            LEFT JOIN group_memberships m ON m.group_id = g.id
            GROUP BY g.id, g.created_at
            ORDER BY g.id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, usize>(2)?,
            ))
        })?;
        let mut groups = Vec::new();
        for row in rows {
            let (id, created_at, members) = row?;
            groups.push(GroupSummary {
                created_at: parse_timestamp(&created_at, &id)?,
                id: parse_id(GroupId::new(id.as_str()), &id)?,
                members,
            });
        }
        Ok(groups)
    }

    /// Adds `user` to `group`, or updates the rank of an existing membership.
    pub fn join_group(
        &mut self,
        user: &UserId,
        group: &GroupId,
        rank: GroupRank,
    ) -> Result<(), DbError> {
        if !group_exists(&self.conn, group)? {
            return Err(DbError::UnknownGroup(group.to_string()));
        }
        self.conn.execute(
            "
            INSERT INTO group_memberships (user_id, group_id, priority, joined_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, group_id) DO UPDATE SET
                priority = excluded.priority,
                joined_at = excluded.joined_at
            ",
            params![
                user.as_str(),
                group.as_str(),
                rank.priority,
                format_timestamp(rank.joined_at),
            ],
        )?;
        info!(user_id = %user, group_id = %group, priority = rank.priority, "joined group");
        Ok(())
    }

    /// Counts rows in each table.
    pub fn stats(&self) -> Result<DbStats, DbError> {
        let count = |table: &str| -> Result<usize, DbError> {
            let count = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, usize>(0)
                })?;
            Ok(count)
        };
        Ok(DbStats {
            groups: count("timetable_groups")?,
            memberships: count("group_memberships")?,
            entries: count("timetable_entries")?,
            overrides: count("timetable_overrides")?,
        })
    }
}

impl TimetableStore for Database {
    fn memberships(&self, user: &UserId) -> TimetableResult<Memberships> {
        Ok(load_memberships(&self.conn, user)?)
    }

    fn entries_in_window(
        &self,
        groups: &[GroupId],
        window_end: DateTime<Utc>,
    ) -> TimetableResult<Vec<TimetableEntry>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<Value> = groups.iter().map(|g| text(g.as_str())).collect();
        values.push(Value::Text(format_timestamp(window_end)));
        let clause = format!(
            "e.id IN (SELECT entry_id FROM timetable_entry_groups WHERE group_id IN ({}))
             AND e.event_start < ?",
            placeholders(groups.len())
        );
        let entries = query_entries(&self.conn, &clause, values)?;
        debug!(
            groups = groups.len(),
            entries = entries.len(),
            "loaded entries in window"
        );
        Ok(entries)
    }

    fn overrides_for_entries(
        &self,
        entries: &[EntryId],
        groups: &[GroupId],
        index_range: Option<(u32, u32)>,
    ) -> TimetableResult<Vec<TimetableOverride>> {
        if entries.is_empty() || groups.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<Value> = entries.iter().map(|e| text(e.as_str())).collect();
        values.extend(groups.iter().map(|g| text(g.as_str())));
        let mut clause = format!(
            "o.entry_id IN ({}) AND o.id IN (
                SELECT override_id FROM timetable_override_groups WHERE group_id IN ({})
            )",
            placeholders(entries.len()),
            placeholders(groups.len())
        );
        if let Some((lowest, highest)) = index_range {
            clause.push_str(" AND o.first_occurrence <= ? AND o.last_occurrence >= ?");
            values.push(Value::Integer(i64::from(highest)));
            values.push(Value::Integer(i64::from(lowest)));
        }
        let overrides = query_overrides(&self.conn, &clause, values)?;
        debug!(
            entries = entries.len(),
            overrides = overrides.len(),
            "loaded overrides"
        );
        Ok(overrides)
    }

    fn entry(&self, id: &EntryId) -> TimetableResult<Option<TimetableEntry>> {
        Ok(load_entry(&self.conn, id)?)
    }

    fn override_by_id(&self, id: &OverrideId) -> TimetableResult<Option<TimetableOverride>> {
        let found = query_overrides(&self.conn, "o.id = ?", vec![text(id.as_str())])?;
        Ok(found.into_iter().next())
    }

    fn group_exists(&self, id: &GroupId) -> TimetableResult<bool> {
        Ok(group_exists(&self.conn, id)?)
    }

    fn insert_entry(&mut self, entry: NewEntry, now: DateTime<Utc>) -> TimetableResult<TimetableEntry> {
        let id = EntryId::new(Uuid::new_v4().to_string())?;
        let entry = entry.into_entry(id, now);

        let tx = self.conn.transaction().map_err(DbError::from)?;
        insert_entry_rows(&tx, &entry)?;
        tx.commit().map_err(DbError::from)?;

        info!(
            entry_id = %entry.id,
            occurrences = entry.occurrences_count,
            "inserted timetable entry"
        );
        Ok(entry)
    }

    fn edit_overrides<F>(&mut self, entry_id: &EntryId, planner: F) -> TimetableResult<()>
    where
        F: FnOnce(&TimetableEntry, &[TimetableOverride]) -> TimetableResult<MutationPlan>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;

        let entry = load_entry(&tx, entry_id)?.ok_or(TimetableError::NotFound)?;
        let existing = query_overrides(&tx, "o.entry_id = ?", vec![text(entry_id.as_str())])?;
        let plan = planner(&entry, &existing)?;
        apply_plan(&tx, &plan)?;
        tx.commit().map_err(DbError::from)?;

        debug!(
            entry_id = %entry_id,
            updated = plan.updates.len(),
            created = plan.creates.len(),
            deleted = plan.deletes.len(),
            "applied override plan"
        );
        Ok(())
    }
}

fn insert_entry_rows(conn: &Connection, entry: &TimetableEntry) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT INTO timetable_entries
        (id, event_start, occurrence_duration_ms, occurrences_count, repeat_every_ms, location, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            entry.id.as_str(),
            format_timestamp(entry.event_start),
            entry.occurrence_duration_ms,
            entry.occurrences_count,
            entry.repeat.as_ms(),
            entry.location,
            format_timestamp(entry.created_at),
        ],
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO timetable_entry_groups (entry_id, group_id) VALUES (?, ?)")?;
    for group in &entry.groups {
        stmt.execute(params![entry.id.as_str(), group.as_str()])?;
    }
    Ok(())
}

fn apply_plan(conn: &Connection, plan: &MutationPlan) -> Result<(), DbError> {
    {
        let mut stmt = conn.prepare("DELETE FROM timetable_overrides WHERE id = ?")?;
        for id in &plan.deletes {
            stmt.execute([id.as_str()])?;
        }
    }
    {
        let mut stmt = conn.prepare(
            "
            UPDATE timetable_overrides
            SET first_occurrence = ?, last_occurrence = ?, frequency = ?,
                relative_start_ms = ?, duration_ms = ?, location = ?, deletion = ?
            WHERE id = ?
            ",
        )?;
        let mut clear_groups =
            conn.prepare("DELETE FROM timetable_override_groups WHERE override_id = ?")?;
        for update in &plan.updates {
            let effect = &update.effect;
            stmt.execute(params![
                update.range.from(),
                update.range.until(),
                update.range.every(),
                effect.relative_start_ms,
                effect.duration_ms,
                effect.location,
                effect.deletion,
                update.id.as_str(),
            ])?;
            clear_groups.execute([update.id.as_str()])?;
            insert_override_groups(conn, &update.id, &update.groups)?;
        }
    }
    {
        let mut stmt = conn.prepare(
            "
            INSERT INTO timetable_overrides
            (id, entry_id, first_occurrence, last_occurrence, frequency,
             relative_start_ms, duration_ms, location, deletion, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )?;
        for create in &plan.creates {
            let id = parse_id(OverrideId::new(Uuid::new_v4().to_string()), "new override")?;
            let effect = &create.effect;
            stmt.execute(params![
                id.as_str(),
                create.entry_id.as_str(),
                create.range.from(),
                create.range.until(),
                create.range.every(),
                effect.relative_start_ms,
                effect.duration_ms,
                effect.location,
                effect.deletion,
                format_timestamp(create.created_at),
            ])?;
            insert_override_groups(conn, &id, &create.groups)?;
        }
    }
    Ok(())
}

fn insert_override_groups(
    conn: &Connection,
    id: &OverrideId,
    groups: &BTreeSet<GroupId>,
) -> Result<(), DbError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO timetable_override_groups (override_id, group_id) VALUES (?, ?)",
    )?;
    for group in groups {
        stmt.execute(params![id.as_str(), group.as_str()])?;
    }
    Ok(())
}

fn group_exists(conn: &Connection, id: &GroupId) -> Result<bool, DbError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM timetable_groups WHERE id = ?",
            [id.as_str()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn load_memberships(conn: &Connection, user: &UserId) -> Result<Memberships, DbError> {
    let mut stmt = conn.prepare(
        "
        SELECT group_id, priority, joined_at
        FROM group_memberships
        WHERE user_id = ?
        ",
    )?;
    let rows = stmt.query_map([user.as_str()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;
    let mut memberships = Memberships::new();
    for row in rows {
        let (group, priority, joined_at) = row?;
        let joined_at = parse_timestamp(&joined_at, &group)?;
        memberships.insert(
            parse_id(GroupId::new(group.as_str()), &group)?,
            GroupRank { priority, joined_at },
        );
    }
    Ok(memberships)
}

fn load_entry(conn: &Connection, id: &EntryId) -> Result<Option<TimetableEntry>, DbError> {
    let found = query_entries(conn, "e.id = ?", vec![text(id.as_str())])?;
    Ok(found.into_iter().next())
}

struct EntryRow {
    id: String,
    event_start: String,
    occurrence_duration_ms: i64,
    occurrences_count: u32,
    repeat_every_ms: Option<i64>,
    location: String,
    created_at: String,
}

impl EntryRow {
    fn into_entry(self, groups: BTreeSet<GroupId>) -> Result<TimetableEntry, DbError> {
        let repeat = Repeat::from_ms(self.repeat_every_ms).map_err(|err| invalid(&self.id, err))?;
        Ok(TimetableEntry {
            event_start: parse_timestamp(&self.event_start, &self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            occurrence_duration_ms: self.occurrence_duration_ms,
            occurrences_count: self.occurrences_count,
            repeat,
            location: self.location,
            groups,
            id: parse_id(EntryId::new(self.id.as_str()), &self.id)?,
        })
    }
}

/// Loads entries matching `clause` (over alias `e`) with their groups.
fn query_entries(
    conn: &Connection,
    clause: &str,
    values: Vec<Value>,
) -> Result<Vec<TimetableEntry>, DbError> {
    let query = format!(
        "
        SELECT e.id, e.event_start, e.occurrence_duration_ms, e.occurrences_count,
               e.repeat_every_ms, e.location, e.created_at
        FROM timetable_entries e
        WHERE {clause}
        ORDER BY e.event_start ASC, e.id ASC
        "
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(EntryRow {
            id: row.get(0)?,
            event_start: row.get(1)?,
            occurrence_duration_ms: row.get(2)?,
            occurrences_count: row.get(3)?,
            repeat_every_ms: row.get(4)?,
            location: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    let mut entry_rows = Vec::new();
    for row in rows {
        entry_rows.push(row?);
    }

    let ids: Vec<&str> = entry_rows.iter().map(|row| row.id.as_str()).collect();
    let mut groups = load_groups(conn, "timetable_entry_groups", "entry_id", &ids)?;
    entry_rows
        .into_iter()
        .map(|row| {
            let entry_groups = groups.remove(&row.id).unwrap_or_default();
            row.into_entry(entry_groups)
        })
        .collect()
}

struct OverrideRow {
    id: String,
    entry_id: String,
    first_occurrence: u32,
    last_occurrence: u32,
    frequency: u32,
    relative_start_ms: i64,
    duration_ms: Option<i64>,
    location: Option<String>,
    deletion: bool,
    created_at: String,
}

impl OverrideRow {
    fn into_override(self, groups: BTreeSet<GroupId>) -> Result<TimetableOverride, DbError> {
        let range = Progression::new(self.first_occurrence, self.last_occurrence, self.frequency)
            .ok_or_else(|| DbError::InvalidRecord {
                record_id: self.id.clone(),
                message: format!(
                    "invalid range {}..={} every {}",
                    self.first_occurrence, self.last_occurrence, self.frequency
                ),
            })?;
        Ok(TimetableOverride {
            entry_id: parse_id(EntryId::new(self.entry_id.as_str()), &self.id)?,
            range,
            effect: OverrideEffect {
                relative_start_ms: self.relative_start_ms,
                duration_ms: self.duration_ms,
                location: self.location,
                deletion: self.deletion,
            },
            groups,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            id: parse_id(OverrideId::new(self.id.as_str()), &self.id)?,
        })
    }
}

/// Loads overrides matching `clause` (over alias `o`) with their groups.
fn query_overrides(
    conn: &Connection,
    clause: &str,
    values: Vec<Value>,
) -> Result<Vec<TimetableOverride>, DbError> {
    let query = format!(
        "
        SELECT o.id, o.entry_id, o.first_occurrence, o.last_occurrence, o.frequency,
               o.relative_start_ms, o.duration_ms, o.location, o.deletion, o.created_at
        FROM timetable_overrides o
        WHERE {clause}
        ORDER BY o.created_at ASC, o.id ASC
        "
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(OverrideRow {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            first_occurrence: row.get(2)?,
            last_occurrence: row.get(3)?,
            frequency: row.get(4)?,
            relative_start_ms: row.get(5)?,
            duration_ms: row.get(6)?,
            location: row.get(7)?,
            deletion: row.get(8)?,
            created_at: row.get(9)?,
        })
    })?;
    let mut override_rows = Vec::new();
    for row in rows {
        override_rows.push(row?);
    }

    let ids: Vec<&str> = override_rows.iter().map(|row| row.id.as_str()).collect();
    let mut groups = load_groups(conn, "timetable_override_groups", "override_id", &ids)?;
    override_rows
        .into_iter()
        .map(|row| {
            let override_groups = groups.remove(&row.id).unwrap_or_default();
            row.into_override(override_groups)
        })
        .collect()
}

/// Loads the audience of each owner in `ids` from a `(owner, group_id)` table.
fn load_groups(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    ids: &[&str],
) -> Result<HashMap<String, BTreeSet<GroupId>>, DbError> {
    let mut groups: HashMap<String, BTreeSet<GroupId>> = HashMap::new();
    if ids.is_empty() {
        return Ok(groups);
    }
    let query = format!(
        "SELECT {owner_column}, group_id FROM {table} WHERE {owner_column} IN ({})",
        placeholders(ids.len())
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(params_from_iter(ids.iter()), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (owner, group) = row?;
        let group = parse_id(GroupId::new(group.as_str()), &owner)?;
        groups.entry(owner).or_default().insert(group);
    }
    Ok(groups)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn parse_id<T>(
    parsed: Result<T, timetable_core::ValidationError>,
    record_id: &str,
) -> Result<T, DbError> {
    parsed.map_err(|err| invalid(record_id, err))
}

fn invalid(record_id: &str, err: impl std::fmt::Display) -> DbError {
    DbError::InvalidRecord {
        record_id: record_id.to_string(),
        message: err.to_string(),
    }
}

fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
