//! SQLite-based session log.
//!
//! Every finished breathing session the recorder accepts becomes one row.
//! Analytics in [`crate::stats`] are computed from these rows.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::engine::SessionSummary;
use crate::error::{DatabaseError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub protocol_id: String,
    pub protocol_name: String,
    pub target_secs: u32,
    pub completed_secs: u32,
    pub cycles: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/breathwork.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unusable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("breathwork.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if migration fails.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::QueryFailed(format!("migration: {e}")))?;
        Ok(Self { conn })
    }

    /// Append a finished session. Returns the new row id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_session(&self, summary: &SessionSummary) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions
                (protocol_id, protocol_name, target_secs, completed_secs, cycles, completed, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                summary.protocol_id,
                summary.protocol_name,
                summary.target_secs,
                summary.completed_secs,
                summary.cycles,
                summary.completed,
                timestamp(summary.started_at),
                timestamp(summary.ended_at),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Sessions that ended at or after `since`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored timestamp is corrupt.
    pub fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, protocol_id, protocol_name, target_secs, completed_secs, cycles, completed, started_at, ended_at
             FROM sessions
             WHERE ended_at >= ?1
             ORDER BY ended_at ASC",
        )?;
        let rows = stmt.query_map(params![timestamp(since)], RawRecord::from_row)?;
        rows.map(|row| row?.into_record()).collect()
    }

    /// Every recorded session, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored timestamp is corrupt.
    pub fn all_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, protocol_id, protocol_name, target_secs, completed_secs, cycles, completed, started_at, ended_at
             FROM sessions
             ORDER BY ended_at ASC",
        )?;
        let rows = stmt.query_map([], RawRecord::from_row)?;
        rows.map(|row| row?.into_record()).collect()
    }

    pub fn session_count(&self) -> Result<u64, DatabaseError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, u64>(0))?;
        Ok(count)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Row as stored, before timestamp parsing.
struct RawRecord {
    id: i64,
    protocol_id: String,
    protocol_name: String,
    target_secs: u32,
    completed_secs: u32,
    cycles: u32,
    completed: bool,
    started_at: String,
    ended_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            protocol_id: row.get(1)?,
            protocol_name: row.get(2)?,
            target_secs: row.get(3)?,
            completed_secs: row.get(4)?,
            cycles: row.get(5)?,
            completed: row.get(6)?,
            started_at: row.get(7)?,
            ended_at: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<SessionRecord, DatabaseError> {
        Ok(SessionRecord {
            id: self.id,
            protocol_id: self.protocol_id,
            protocol_name: self.protocol_name,
            target_secs: self.target_secs,
            completed_secs: self.completed_secs,
            cycles: self.cycles,
            completed: self.completed,
            started_at: parse_timestamp(&self.started_at)?,
            ended_at: parse_timestamp(&self.ended_at)?,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table: "sessions".into(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}
