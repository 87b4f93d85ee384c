//! `SQLite`-backed implementation of [`StateBackend`].
//!
//! Uses a single `Mutex<Connection>` for thread safety.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::backend::StateBackend;
use crate::error::{self, StateError};
use crate::model::{RunStats, RunStatus, StreamName, WatermarkState};

/// Idempotent DDL for state tables.
const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS stream_watermarks (
    stream TEXT NOT NULL,
    replication_key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (stream, replication_key)
);

CREATE TABLE IF NOT EXISTS extract_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stream TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    records_emitted INTEGER DEFAULT 0,
    pages_fetched INTEGER DEFAULT 0,
    error_message TEXT
);
";

/// `SQLite`-backed state storage.
///
/// Create with [`SqliteStateBackend::open`] for file-backed persistence
/// or [`SqliteStateBackend::in_memory`] for tests.
pub struct SqliteStateBackend {
    conn: Mutex<Connection>,
}

impl SqliteStateBackend {
    /// Open or create a `SQLite` state database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created,
    /// or [`StateError::Sqlite`] if the database can't be opened.
    pub fn open(path: &Path) -> error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory `SQLite` backend (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Sqlite`] if the in-memory database can't
    /// be initialized.
    pub fn in_memory() -> error::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection lock.
    fn lock_conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Current UTC time as ISO-8601 with second precision.
    fn now_iso8601() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl StateBackend for SqliteStateBackend {
    fn get_watermark(
        &self,
        stream: &StreamName,
        replication_key: &str,
    ) -> error::Result<Option<WatermarkState>> {
        let conn = self.lock_conn()?;
        let row = conn
            .query_row(
                "SELECT value, updated_at FROM stream_watermarks \
                 WHERE stream = ?1 AND replication_key = ?2",
                (stream.as_str(), replication_key),
                |row| {
                    Ok(WatermarkState {
                        replication_key: replication_key.to_string(),
                        value: row.get(0)?,
                        updated_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn set_watermark(
        &self,
        stream: &StreamName,
        replication_key: &str,
        value: &str,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO stream_watermarks (stream, replication_key, value, updated_at) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (stream, replication_key) \
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (stream.as_str(), replication_key, value, Self::now_iso8601()),
        )?;
        Ok(())
    }

    fn start_run(&self, stream: &StreamName) -> error::Result<i64> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO extract_runs (stream, status, started_at) VALUES (?1, ?2, ?3)",
            (stream.as_str(), RunStatus::Running.as_str(), Self::now_iso8601()),
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(
        &self,
        run_id: i64,
        status: RunStatus,
        stats: &RunStats,
    ) -> error::Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "UPDATE extract_runs SET status = ?1, finished_at = ?2, \
             records_emitted = ?3, pages_fetched = ?4, error_message = ?5 \
             WHERE id = ?6",
            (
                status.as_str(),
                Self::now_iso8601(),
                i64::try_from(stats.records_emitted).unwrap_or(i64::MAX),
                i64::try_from(stats.pages_fetched).unwrap_or(i64::MAX),
                stats.error_message.as_deref(),
                run_id,
            ),
        )?;
        Ok(())
    }
}
