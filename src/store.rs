use std::fs;
use std::path::Path;

use rusqlite::{Connection, ErrorCode, OpenFlags};

use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};

/// VM instructions between deadline checks while a statement runs.
const PROGRESS_INTERVAL: i32 = 10_000;

/// Relational store holding raw records and every derived table.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, LiftError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| LiftError::Filesystem(err.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|err| LiftError::Storage(format!("open {}: {err}", path.display())))?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Opens an existing database without write access. Used by readers outside
    /// the ingestion run.
    pub fn open_read_only(path: &Path) -> Result<Self, LiftError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| LiftError::Storage(format!("open {}: {err}", path.display())))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, LiftError> {
        let conn =
            Connection::open_in_memory().map_err(|err| LiftError::Storage(err.to_string()))?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), LiftError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|err| LiftError::Storage(format!("create schema_version: {err}")))?;

        let version: i32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|err| LiftError::Storage(err.to_string()))?;

        if version < CURRENT_VERSION {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|err| LiftError::Storage(format!("apply schema: {err}")))?;
            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|err| LiftError::Storage(err.to_string()))?;
            tracing::debug!(version = CURRENT_VERSION, "database schema applied");
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` with a progress handler that interrupts any statement once
    /// `deadline` passes or is cancelled. The handler is removed afterwards.
    pub fn with_deadline<T, F>(&mut self, deadline: &Deadline, f: F) -> Result<T, LiftError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LiftError>,
    {
        watch_deadline(&self.conn, deadline);
        let result = f(&mut self.conn);
        self.conn.progress_handler(0, None::<fn() -> bool>);
        result
    }

    pub fn count_rows(&self, table: &str) -> Result<i64, LiftError> {
        // Table names cannot be bound as parameters.
        if !table.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(LiftError::Storage(format!("invalid table name: {table}")));
        }
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .map_err(|err| LiftError::Storage(format!("count {table}: {err}")))
    }
}

/// Points the connection's progress handler at `deadline`, replacing any
/// previous one.
pub fn watch_deadline(conn: &Connection, deadline: &Deadline) {
    let watched = deadline.clone();
    conn.progress_handler(PROGRESS_INTERVAL, Some(move || watched.should_stop()));
}

/// Converts a SQLite failure, classifying interrupted statements by the
/// deadline that triggered them.
pub fn storage_error(err: rusqlite::Error, context: &str, deadline: &Deadline) -> LiftError {
    if err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
        if deadline.cancel_flag().is_cancelled() {
            return LiftError::Cancelled(context.to_string());
        }
        return LiftError::Timeout(context.to_string());
    }
    LiftError::Storage(format!("{context}: {err}"))
}
