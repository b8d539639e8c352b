//! SQLite audit trail of synchronize passes.
//!
//! The journal lives next to the queue state (`~/.davka/state/journal.db`)
//! and is a disposable diagnostic aid: support staff read it to answer "when
//! did this device last sync and what happened". Losing it never loses queue
//! entries — the queue document is the durable state.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection};
use thiserror::Error;
use uuid::Uuid;

use crate::migrations;

/// Errors specific to journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// One synchronize pass, as recorded.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassRow {
    pub id: String,
    pub started_at: String,
    pub finished_at: String,
    pub batch_size: usize,
    pub processed: usize,
    pub retried: usize,
    pub dropped: usize,
    pub outcome: String,
    pub error: Option<String>,
}

/// Input for [`SyncJournal::record_pass`]; the row id and finish time are
/// stamped on write.
#[derive(Debug, Clone)]
pub struct PassRecord {
    pub started_at: String,
    pub batch_size: usize,
    pub processed: usize,
    pub retried: usize,
    pub dropped: usize,
    pub outcome: String,
    pub error: Option<String>,
}

/// SQLite connection wrapper for the sync pass log.
///
/// Intentionally not `Clone` or `Sync`; the queue holds it behind a `Mutex`.
pub struct SyncJournal {
    conn: Connection,
    path: PathBuf,
}

impl SyncJournal {
    /// Open (and migrate) the journal database at `path`.
    pub fn open(path: PathBuf) -> Result<Self, JournalError> {
        let conn = Connection::open(&path)?;
        migrations::run(&conn).map_err(JournalError::Migration)?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one pass to the log.
    pub fn record_pass(&self, record: &PassRecord) -> Result<(), JournalError> {
        self.conn.execute(
            "INSERT INTO sync_passes
                (id, started_at, finished_at, batch_size, processed, retried, dropped, outcome, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                Uuid::new_v4().to_string(),
                record.started_at,
                Utc::now().to_rfc3339(),
                record.batch_size as i64,
                record.processed as i64,
                record.retried as i64,
                record.dropped as i64,
                record.outcome,
                record.error,
            ],
        )?;
        Ok(())
    }

    /// The most recent passes, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<PassRow>, JournalError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, batch_size, processed, retried, dropped,
                    outcome, error_message
             FROM sync_passes
             ORDER BY finished_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(PassRow {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    batch_size: row.get::<_, i64>(3)? as usize,
                    processed: row.get::<_, i64>(4)? as usize,
                    retried: row.get::<_, i64>(5)? as usize,
                    dropped: row.get::<_, i64>(6)? as usize,
                    outcome: row.get(7)?,
                    error: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Total entries dropped across all recorded passes. Shown in support
    /// diagnostics next to the current queue length.
    pub fn total_dropped(&self) -> Result<u64, JournalError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(dropped), 0) FROM sync_passes",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }
}
