use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use kubecred_core::{CredentialHash, CredentialRecord, VerificationLogEntry, WorkerId};

use crate::error::StoreError;
use crate::traits::{CredentialStore, VerificationLog};

/// How long a writer waits on a lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    credential_hash TEXT UNIQUE NOT NULL,
    worker_id TEXT NOT NULL,
    issued_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS verification_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    credential_hash TEXT NOT NULL,
    is_valid BOOLEAN NOT NULL,
    verified_by TEXT NOT NULL,
    verified_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_verification_logs_hash
    ON verification_logs (credential_hash);
";

/// Single-file SQLite storage.
///
/// The `UNIQUE` constraint on `credentials.credential_hash` is enforced by
/// SQLite itself, so any number of worker processes may open the same file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "sqlite store opened");
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

impl CredentialStore for SqliteStore {
    fn find(&self, hash: &CredentialHash) -> Result<Option<CredentialRecord>, StoreError> {
        let conn = self.lock()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT worker_id, issued_at FROM credentials WHERE credential_hash = ?1",
                params![hash.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((worker_id, issued_at)) => Ok(Some(CredentialRecord {
                credential_hash: hash.clone(),
                worker_id: WorkerId::new(worker_id).map_err(corrupt)?,
                issued_at: parse_ts(&issued_at)?,
            })),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO credentials (credential_hash, worker_id, issued_at) VALUES (?1, ?2, ?3)",
            params![
                record.credential_hash.as_str(),
                record.worker_id.as_str(),
                format_ts(&record.issued_at)
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate(record.credential_hash.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn record_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl VerificationLog for SqliteStore {
    fn append(&self, entry: &VerificationLogEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO verification_logs (credential_hash, is_valid, verified_by, verified_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.credential_hash.as_str(),
                entry.is_valid,
                entry.verified_by.as_str(),
                format_ts(&entry.verified_at)
            ],
        )?;
        Ok(())
    }

    fn history(&self, hash: &CredentialHash) -> Result<Vec<VerificationLogEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT is_valid, verified_by, verified_at FROM verification_logs
             WHERE credential_hash = ?1 ORDER BY verified_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![hash.as_str()], |row| {
            Ok((
                row.get::<_, bool>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (is_valid, verified_by, verified_at) = row?;
            entries.push(VerificationLogEntry {
                credential_hash: hash.clone(),
                is_valid,
                verified_by: WorkerId::new(verified_by).map_err(corrupt)?,
                verified_at: parse_ts(&verified_at)?,
            });
        }
        Ok(entries)
    }

    fn entry_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM verification_logs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
