use serde::{Deserialize, Serialize};
use sqlite::{Connection, State};
use std::path::Path;
use std::sync::Mutex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::StampError;

/// One stamping event. Written once, never updated: the original/signed
/// hash pair is the integrity anchor for "this exact input produced this
/// exact output".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub original_hash: String,
    pub signed_hash: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// 1-based page index that was stamped.
    pub page: u32,
    /// Absolute draw position, user-space units, origin bottom-left.
    pub x_pos: f64,
    pub y_pos: f64,
}

/// Append-only sink for audit records. Appends from concurrent stamping
/// operations must each land atomically; ordering across requests does not
/// matter.
pub trait AuditStore: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), StampError>;
}

/// SQLite-backed audit trail. The connection sits behind a mutex so
/// concurrent appends serialize into whole-row inserts.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StampError> {
        let conn = sqlite::open(path).map_err(storage_err)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS audit_trail (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_hash TEXT NOT NULL,
                signed_hash TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                page INTEGER NOT NULL,
                x_pos REAL NOT NULL,
                y_pos REAL NOT NULL
            )",
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read access for external verifiers, in insertion order.
    pub fn records(&self) -> Result<Vec<AuditRecord>, StampError> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt = conn
            .prepare(
                "SELECT original_hash, signed_hash, timestamp, page, x_pos, y_pos
                 FROM audit_trail ORDER BY id",
            )
            .map_err(storage_err)?;
        let mut out = Vec::new();
        while let State::Row = stmt.next().map_err(storage_err)? {
            let timestamp_text = stmt.read::<String, _>("timestamp").map_err(storage_err)?;
            let timestamp = OffsetDateTime::parse(&timestamp_text, &Rfc3339)
                .map_err(|e| StampError::Storage(format!("bad stored timestamp: {e}")))?;
            out.push(AuditRecord {
                original_hash: stmt.read::<String, _>("original_hash").map_err(storage_err)?,
                signed_hash: stmt.read::<String, _>("signed_hash").map_err(storage_err)?,
                timestamp,
                page: stmt.read::<i64, _>("page").map_err(storage_err)? as u32,
                x_pos: stmt.read::<f64, _>("x_pos").map_err(storage_err)?,
                y_pos: stmt.read::<f64, _>("y_pos").map_err(storage_err)?,
            });
        }
        Ok(out)
    }
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), StampError> {
        let timestamp = record
            .timestamp
            .format(&Rfc3339)
            .map_err(|e| StampError::Storage(format!("timestamp format: {e}")))?;
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt = conn
            .prepare(
                "INSERT INTO audit_trail
                 (original_hash, signed_hash, timestamp, page, x_pos, y_pos)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .map_err(storage_err)?;
        stmt.bind((1, record.original_hash.as_str())).map_err(storage_err)?;
        stmt.bind((2, record.signed_hash.as_str())).map_err(storage_err)?;
        stmt.bind((3, timestamp.as_str())).map_err(storage_err)?;
        stmt.bind((4, i64::from(record.page))).map_err(storage_err)?;
        stmt.bind((5, record.x_pos)).map_err(storage_err)?;
        stmt.bind((6, record.y_pos)).map_err(storage_err)?;
        while stmt.next().map_err(storage_err)? != State::Done {}
        Ok(())
    }
}

/// In-memory audit trail for tests and embedded callers.
#[derive(Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AuditStore for MemoryAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), StampError> {
        self.records
            .lock()
            .map_err(|_| poisoned())?
            .push(record.clone());
        Ok(())
    }
}

fn storage_err(e: sqlite::Error) -> StampError {
    StampError::Storage(e.to_string())
}

fn poisoned() -> StampError {
    StampError::Storage("audit store lock poisoned".into())
}
