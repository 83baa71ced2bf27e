// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable store for locally recorded entities.
//!
//! Each entity kind lives in its own table. A record's `synced` flag is
//! cleared by every [`Store::put`] and set only through
//! [`Store::mark_synced`], which the sync processor calls once the remote
//! has confirmed the record's most recent operation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use crate::entity::{EntityData, EntityKind, Record};
use crate::error::{Error, Result};

/// Columns shared by every per-kind table.
const TABLE_COLUMNS: &str = "(
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0
)";

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable per-kind record storage.
pub struct Store {
    conn: Connection,
}

/// Parse an RFC3339 timestamp from the database.
fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a stored payload for the given kind.
fn parse_payload(
    kind: EntityKind,
    value: &str,
) -> std::result::Result<EntityData, rusqlite::Error> {
    EntityData::from_json(kind, value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid {kind} payload in table '{}': {e}",
                kind.table()
            ))),
        )
    })
}

fn row_to_record(kind: EntityKind, row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let id: String = row.get(0)?;
    let data: String = row.get(1)?;
    let updated_at: String = row.get(2)?;
    let synced: bool = row.get(3)?;
    Ok(Record {
        id,
        data: parse_payload(kind, &data)?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
        synced,
    })
}

impl Store {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Opens a throwaway store that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // A committed write must be on disk before put() returns.
        conn.execute_batch("PRAGMA synchronous = FULL;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        for kind in EntityKind::ALL {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} {TABLE_COLUMNS};
                 CREATE INDEX IF NOT EXISTS idx_{table}_synced ON {table}(synced);",
                table = kind.table()
            ))?;
        }

        Ok(Store { conn })
    }

    /// Inserts or replaces a record by id. The stored copy is always unsynced.
    pub fn put(&self, record: &Record) -> Result<()> {
        let kind = record.kind();
        let data = record.data.payload_json()?;
        self.conn.execute(
            &format!(
                "INSERT INTO {} (id, data, updated_at, synced) VALUES (?1, ?2, ?3, 0)
                 ON CONFLICT(id) DO UPDATE SET
                    data = excluded.data,
                    updated_at = excluded.updated_at,
                    synced = 0",
                kind.table()
            ),
            params![record.id, data, record.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Writes a record back exactly as it was read, synced flag included.
    ///
    /// Only for undoing a write whose queue append failed; new data goes
    /// through [`Store::put`].
    pub fn restore(&self, record: &Record) -> Result<()> {
        let kind = record.kind();
        let data = record.data.payload_json()?;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (id, data, updated_at, synced) VALUES (?1, ?2, ?3, ?4)",
                kind.table()
            ),
            params![
                record.id,
                data,
                record.updated_at.to_rfc3339(),
                record.synced
            ],
        )?;
        Ok(())
    }

    /// Returns the record with the given id, if any.
    pub fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Record>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, data, updated_at, synced FROM {} WHERE id = ?1",
                    kind.table()
                ),
                params![id],
                |row| row_to_record(kind, row),
            )
            .optional()?;
        Ok(record)
    }

    /// Returns every record of a kind, oldest mutation first.
    pub fn get_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, data, updated_at, synced FROM {} ORDER BY updated_at, id",
            kind.table()
        ))?;
        let records = stmt
            .query_map([], |row| row_to_record(kind, row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Returns true if a record with the given id exists.
    pub fn exists(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", kind.table()),
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Removes a record. Returns false if it did not exist.
    pub fn delete(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Marks a record as synced.
    ///
    /// Idempotent: returns false when the record is missing or already synced.
    pub fn mark_synced(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET synced = 1 WHERE id = ?1 AND synced = 0",
                kind.table()
            ),
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Number of records of a kind still waiting for remote confirmation.
    pub fn count_unsynced(&self, kind: EntityKind) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE synced = 0", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
