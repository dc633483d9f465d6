//! SQLite store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use envlog_types::Reading;

use crate::error::Result;
use crate::schema;
use crate::{Backend, ReadingStore};

/// SQLite-based store for envlog readings.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            crate::ensure_dir(parent)?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL lets readers see a consistent prefix while a write is in flight
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Count readings stored for one zone.
    pub fn count_zone(&self, zone: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM readings WHERE zone = ?",
            [zone],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl ReadingStore for Store {
    fn append(&self, reading: &Reading) -> Result<()> {
        let payload = serde_json::to_string(reading)?;
        let received_at = OffsetDateTime::now_utc().unix_timestamp();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO readings (zone, received_at, payload) VALUES (?1, ?2, ?3)",
            rusqlite::params![reading.zone(), received_at, payload],
        )?;
        tx.execute(
            "INSERT INTO latest (id, received_at, payload) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET received_at = ?1, payload = ?2",
            rusqlite::params![received_at, payload],
        )?;
        tx.commit()?;

        debug!("Appended reading for zone {}", reading.zone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<Reading>> {
        let payload: Option<String> = self
            .conn
            .query_row("SELECT payload FROM latest WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn scan(&self, limit: Option<usize>) -> Result<Vec<Reading>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));

        let mut stmt = self.conn.prepare(
            "SELECT id, payload FROM (
                SELECT id, payload FROM readings ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([limit], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let readings = rows
            .into_iter()
            .filter_map(|(id, payload)| match serde_json::from_str(&payload) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Skipping malformed reading row {}: {}", id, e);
                    None
                }
            })
            .collect();

        Ok(readings)
    }

    fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }
}
