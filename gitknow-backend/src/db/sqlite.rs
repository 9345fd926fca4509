//! SQLite database - schema definitions and connection management
//!
//! This file contains:
//! - Database struct definition
//! - Connection management (new, init, bounded lock acquisition)
//! - Schema creation
//!
//! All table operations are in the tables/ subdirectory.

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Main database wrapper: one connection behind a mutex
pub struct Database {
    conn: Mutex<Connection>,
    timeout: Duration,
}

impl Database {
    /// Open (or create) the database and initialize schema.
    ///
    /// `timeout` bounds every store call: waiting for the connection and
    /// waiting on SQLite's own file lock.
    pub fn new(database_url: &str, timeout: Duration) -> StoreResult<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }

        let conn = Connection::open(database_url)?;
        conn.busy_timeout(timeout)?;
        let db = Self {
            conn: Mutex::new(conn),
            timeout,
        };
        db.init()?;
        Ok(db)
    }

    /// Acquire the connection, failing with `LockTimeout` instead of blocking forever
    pub(crate) fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .try_lock_for(self.timeout)
            .ok_or(StoreError::LockTimeout(self.timeout))
    }

    /// Run `f` inside one immediate transaction; commits on `Ok`, rolls back otherwise
    pub(crate) fn transaction<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }

    fn init(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch("PRAGMA journal_mode = WAL;").ok();

        // One document per human user; each provider sub-record is a JSON column,
        // its provider id is denormalised for the secondary lookup.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS identity_records (
                id TEXT PRIMARY KEY,
                discord_id TEXT,
                discord_json TEXT,
                github_id TEXT,
                github_json TEXT,
                twitter_id TEXT,
                twitter_json TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_identity_records_discord ON identity_records(discord_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_identity_records_github ON identity_records(github_id)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_identity_records_twitter ON identity_records(twitter_id)",
            [],
        )?;

        // Session store: session id -> identity id, TTL via expires_at (unix seconds)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                identity_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
            [],
        )?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_database() -> Database {
    Database::new(":memory:", Duration::from_secs(1)).unwrap()
}
