//! Session store operations (session id -> identity id, TTL based)

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension;

use crate::error::StoreResult;
use crate::models::{IdentityRecord, Session};
use super::super::Database;

impl Database {
    /// Point `session_id` at `identity_id`, replacing any previous binding
    pub fn upsert_session(&self, session_id: &str, identity_id: &str, ttl: Duration) -> StoreResult<Session> {
        let conn = self.conn()?;
        let now = Utc::now();
        let expires_at = now + ttl;

        conn.execute(
            "INSERT INTO sessions (session_id, identity_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id) DO UPDATE SET
                identity_id = excluded.identity_id,
                expires_at = excluded.expires_at",
            rusqlite::params![session_id, identity_id, now.to_rfc3339(), expires_at.timestamp()],
        )?;

        Ok(Session {
            session_id: session_id.to_string(),
            identity_id: identity_id.to_string(),
            created_at: now,
            expires_at: DateTime::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at),
        })
    }

    /// Get a live (unexpired) session
    pub fn get_session(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let conn = self.conn()?;

        let session = conn
            .query_row(
                "SELECT session_id, identity_id, created_at, expires_at FROM sessions
                 WHERE session_id = ?1 AND expires_at > ?2",
                rusqlite::params![session_id, Utc::now().timestamp()],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    let expires_at: i64 = row.get(3)?;
                    Ok(Session {
                        session_id: row.get(0)?,
                        identity_id: row.get(1)?,
                        created_at: DateTime::parse_from_rfc3339(&created_at_str)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now()),
                        expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(session)
    }

    /// Resolve a live session straight to its identity record
    pub fn get_identity_for_session(&self, session_id: &str) -> StoreResult<Option<IdentityRecord>> {
        let conn = self.conn()?;

        let identity_id: Option<String> = conn
            .query_row(
                "SELECT identity_id FROM sessions WHERE session_id = ?1 AND expires_at > ?2",
                rusqlite::params![session_id, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()?;

        match identity_id {
            Some(id) => Self::find_identity(&conn, &id),
            None => Ok(None),
        }
    }

    /// Delete a session. Returns true if it existed.
    pub fn delete_session(&self, session_id: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM sessions WHERE session_id = ?1", [session_id])?;
        Ok(rows_affected > 0)
    }

    /// Drop every expired session row
    pub fn purge_expired_sessions(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [Utc::now().timestamp()],
        )?;
        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_database;
    use chrono::Duration;

    #[test]
    fn test_upsert_rebinds_session() {
        let db = test_database();

        db.upsert_session("s1", "r1", Duration::hours(1)).unwrap();
        db.upsert_session("s1", "r2", Duration::hours(1)).unwrap();

        let session = db.get_session("s1").unwrap().unwrap();
        assert_eq!(session.identity_id, "r2");
    }

    #[test]
    fn test_expired_session_is_invisible_and_purged() {
        let db = test_database();

        db.upsert_session("old", "r1", Duration::seconds(-10)).unwrap();
        db.upsert_session("live", "r1", Duration::hours(1)).unwrap();

        assert!(db.get_session("old").unwrap().is_none());
        assert!(db.get_session("live").unwrap().is_some());

        assert_eq!(db.purge_expired_sessions().unwrap(), 1);
        assert!(db.get_session("live").unwrap().is_some());
    }

    #[test]
    fn test_delete_session() {
        let db = test_database();

        db.upsert_session("s1", "r1", Duration::hours(1)).unwrap();
        assert!(db.delete_session("s1").unwrap());
        assert!(!db.delete_session("s1").unwrap());
        assert!(db.get_session("s1").unwrap().is_none());
    }
}
