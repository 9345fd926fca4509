//! Identity record database operations
//!
//! Lookups and writes take a plain `&Connection` so the link resolver can run
//! them inside one transaction; the `&self` methods lock for one-off reads.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{IdentityRecord, LinkedAccount, Provider};
use super::super::Database;

const IDENTITY_COLUMNS: &str =
    "id, discord_json, github_json, twitter_json, created_at, updated_at";

/// Raw row before the JSON documents are decoded
struct IdentityRow {
    id: String,
    discord_json: Option<String>,
    github_json: Option<String>,
    twitter_json: Option<String>,
    created_at: String,
    updated_at: String,
}

impl Database {
    /// Identity records that have a sub-record for every provider in `required`
    pub fn list_identities_with(&self, required: &[Provider]) -> StoreResult<Vec<IdentityRecord>> {
        let conn = self.conn()?;

        let mut query = format!("SELECT {} FROM identity_records", IDENTITY_COLUMNS);
        let conditions: Vec<String> = required
            .iter()
            .map(|p| format!("{} IS NOT NULL", p.id_column()))
            .collect();
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map([], Self::row_to_identity_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::decode_identity).collect()
    }

    /// Count all identity records
    pub fn count_identities(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM identity_records", [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn find_identity(conn: &Connection, id: &str) -> StoreResult<Option<IdentityRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM identity_records WHERE id = ?1", IDENTITY_COLUMNS),
                [id],
                Self::row_to_identity_row,
            )
            .optional()?;

        row.map(Self::decode_identity).transpose()
    }

    /// Find the record holding `provider_id` for `provider`.
    ///
    /// Several records can share a provider id when a link overwrote it; the
    /// most recently updated one wins.
    pub(crate) fn find_identity_by_provider(
        conn: &Connection,
        provider: Provider,
        provider_id: &str,
    ) -> StoreResult<Option<IdentityRecord>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM identity_records WHERE {} = ?1 ORDER BY updated_at DESC LIMIT 1",
                    IDENTITY_COLUMNS,
                    provider.id_column()
                ),
                [provider_id],
                Self::row_to_identity_row,
            )
            .optional()?;

        row.map(Self::decode_identity).transpose()
    }

    /// Find a record other than `exclude_id` that also holds `provider_id`
    pub(crate) fn find_other_identity_by_provider(
        conn: &Connection,
        provider: Provider,
        provider_id: &str,
        exclude_id: &str,
    ) -> StoreResult<Option<IdentityRecord>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM identity_records WHERE {} = ?1 AND id != ?2 ORDER BY updated_at DESC LIMIT 1",
                    IDENTITY_COLUMNS,
                    provider.id_column()
                ),
                [provider_id, exclude_id],
                Self::row_to_identity_row,
            )
            .optional()?;

        row.map(Self::decode_identity).transpose()
    }

    /// Create a record holding only `account`
    pub(crate) fn insert_identity(conn: &Connection, account: &LinkedAccount) -> StoreResult<IdentityRecord> {
        let id = Uuid::new_v4().to_string();
        let provider = account.provider();
        let now = timestamp_now();

        conn.execute(
            &format!(
                "INSERT INTO identity_records (id, {}, {}, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                provider.id_column(),
                provider.document_column()
            ),
            rusqlite::params![&id, account.provider_id(), account.to_document()?, &now],
        )?;

        Ok(Self::find_identity(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?)
    }

    /// Write (or overwrite) one provider's sub-record, leaving the others untouched.
    /// Returns false when no record has `identity_id`.
    pub(crate) fn write_linked_account(
        conn: &Connection,
        identity_id: &str,
        account: &LinkedAccount,
    ) -> StoreResult<bool> {
        let provider = account.provider();
        let now = timestamp_now();

        let rows_affected = conn.execute(
            &format!(
                "UPDATE identity_records SET {} = ?1, {} = ?2, updated_at = ?3 WHERE id = ?4",
                provider.id_column(),
                provider.document_column()
            ),
            rusqlite::params![account.provider_id(), account.to_document()?, &now, identity_id],
        )?;

        Ok(rows_affected > 0)
    }

    fn row_to_identity_row(row: &rusqlite::Row) -> rusqlite::Result<IdentityRow> {
        Ok(IdentityRow {
            id: row.get(0)?,
            discord_json: row.get(1)?,
            github_json: row.get(2)?,
            twitter_json: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn decode_identity(row: IdentityRow) -> StoreResult<IdentityRecord> {
        Ok(IdentityRecord {
            id: row.id,
            discord: row.discord_json.as_deref().map(|s| serde_json::from_str(s)).transpose()?,
            github: row.github_json.as_deref().map(|s| serde_json::from_str(s)).transpose()?,
            twitter: row.twitter_json.as_deref().map(|s| serde_json::from_str(s)).transpose()?,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
    }
}

/// Fixed-width UTC timestamps so `ORDER BY updated_at` sorts chronologically
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
