//! Session binder: maps an opaque session id to the identity record it is
//! signed in as. Expiry lives in the session store (TTL on each row); the
//! binder only reads live bindings.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::sync::Arc;

use crate::db::Database;
use crate::error::StoreResult;
use crate::models::{IdentityRecord, Session};

pub struct SessionBinder {
    db: Arc<Database>,
    ttl: chrono::Duration,
}

impl SessionBinder {
    pub fn new(db: Arc<Database>, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    /// Fresh 256-bit session id, URL-safe
    pub fn new_session_id() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Point `session_id` at `record` (replacing any previous binding)
    pub fn bind(&self, session_id: &str, record: &IdentityRecord) -> StoreResult<Session> {
        let session = self.db.upsert_session(session_id, &record.id, self.ttl)?;
        log::debug!("Bound session to identity {}", record.id);
        Ok(session)
    }

    /// The record bound to `session_id`; `None` means anonymous
    pub fn resolve_session(&self, session_id: &str) -> StoreResult<Option<IdentityRecord>> {
        self.db.get_identity_for_session(session_id)
    }

    pub fn unbind(&self, session_id: &str) -> StoreResult<()> {
        if let Some(session) = self.db.get_session(session_id)? {
            log::info!("Identity {} signed out", session.identity_id);
        }
        if self.db.delete_session(session_id)? {
            log::debug!("Unbound session");
        }
        Ok(())
    }
}
