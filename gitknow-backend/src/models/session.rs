use chrono::{DateTime, Utc};
use serde::Serialize;

/// A browser session bound to one identity record
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub identity_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
