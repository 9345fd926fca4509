// Session authentication
// Resolves the caller's session into the identity record it is bound to and
// hands it to handlers as an explicit `CurrentIdentity` argument.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::IdentityRecord;
use crate::AppState;

/// Session id from the session cookie, falling back to `Authorization: Bearer`
pub fn extract_session_id(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = req.cookie(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The caller's session id (if any) and the record it is bound to (if any).
/// `identity == None` means anonymous, whether or not a session id was sent.
#[derive(Debug, Clone)]
pub struct CurrentIdentity {
    pub session_id: Option<String>,
    pub identity: Option<IdentityRecord>,
}

impl CurrentIdentity {
    fn resolve(req: &HttpRequest) -> Result<Self, ApiError> {
        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            log::error!("AppState missing from app data");
            ApiError::internal()
        })?;

        let session_id = extract_session_id(req, &state.config.session_cookie_name);
        let identity = match &session_id {
            Some(id) => state.session_binder.resolve_session(id)?,
            None => None,
        };

        Ok(Self {
            session_id,
            identity,
        })
    }
}

impl FromRequest for CurrentIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::resolve(req))
    }
}
