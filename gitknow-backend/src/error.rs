//! Error taxonomy for the linking core and its HTTP mapping

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::time::Duration;
use thiserror::Error;

use crate::models::Provider;

/// Failures talking to the identity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored document could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store did not respond within {0:?}")]
    LockTimeout(Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures of the link resolver
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid {provider} profile: {reason}")]
    InvalidProviderProfile { provider: Provider, reason: String },

    #[error("identity store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("{provider} account {provider_id} is already linked to identity {existing_id}")]
    LinkConflict {
        provider: Provider,
        provider_id: String,
        existing_id: String,
    },
}

impl LinkError {
    pub fn invalid(provider: Provider, reason: impl Into<String>) -> Self {
        Self::InvalidProviderProfile {
            provider,
            reason: reason.into(),
        }
    }
}

/// Failures of the public roster projector
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster unavailable: {0}")]
    RosterUnavailable(#[from] StoreError),
}

/// Failures of the twitter follow delegate
#[derive(Debug, Error)]
pub enum FollowError {
    #[error("no twitter account linked to this session")]
    NotLinked,

    #[error("twitter consumer credentials are not configured")]
    NotConfigured,

    #[error("exactly one of screen_name or user_id must be given")]
    InvalidTarget,

    #[error("twitter did not respond in time")]
    Timeout,

    #[error("twitter request failed: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for FollowError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Upstream(e.to_string())
        }
    }
}

/// Error returned by HTTP handlers.
///
/// Carries a status, a stable machine code and a generic message; the
/// underlying cause is logged when the error is built and never sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHENTICATED",
            message: "Not signed in",
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_SERVER_ERROR",
            message: "Internal server error",
        }
    }

    pub fn untrusted_callback() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNTRUSTED_CALLBACK",
            message: "Callback not signed by the OAuth layer",
        }
    }

    pub fn invalid_provider_profile() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "INVALID_PROVIDER_PROFILE",
            message: "Invalid provider profile",
        }
    }

    pub fn unknown_provider() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "UNKNOWN_PROVIDER",
            message: "Unknown provider",
        }
    }

    fn store_unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "STORE_UNAVAILABLE",
            message: "Service temporarily unavailable",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(serde_json::json!({
            "error": self.message,
            "code": self.code,
        }))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        log::error!("Store error: {}", e);
        Self::store_unavailable()
    }
}

impl From<LinkError> for ApiError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::InvalidProviderProfile { .. } => {
                log::warn!("Rejected provider callback: {}", e);
                Self::invalid_provider_profile()
            }
            LinkError::StoreUnavailable(inner) => inner.into(),
            LinkError::LinkConflict { .. } => {
                log::warn!("Rejected link: {}", e);
                Self {
                    status: StatusCode::CONFLICT,
                    code: "LINK_CONFLICT",
                    message: "This account is already linked to another user",
                }
            }
        }
    }
}

impl From<RosterError> for ApiError {
    fn from(e: RosterError) -> Self {
        log::error!("{}", e);
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "ROSTER_UNAVAILABLE",
            message: "Service temporarily unavailable",
        }
    }
}

impl From<FollowError> for ApiError {
    fn from(e: FollowError) -> Self {
        let (status, code, message) = match &e {
            FollowError::NotLinked => (
                StatusCode::UNAUTHORIZED,
                "TWITTER_NOT_LINKED",
                "Connect a Twitter account first",
            ),
            FollowError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "FOLLOW_DISABLED",
                "Following is not available",
            ),
            FollowError::InvalidTarget => (
                StatusCode::BAD_REQUEST,
                "INVALID_FOLLOW_TARGET",
                "Give exactly one of screen_name or user_id",
            ),
            FollowError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "UPSTREAM_TIMEOUT",
                "Twitter did not respond in time",
            ),
            FollowError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "Twitter request failed",
            ),
        };
        log::warn!("Follow failed: {}", e);
        Self {
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_status_codes() {
        let invalid: ApiError = LinkError::invalid(Provider::Github, "missing id").into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let unavailable: ApiError =
            LinkError::StoreUnavailable(StoreError::LockTimeout(Duration::from_millis(5))).into();
        assert_eq!(unavailable.status, StatusCode::SERVICE_UNAVAILABLE);

        let conflict: ApiError = LinkError::LinkConflict {
            provider: Provider::Twitter,
            provider_id: "t1".to_string(),
            existing_id: "other".to_string(),
        }
        .into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_follow_error_status_codes() {
        let timeout: ApiError = FollowError::Timeout.into();
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);

        let upstream: ApiError = FollowError::Upstream("403 Forbidden".to_string()).into();
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
        // upstream detail stays in the log
        assert!(!upstream.message.contains("403"));

        let not_linked: ApiError = FollowError::NotLinked.into();
        assert_eq!(not_linked.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_body_is_generic() {
        let err: ApiError = StoreError::LockTimeout(Duration::from_millis(5)).into();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message, "Service temporarily unavailable");
    }
}
