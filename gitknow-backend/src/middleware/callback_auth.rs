// Provider callback authentication
// Only the OAuth layer, which holds CALLBACK_SECRET, may report a completed
// provider login. Anything else is refused before the link resolver runs.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::AppState;

pub const CALLBACK_SECRET_HEADER: &str = "X-Callback-Secret";

/// Compare two byte slices in constant time
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Check the presented secret against the configured one
pub fn verify_callback_secret(req: &HttpRequest, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        log::warn!("Refused provider callback: CALLBACK_SECRET is not configured");
        return Err(ApiError::untrusted_callback());
    };

    let presented = req
        .headers()
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if constant_time_equal(presented.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        log::warn!(
            "Refused unsigned provider callback to {} from {:?}",
            req.path(),
            req.peer_addr()
        );
        Err(ApiError::untrusted_callback())
    }
}

/// Marker extractor: present in a handler's arguments means the request
/// carried the callback secret
#[derive(Debug, Clone, Copy)]
pub struct TrustedCallback;

impl FromRequest for TrustedCallback {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<AppState>>() {
            Some(state) => verify_callback_secret(req, state.config.callback_secret.as_deref()).map(|_| Self),
            None => {
                log::error!("AppState missing from app data");
                Err(ApiError::internal())
            }
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    #[test]
    fn test_constant_time_equal() {
        assert!(constant_time_equal(b"hello", b"hello"));
        assert!(!constant_time_equal(b"hello", b"world"));
        assert!(!constant_time_equal(b"hello", b"hell"));
    }

    #[test]
    fn test_matching_secret_is_accepted() {
        let req = TestRequest::default()
            .insert_header((CALLBACK_SECRET_HEADER, "s3cret"))
            .to_http_request();
        assert!(verify_callback_secret(&req, Some("s3cret")).is_ok());
    }

    #[test]
    fn test_missing_or_wrong_secret_is_rejected() {
        let req = TestRequest::default().to_http_request();
        let err = verify_callback_secret(&req, Some("s3cret")).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let req = TestRequest::default()
            .insert_header((CALLBACK_SECRET_HEADER, "guess"))
            .to_http_request();
        assert!(verify_callback_secret(&req, Some("s3cret")).is_err());
    }

    #[test]
    fn test_unconfigured_secret_rejects_everything() {
        // an empty header must not match an unset secret
        let req = TestRequest::default()
            .insert_header((CALLBACK_SECRET_HEADER, ""))
            .to_http_request();
        let err = verify_callback_secret(&req, None).unwrap_err();
        assert_eq!(err.code, "UNTRUSTED_CALLBACK");
    }
}
