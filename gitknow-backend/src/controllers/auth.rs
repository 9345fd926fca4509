use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::str::FromStr;

use crate::config::Config;
use crate::error::ApiError;
use crate::linking::SessionBinder;
use crate::middleware::{CurrentIdentity, TrustedCallback};
use crate::models::{IdentityView, Provider, ProviderCallback};
use crate::AppState;

#[derive(Serialize)]
pub struct CallbackResponse {
    success: bool,
    outcome: String,
    session_id: String,
    expires_at: i64,
    user: IdentityView,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    success: bool,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                log::warn!("Malformed provider callback: {}", err);
                ApiError::invalid_provider_profile().into()
            }))
            .route("/logout", web::post().to(logout))
            .route("/{provider}/callback", web::post().to(provider_callback)),
    );
}

/// Session cookie carrying `value`. Cross-site frontends need `SameSite=None`,
/// which browsers only accept on secure cookies.
fn session_cookie(config: &Config, value: String) -> Cookie<'static> {
    let same_site = if config.secure_cookies {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build(config.session_cookie_name.clone(), value)
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(same_site)
        .max_age(CookieDuration::hours(config.session_ttl_hours))
        .finish()
}

async fn provider_callback(
    _trusted: TrustedCallback,
    state: web::Data<AppState>,
    current: CurrentIdentity,
    path: web::Path<String>,
    body: web::Json<ProviderCallback>,
) -> Result<HttpResponse, ApiError> {
    let provider = Provider::from_str(&path.into_inner()).map_err(|_| ApiError::unknown_provider())?;

    let resolution = state
        .link_resolver
        .resolve(current.identity.as_ref(), provider, body.into_inner())?;

    // A signed-in caller keeps their session; anyone else gets a fresh id
    let session_id = match (current.session_id, &current.identity) {
        (Some(id), Some(_)) => id,
        _ => SessionBinder::new_session_id(),
    };
    let session = state.session_binder.bind(&session_id, &resolution.record)?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&state.config, session_id.clone()))
        .json(CallbackResponse {
            success: true,
            outcome: resolution.outcome.to_string(),
            session_id,
            expires_at: session.expires_at.timestamp(),
            user: IdentityView::from(&resolution.record),
        }))
}

async fn logout(state: web::Data<AppState>, current: CurrentIdentity) -> Result<HttpResponse, ApiError> {
    if let Some(session_id) = &current.session_id {
        state.session_binder.unbind(session_id)?;
    }

    let mut removal = session_cookie(&state.config, String::new());
    removal.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(LogoutResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use crate::controllers::test_support;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    const COOKIE: &str = "gitknow.sid";

    fn session_cookie_from<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Cookie<'static> {
        resp.response()
            .cookies()
            .find(|c| c.name() == COOKIE)
            .map(|c| c.into_owned())
            .unwrap()
    }

    #[actix_web::test]
    async fn test_full_link_flow_over_http() {
        let app = test::init_service(App::new().app_data(test_support::state()).configure(test_support::routes)).await;

        // discord sign-in from an anonymous browser
        let req = test_support::callback("discord")
            .set_json(json!({
                "profile": {"id": "d1", "username": "disc"},
                "tokens": {"access_token": "discord-access-token"}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie_from(&resp);
        assert!(cookie.http_only().unwrap_or(false));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["outcome"], "created");
        let identity_id = body["user"]["id"].as_str().unwrap().to_string();

        // github then twitter from the same browser land on the same record
        let req = test_support::callback("github")
            .cookie(cookie.clone())
            .set_json(json!({
                "profile": {"id": "g1", "login": "octo", "avatar_url": "a.png"},
                "tokens": {"access_token": "github-access-token"}
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"], "linked");
        assert_eq!(body["user"]["id"], identity_id.as_str());
        assert_eq!(body["session_id"], cookie.value());

        let req = test_support::callback("twitter")
            .cookie(cookie.clone())
            .set_json(json!({
                "profile": {"id": "t1", "username": "tw1"},
                "tokens": {"access_token": "twitter-access-token", "token_secret": "twitter-token-secret"}
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"], "linked");
        assert_eq!(body["user"]["gitHubConnected"], true);
        assert_eq!(body["user"]["twitterConnected"], true);

        let req = test::TestRequest::get().uri("/getallusers").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        let roster: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0]["github"]["json"]["avatar_url"], "a.png");
        assert_eq!(roster[0]["twitter"]["username"], "tw1");
        assert!(!text.contains("access-token"));
        assert!(!text.contains("token-secret"));

        let req = test::TestRequest::get().uri("/getuser").cookie(cookie.clone()).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["id"], identity_id.as_str());
        assert!(!body.to_string().contains("access-token"));

        // logout drops the binding but keeps the record
        let req = test::TestRequest::post().uri("/auth/logout").cookie(cookie.clone()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/getuser").cookie(cookie.clone()).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["authenticated"], false);

        let req = test::TestRequest::get().uri("/getallusers").to_request();
        let roster: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(roster.len(), 1);
    }

    #[actix_web::test]
    async fn test_bearer_session_is_accepted() {
        let app = test::init_service(App::new().app_data(test_support::state()).configure(test_support::routes)).await;

        let req = test_support::callback("github")
            .set_json(json!({
                "profile": {"id": 42, "login": "octo"},
                "tokens": {"access_token": "gho"}
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/getuser")
            .insert_header(("Authorization", format!("Bearer {}", session_id)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["github"]["id"], "42");
    }

    #[actix_web::test]
    async fn test_unknown_provider_is_not_found() {
        let app = test::init_service(App::new().app_data(test_support::state()).configure(test_support::routes)).await;

        let req = test_support::callback("myspace")
            .set_json(json!({"profile": {"id": "1"}, "tokens": {"access_token": "x"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "UNKNOWN_PROVIDER");
    }

    #[actix_web::test]
    async fn test_invalid_profile_is_rejected_without_session() {
        let app = test::init_service(App::new().app_data(test_support::state()).configure(test_support::routes)).await;

        // missing provider id
        let req = test_support::callback("twitter")
            .set_json(json!({"profile": {"username": "tw1"}, "tokens": {"access_token": "x", "token_secret": "y"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(resp.response().cookies().next().is_none());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_PROVIDER_PROFILE");

        // body that is not a callback at all
        let req = test_support::callback("github")
            .set_json(json!(["not", "an", "object"]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "INVALID_PROVIDER_PROFILE");

        let req = test::TestRequest::get().uri("/getallusers").to_request();
        let roster: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert!(roster.is_empty());
    }

    #[actix_web::test]
    async fn test_expired_session_starts_a_new_one() {
        let app = test::init_service(App::new().app_data(test_support::state()).configure(test_support::routes)).await;

        let req = test_support::callback("discord")
            .cookie(Cookie::new(COOKIE, "stale-or-forged"))
            .set_json(json!({
                "profile": {"id": "d1", "username": "disc"},
                "tokens": {"access_token": "tok"}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_ne!(session_cookie_from(&resp).value(), "stale-or-forged");
    }

    #[actix_web::test]
    async fn test_unsigned_callback_is_rejected_and_writes_nothing() {
        let state = test_support::state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(test_support::routes)).await;
        let body = json!({
            "profile": {"id": "d1", "username": "disc"},
            "tokens": {"access_token": "tok"}
        });

        let req = test::TestRequest::post()
            .uri("/auth/discord/callback")
            .set_json(body.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.response().cookies().next().is_none());
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["code"], "UNTRUSTED_CALLBACK");

        let req = test::TestRequest::post()
            .uri("/auth/discord/callback")
            .insert_header(("X-Callback-Secret", "guessed"))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(state.db.count_identities().unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_forged_callback_cannot_take_over_a_record() {
        let state = test_support::state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(test_support::routes)).await;

        let req = test_support::callback("discord")
            .set_json(json!({
                "profile": {"id": "victim-d", "username": "victim"},
                "tokens": {"access_token": "real-token"}
            }))
            .to_request();
        let victim = session_cookie_from(&test::call_service(&app, req).await);
        let req = test_support::callback("twitter")
            .cookie(victim.clone())
            .set_json(json!({
                "profile": {"id": "victim-t", "username": "victim"},
                "tokens": {"access_token": "tw-token", "token_secret": "tw-secret"}
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // browser posting the victim's public discord id with an invented token
        let req = test::TestRequest::post()
            .uri("/auth/discord/callback")
            .set_json(json!({
                "profile": {"id": "victim-d", "username": "victim"},
                "tokens": {"access_token": "forged"}
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.response().cookies().next().is_none());

        // the victim's stored token was not replaced
        let record = state.session_binder.resolve_session(victim.value()).unwrap().unwrap();
        assert_eq!(record.discord.as_ref().unwrap().access_token, "real-token");
        assert_eq!(state.db.count_identities().unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_callbacks_refused_without_configured_secret() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state_with(crate::config::Config::default()))
                .configure(test_support::routes),
        )
        .await;

        let req = test_support::callback("github")
            .set_json(json!({"profile": {"id": 1, "login": "octo"}, "tokens": {"access_token": "gho"}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
