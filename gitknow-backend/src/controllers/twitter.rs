use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::{ApiError, FollowError};
use crate::integrations::FollowTarget;
use crate::middleware::CurrentIdentity;
use crate::AppState;

#[derive(Deserialize)]
pub struct FollowQuery {
    screen_name: Option<String>,
    user_id: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/twitterfollow")
            .route(web::get().to(follow))
            .route(web::post().to(follow)),
    );
}

/// Follow an account as the caller's linked twitter user
async fn follow(
    state: web::Data<AppState>,
    current: CurrentIdentity,
    query: web::Query<FollowQuery>,
) -> Result<HttpResponse, ApiError> {
    let record = current.identity.ok_or_else(ApiError::unauthenticated)?;
    let account = record.twitter.as_ref().ok_or(FollowError::NotLinked)?;

    let query = query.into_inner();
    let target = FollowTarget::from_query(query.screen_name, query.user_id)?;

    let followed = state.twitter.follow(account, &target).await?;
    log::info!("Identity {} followed {:?}", record.id, target);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "screen_name": followed.get("screen_name"),
        "id": followed.get("id_str"),
    })))
}
