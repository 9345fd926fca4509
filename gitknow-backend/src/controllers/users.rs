use actix_web::{web, HttpResponse, Responder};

use crate::error::ApiError;
use crate::middleware::CurrentIdentity;
use crate::models::IdentityView;
use crate::roster::RosterFilter;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/getuser").route(web::get().to(get_user)));
    cfg.service(web::resource("/getallusers").route(web::get().to(get_all_users)));
}

/// The caller's own record without credentials, or `{"authenticated": false}`
async fn get_user(current: CurrentIdentity) -> impl Responder {
    match &current.identity {
        Some(record) => HttpResponse::Ok().json(IdentityView::from(record)),
        None => HttpResponse::Ok().json(serde_json::json!({ "authenticated": false })),
    }
}

async fn get_all_users(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let roster = state.roster.list(&RosterFilter::github_and_twitter())?;
    log::debug!("Roster has {} entries", roster.len());
    Ok(HttpResponse::Ok().json(roster))
}
