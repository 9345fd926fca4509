use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod controllers;
mod db;
mod error;
mod integrations;
mod linking;
mod middleware;
mod models;
mod roster;

use config::Config;
use db::Database;
use integrations::TwitterClient;
use linking::{LinkResolver, SessionBinder};
use roster::RosterProjector;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub link_resolver: Arc<LinkResolver>,
    pub session_binder: Arc<SessionBinder>,
    pub roster: Arc<RosterProjector>,
    pub twitter: Arc<TwitterClient>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<Database>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            link_resolver: Arc::new(LinkResolver::new(db.clone(), config.link_conflict_policy)),
            session_binder: Arc::new(SessionBinder::new(
                db.clone(),
                chrono::Duration::hours(config.session_ttl_hours),
            )),
            roster: Arc::new(RosterProjector::new(db.clone())),
            twitter: Arc::new(TwitterClient::new(http, config.twitter_consumer.clone())),
            db,
            config,
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url, config.store_timeout).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    let db = Arc::new(db);
    match db.count_identities() {
        Ok(count) => log::info!("Identity store holds {} records", count),
        Err(e) => log::warn!("Could not count identity records: {}", e),
    }

    log::info!("Link conflict policy: {}", config.link_conflict_policy);
    if config.callback_secret.is_none() {
        log::warn!("CALLBACK_SECRET not set, provider callbacks will be refused");
    }

    // Expired sessions are already ignored on read; this only reclaims rows
    let purge_db = Arc::clone(&db);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purge_db.purge_expired_sessions() {
                Ok(0) => {}
                Ok(n) => log::info!("Purged {} expired sessions", n),
                Err(e) => log::warn!("Session purge failed: {}", e),
            }
        }
    });

    let state = web::Data::new(AppState::new(config.clone(), db));
    if !state.twitter.is_configured() {
        log::warn!("TWITTER_CONSUMER_KEY/SECRET not set, /twitterfollow is disabled");
    }

    log::info!("Starting gitknow backend on port {}", port);

    HttpServer::new(move || {
        let cors = match &config.frontend_url {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            None => Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600),
        };

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::auth::config)
            .configure(controllers::users::config)
            .configure(controllers::twitter::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
