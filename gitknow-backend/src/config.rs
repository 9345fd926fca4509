use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Longest session lifetime accepted (ten years)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// What to do when a signed-in user links a provider account that another
/// identity record already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LinkConflictPolicy {
    /// Write the account onto the caller's record anyway (both records keep it)
    #[default]
    Overwrite,
    /// Refuse the link and leave both records untouched
    Reject,
}

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

#[derive(Clone)]
pub struct TwitterConsumer {
    pub key: String,
    pub secret: String,
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Only origin allowed to make credentialed CORS requests
    pub frontend_url: Option<String>,
    pub session_cookie_name: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub store_timeout: Duration,
    pub http_timeout: Duration,
    pub twitter_consumer: Option<TwitterConsumer>,
    pub link_conflict_policy: LinkConflictPolicy,
    /// Shared secret the OAuth layer presents on provider callbacks.
    /// Callbacks are refused while it is unset.
    pub callback_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4000,
            database_url: "./.db/gitknow.db".to_string(),
            frontend_url: None,
            session_cookie_name: "gitknow.sid".to_string(),
            session_ttl_hours: 168,
            secure_cookies: false,
            store_timeout: Duration::from_millis(5000),
            http_timeout: Duration::from_secs(15),
            twitter_consumer: None,
            link_conflict_policy: LinkConflictPolicy::Overwrite,
            callback_secret: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let twitter_consumer = match (get("TWITTER_CONSUMER_KEY"), get("TWITTER_CONSUMER_SECRET")) {
            (Some(key), Some(secret)) => Some(TwitterConsumer { key, secret }),
            _ => None,
        };

        Ok(Self {
            port: parse(&get, "PORT", defaults.port)?,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            frontend_url: get("FRONTEND_URL").map(|u| u.trim_end_matches('/').to_string()),
            session_cookie_name: get("SESSION_COOKIE_NAME").unwrap_or(defaults.session_cookie_name),
            session_ttl_hours: at_most(
                &get,
                "SESSION_TTL_HOURS",
                positive(&get, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
                MAX_SESSION_TTL_HOURS,
            )?,
            secure_cookies: parse_bool(&get, "SECURE_COOKIES", defaults.secure_cookies)?,
            store_timeout: Duration::from_millis(positive(&get, "STORE_TIMEOUT_MS", 5000u64)?),
            http_timeout: Duration::from_secs(positive(&get, "HTTP_TIMEOUT_SECS", 15u64)?),
            twitter_consumer,
            link_conflict_policy: parse(&get, "LINK_CONFLICT_POLICY", defaults.link_conflict_policy)?,
            callback_secret: get("CALLBACK_SECRET"),
        })
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(value) => value.to_lowercase().parse().map_err(|_| ConfigError { key, value }),
        None => Ok(default),
    }
}

fn positive<T: FromStr + PartialOrd + Default>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    let value = parse(get, key, default)?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError {
            key,
            value: get(key).unwrap_or_default(),
        })
    }
}

fn at_most<T: PartialOrd>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    value: T,
    max: T,
) -> Result<T, ConfigError> {
    if value <= max {
        Ok(value)
    } else {
        Err(ConfigError {
            key,
            value: get(key).unwrap_or_default(),
        })
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key).map(|v| v.to_lowercase()) {
        Some(v) if v == "1" || v == "true" || v == "yes" => Ok(true),
        Some(v) if v == "0" || v == "false" || v == "no" => Ok(false),
        Some(value) => Err(ConfigError { key, value }),
        None => Ok(default),
    }
}
