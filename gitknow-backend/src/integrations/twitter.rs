//! Twitter follow delegate (OAuth 1.0a, HMAC-SHA1 signed requests)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use std::collections::BTreeMap;

use crate::config::TwitterConsumer;
use crate::error::FollowError;
use crate::models::TwitterAccount;

const FRIENDSHIPS_CREATE_URL: &str = "https://api.twitter.com/1.1/friendships/create.json";

type HmacSha1 = Hmac<Sha1>;

/// Who to follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowTarget {
    ScreenName(String),
    UserId(String),
}

impl FollowTarget {
    pub fn from_query(screen_name: Option<String>, user_id: Option<String>) -> Result<Self, FollowError> {
        let screen_name = screen_name.filter(|s| !s.trim().is_empty());
        let user_id = user_id.filter(|s| !s.trim().is_empty());
        match (screen_name, user_id) {
            (Some(name), None) => Ok(Self::ScreenName(name.trim().trim_start_matches('@').to_string())),
            (None, Some(id)) => Ok(Self::UserId(id.trim().to_string())),
            _ => Err(FollowError::InvalidTarget),
        }
    }

    fn param(&self) -> (&'static str, &str) {
        match self {
            Self::ScreenName(name) => ("screen_name", name),
            Self::UserId(id) => ("user_id", id),
        }
    }
}

/// Everything that goes into one OAuth 1.0a signature
pub struct OAuthRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    /// Query and form parameters of the request itself
    pub params: &'a [(&'a str, &'a str)],
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
    pub nonce: &'a str,
    pub timestamp: i64,
}

impl OAuthRequest<'_> {
    fn oauth_params(&self) -> BTreeMap<String, String> {
        let timestamp = self.timestamp.to_string();
        [
            ("oauth_consumer_key", self.consumer_key),
            ("oauth_nonce", self.nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.token),
            ("oauth_version", "1.0"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Base64 HMAC-SHA1 over the RFC 5849 signature base string
    pub fn signature(&self) -> String {
        let mut encoded: Vec<(String, String)> = self
            .oauth_params()
            .into_iter()
            .chain(self.params.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
            .collect();
        encoded.sort();

        let param_string = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            self.method.to_uppercase(),
            percent_encode(self.url),
            percent_encode(&param_string)
        );
        let signing_key = format!(
            "{}&{}",
            percent_encode(self.consumer_secret),
            percent_encode(self.token_secret)
        );

        // HMAC takes keys of any length
        let mut mac = match HmacSha1::new_from_slice(signing_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        let mut params = self.oauth_params();
        params.insert("oauth_signature".to_string(), self.signature());

        let fields = params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}

/// RFC 3986 encoding: everything but `A-Z a-z 0-9 - . _ ~`
fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

pub struct TwitterClient {
    http: reqwest::Client,
    consumer: Option<TwitterConsumer>,
    endpoint: String,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, consumer: Option<TwitterConsumer>) -> Self {
        Self {
            http,
            consumer,
            endpoint: FRIENDSHIPS_CREATE_URL.to_string(),
        }
    }

    /// Point the client at another friendships/create endpoint
    #[cfg(test)]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.consumer.is_some()
    }

    /// Follow `target` as the owner of `account`. Not retried on failure.
    pub async fn follow(
        &self,
        account: &TwitterAccount,
        target: &FollowTarget,
    ) -> Result<serde_json::Value, FollowError> {
        let consumer = self.consumer.as_ref().ok_or(FollowError::NotConfigured)?;
        let (key, value) = target.param();
        let params = [(key, value)];
        let nonce = nonce();

        let request = OAuthRequest {
            method: "POST",
            url: &self.endpoint,
            params: &params,
            consumer_key: &consumer.key,
            consumer_secret: &consumer.secret,
            token: &account.access_token,
            token_secret: &account.token_secret,
            nonce: &nonce,
            timestamp: chrono::Utc::now().timestamp(),
        };

        log::info!("User '{}' is about to follow {:?}", account.username, target);

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, request.authorization_header())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FollowError::Upstream(format!("{}: {}", status, body)));
        }

        Ok(response.json().await?)
    }
}
