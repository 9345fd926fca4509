//! Inbound provider callback payloads
//!
//! The upstream OAuth exchange hands us the provider's profile as-is plus the
//! tokens it obtained. Shapes differ per provider; only the fields the identity
//! record keeps are validated here.

use serde::Deserialize;
use serde_json::Value;

use crate::error::LinkError;
use crate::models::{
    DiscordAccount, GithubAccount, GithubProfile, LinkedAccount, Provider, TwitterAccount,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    /// OAuth 1.0a only (twitter)
    #[serde(default)]
    pub token_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCallback {
    pub profile: Value,
    #[serde(default)]
    pub tokens: ProviderTokens,
}

impl ProviderCallback {
    /// Validate the payload and turn it into the sub-record for `provider`
    pub fn into_account(self, provider: Provider) -> Result<LinkedAccount, LinkError> {
        if !self.profile.is_object() {
            return Err(LinkError::invalid(provider, "profile must be an object"));
        }
        let id = provider_id(&self.profile)
            .ok_or_else(|| LinkError::invalid(provider, "missing provider id"))?;
        let access_token = non_empty(self.tokens.access_token)
            .ok_or_else(|| LinkError::invalid(provider, "missing access token"))?;

        match provider {
            Provider::Discord => {
                let username = string_field(&self.profile, "username")
                    .ok_or_else(|| LinkError::invalid(provider, "missing username"))?;
                Ok(LinkedAccount::Discord(DiscordAccount {
                    id,
                    access_token,
                    username,
                    discriminator: string_field(&self.profile, "discriminator")
                        .unwrap_or_else(|| "0".to_string()),
                    avatar: string_field(&self.profile, "avatar"),
                    banner: string_field(&self.profile, "banner"),
                    banner_color: string_field(&self.profile, "banner_color"),
                }))
            }
            Provider::Github => {
                let profile: GithubProfile = serde_json::from_value(self.profile)
                    .map_err(|e| LinkError::invalid(provider, e.to_string()))?;
                Ok(LinkedAccount::Github(GithubAccount {
                    id,
                    access_token,
                    profile,
                }))
            }
            Provider::Twitter => {
                let username = string_field(&self.profile, "username")
                    .or_else(|| string_field(&self.profile, "screen_name"))
                    .ok_or_else(|| LinkError::invalid(provider, "missing username"))?;
                let token_secret = non_empty(self.tokens.token_secret)
                    .ok_or_else(|| LinkError::invalid(provider, "missing token secret"))?;
                Ok(LinkedAccount::Twitter(TwitterAccount {
                    id,
                    access_token,
                    token_secret,
                    username,
                }))
            }
        }
    }
}

/// Provider ids arrive as strings (discord, twitter `id_str`) or numbers (github)
fn provider_id(profile: &Value) -> Option<String> {
    let raw = profile.get("id_str").or_else(|| profile.get("id"))?;
    match raw {
        Value::String(s) => non_empty(Some(s.trim().to_string())),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(profile: &Value, key: &str) -> Option<String> {
    profile
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .and_then(|s| non_empty(Some(s)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
