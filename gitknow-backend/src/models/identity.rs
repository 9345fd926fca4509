//! Identity records and their per-provider sub-records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Third-party OAuth identity sources
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    Discord,
    Github,
    Twitter,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[Self::Discord, Self::Github, Self::Twitter]
    }

    /// Column holding the provider-assigned id (indexed for lookups)
    pub(crate) fn id_column(&self) -> &'static str {
        match self {
            Self::Discord => "discord_id",
            Self::Github => "github_id",
            Self::Twitter => "twitter_id",
        }
    }

    /// Column holding the serialized sub-record
    pub(crate) fn document_column(&self) -> &'static str {
        match self {
            Self::Discord => "discord_json",
            Self::Github => "github_json",
            Self::Twitter => "twitter_json",
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordAccount {
    pub id: String,
    pub access_token: String,
    pub username: String,
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub banner_color: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GithubAccount {
    pub id: String,
    pub access_token: String,
    pub profile: GithubProfile,
}

/// Snapshot of a GitHub user profile, replaced wholesale on every login.
///
/// Display fields the roster publishes are typed; anything else GitHub sends
/// is kept in `extra` so a refresh never drops data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubProfile {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub followers_url: Option<String>,
    #[serde(default)]
    pub following_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub hireable: Option<bool>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    #[serde(default)]
    pub following: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TwitterAccount {
    pub id: String,
    pub access_token: String,
    pub token_secret: String,
    pub username: String,
}

// Tokens stay out of Debug output so records can be logged safely.

impl std::fmt::Debug for DiscordAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("discriminator", &self.discriminator)
            .field("avatar", &self.avatar)
            .field("banner", &self.banner)
            .field("banner_color", &self.banner_color)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for GithubAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubAccount")
            .field("id", &self.id)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for TwitterAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// One provider's sub-record, as produced by a completed OAuth flow
#[derive(Debug, Clone)]
pub enum LinkedAccount {
    Discord(DiscordAccount),
    Github(GithubAccount),
    Twitter(TwitterAccount),
}

impl LinkedAccount {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Discord(_) => Provider::Discord,
            Self::Github(_) => Provider::Github,
            Self::Twitter(_) => Provider::Twitter,
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            Self::Discord(a) => &a.id,
            Self::Github(a) => &a.id,
            Self::Twitter(a) => &a.id,
        }
    }

    /// Serialize the sub-record for its document column
    pub(crate) fn to_document(&self) -> serde_json::Result<String> {
        match self {
            Self::Discord(a) => serde_json::to_string(a),
            Self::Github(a) => serde_json::to_string(a),
            Self::Twitter(a) => serde_json::to_string(a),
        }
    }
}

/// The local aggregate for one human user across linked providers.
///
/// A sub-record is present iff the user completed that provider's OAuth flow
/// at least once.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub id: String,
    pub discord: Option<DiscordAccount>,
    pub github: Option<GithubAccount>,
    pub twitter: Option<TwitterAccount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    pub fn has(&self, provider: Provider) -> bool {
        match provider {
            Provider::Discord => self.discord.is_some(),
            Provider::Github => self.github.is_some(),
            Provider::Twitter => self.twitter.is_some(),
        }
    }

    pub fn connection_count(&self) -> usize {
        Provider::all().iter().filter(|p| self.has(**p)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_provider_parse_and_display() {
        assert_eq!(Provider::from_str("github").unwrap(), Provider::Github);
        assert_eq!(Provider::from_str("twitter").unwrap(), Provider::Twitter);
        assert!(Provider::from_str("gitlab").is_err());
        assert_eq!(Provider::Discord.to_string(), "discord");
    }

    #[test]
    fn test_github_profile_keeps_unknown_fields() {
        let profile: GithubProfile = serde_json::from_value(serde_json::json!({
            "login": "octo",
            "avatar_url": "a.png",
            "followers": 12,
            "public_repos": 7,
            "hireable": null
        }))
        .unwrap();

        assert_eq!(profile.login.as_deref(), Some("octo"));
        assert_eq!(profile.followers, Some(12));
        assert_eq!(profile.hireable, None);
        assert_eq!(profile.extra.get("public_repos"), Some(&serde_json::json!(7)));

        let back = serde_json::to_value(&profile).unwrap();
        assert_eq!(back["public_repos"], 7);
    }

    #[test]
    fn test_debug_hides_tokens() {
        let account = TwitterAccount {
            id: "t1".to_string(),
            access_token: "secret-token".to_string(),
            token_secret: "secret-secret".to_string(),
            username: "tw1".to_string(),
        };
        let printed = format!("{:?}", LinkedAccount::Twitter(account));
        assert!(printed.contains("tw1"));
        assert!(!printed.contains("secret-token"));
        assert!(!printed.contains("secret-secret"));
    }
}
