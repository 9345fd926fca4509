//! Token-free views of identity records
//!
//! Everything here is built field by field from the record; tokens, token
//! secrets and unknown GitHub profile fields are never copied over.

use serde::Serialize;

use crate::models::{DiscordAccount, GithubAccount, GithubProfile, IdentityRecord, TwitterAccount};

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    #[serde(rename = "gitHubConnected")]
    pub github_connected: bool,
    #[serde(rename = "twitterConnected")]
    pub twitter_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<PublicDiscord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<PublicGithub>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<PublicTwitter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicDiscord {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub banner: Option<String>,
    pub banner_color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicGithub {
    pub id: String,
    pub json: PublicGithubProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicGithubProfile {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub followers_url: Option<String>,
    pub following_url: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub hireable: Option<bool>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub twitter_username: Option<String>,
    pub followers: Option<u64>,
    pub following: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicTwitter {
    pub id: String,
    pub username: String,
}

/// What `/getuser` returns for a signed-in caller
#[derive(Debug, Clone, Serialize)]
pub struct IdentityView {
    pub authenticated: bool,
    pub id: String,
    #[serde(flatten)]
    pub profile: PublicProfile,
}

impl From<&DiscordAccount> for PublicDiscord {
    fn from(a: &DiscordAccount) -> Self {
        Self {
            id: a.id.clone(),
            username: a.username.clone(),
            discriminator: a.discriminator.clone(),
            avatar: a.avatar.clone(),
            banner: a.banner.clone(),
            banner_color: a.banner_color.clone(),
        }
    }
}

impl From<&GithubProfile> for PublicGithubProfile {
    fn from(p: &GithubProfile) -> Self {
        Self {
            login: p.login.clone(),
            avatar_url: p.avatar_url.clone(),
            html_url: p.html_url.clone(),
            followers_url: p.followers_url.clone(),
            following_url: p.following_url.clone(),
            name: p.name.clone(),
            company: p.company.clone(),
            hireable: p.hireable,
            blog: p.blog.clone(),
            location: p.location.clone(),
            bio: p.bio.clone(),
            twitter_username: p.twitter_username.clone(),
            followers: p.followers,
            following: p.following,
        }
    }
}

impl From<&GithubAccount> for PublicGithub {
    fn from(a: &GithubAccount) -> Self {
        Self {
            id: a.id.clone(),
            json: PublicGithubProfile::from(&a.profile),
        }
    }
}

impl From<&TwitterAccount> for PublicTwitter {
    fn from(a: &TwitterAccount) -> Self {
        Self {
            id: a.id.clone(),
            username: a.username.clone(),
        }
    }
}

impl From<&IdentityRecord> for PublicProfile {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            github_connected: record.github.is_some(),
            twitter_connected: record.twitter.is_some(),
            discord: record.discord.as_ref().map(PublicDiscord::from),
            github: record.github.as_ref().map(PublicGithub::from),
            twitter: record.twitter.as_ref().map(PublicTwitter::from),
        }
    }
}

impl From<&IdentityRecord> for IdentityView {
    fn from(record: &IdentityRecord) -> Self {
        Self {
            authenticated: true,
            id: record.id.clone(),
            profile: PublicProfile::from(record),
        }
    }
}
