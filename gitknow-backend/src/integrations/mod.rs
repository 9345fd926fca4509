//! Outbound calls to provider APIs on behalf of a signed-in user

pub mod twitter;

pub use twitter::{FollowTarget, TwitterClient};
