mod identity;
mod profile;
mod public;
mod session;

pub use identity::{
    DiscordAccount, GithubAccount, GithubProfile, IdentityRecord, LinkedAccount, Provider,
    TwitterAccount,
};
pub use profile::ProviderCallback;
pub use public::{IdentityView, PublicProfile};
pub use session::Session;
