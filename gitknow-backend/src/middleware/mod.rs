pub mod callback_auth;
pub mod session_auth;

pub use callback_auth::TrustedCallback;
pub use session_auth::CurrentIdentity;
