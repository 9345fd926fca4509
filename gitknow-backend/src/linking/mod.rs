//! Account linking core
//!
//! - `resolver`: turns a completed provider OAuth flow into a created, logged-in,
//!   linked or refreshed identity record
//! - `session_binder`: session id -> identity record bindings

mod resolver;
mod session_binder;

pub use resolver::LinkResolver;
pub use session_binder::SessionBinder;
