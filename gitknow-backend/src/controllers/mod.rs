pub mod auth;
pub mod health;
pub mod twitter;
pub mod users;
