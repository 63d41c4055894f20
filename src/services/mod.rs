pub mod auth;
pub mod cache;
pub mod notifications;
pub mod visibility;
