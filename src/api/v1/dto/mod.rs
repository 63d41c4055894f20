pub mod admin;
pub mod notifications;
pub mod social;
pub mod users;
