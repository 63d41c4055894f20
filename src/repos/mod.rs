pub mod activity_repo;
pub mod error;
pub mod follow_repo;
pub mod notification_repo;
pub mod user_repo;
