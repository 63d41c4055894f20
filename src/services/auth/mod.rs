pub mod claims;
pub mod error;
pub mod jwt;
pub mod oauth2;
pub mod principal;
pub mod token_manager;

pub use error::AuthError;
pub use oauth2::OAuth2Client;
pub use principal::Principal;
pub use token_manager::ServiceTokenManager;
