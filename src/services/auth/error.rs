/*
 * Responsibility
 * - Auth 層が上位に伝える意味の定義 (token validation / OAuth2 client errors)
 * - HTTP への変換は error.rs (AppError) 側の責務
 */
use thiserror::Error;

use crate::services::auth::claims::IntrospectionResponse;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,

    #[error("missing client credentials")]
    MissingCredentials,

    #[error("invalid authorization header format")]
    InvalidTokenFormat,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    // Carries the parsed introspection body so callers can still inspect it.
    #[error("token is not active")]
    TokenInactive(Box<IntrospectionResponse>),

    #[error("invalid token type: {0}")]
    InvalidTokenType(String),

    #[error("token carries no user id")]
    NoUserId,

    #[error("token fetch failed: {0}")]
    TokenFetchFailed(String),

    #[error("introspection failed: {0}")]
    IntrospectionFailed(String),

    #[error("revocation request failed: {0}")]
    RequestFailed(String),

    #[error("authorization server error: {0}")]
    ServerError(String),
}
