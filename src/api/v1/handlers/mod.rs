/*
 * Responsibility
 * - handlers の公開インターフェース (re-export)
 * - handler 横断の小物 (X-User-Role の admin 判定)
 */
pub mod admin;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod social;
pub mod users;

use axum::http::HeaderMap;

pub(crate) const USER_ROLE_HEADER: &str = "x-user-role";

/// The gateway vouches for an admin via `X-User-Role: admin`. The value is
/// trusted as-is; the gateway must strip the header from external traffic.
pub(crate) fn admin_override(headers: &HeaderMap) -> bool {
    headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "admin")
}
