/*
 * Responsibility
 * - admin surface: 集計 stats と cache クリア
 * - admin 判定は X-User-Role: admin (gateway 経由) または admin scope
 */
use axum::{Json, extract::State, http::HeaderMap};

use crate::api::v1::dto::admin::{CacheClearResponse, StatsResponse};
use crate::api::v1::extractors::CurrentPrincipal;
use crate::api::v1::handlers::admin_override;
use crate::error::AppError;
use crate::repos::user_repo;
use crate::services::auth::Principal;
use crate::services::cache::CacheClient;
use crate::state::AppState;

fn require_admin(principal: &Principal, headers: &HeaderMap) -> Result<(), AppError> {
    if admin_override(headers) || principal.has_scope("admin") {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub async fn stats(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    require_admin(&principal, &headers)?;

    let row = user_repo::stats(&state.db).await?;
    Ok(Json(row.into()))
}

pub async fn cache_clear(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
) -> Result<Json<CacheClearResponse>, AppError> {
    require_admin(&principal, &headers)?;

    state.cache.flush_all().await?;
    state.tokens.invalidate_token().await;

    tracing::info!("admin cleared the cache");
    Ok(Json(CacheClearResponse {
        cleared: true,
        backend: state.cache.backend_name().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use uuid::Uuid;

    #[test]
    fn admin_access_requires_the_header_or_scope() {
        let plain = Principal::user(Uuid::new_v4(), "web", vec![]);
        let scoped = Principal::user(Uuid::new_v4(), "web", vec!["admin".to_string()]);

        let empty = HeaderMap::new();
        let mut admin_headers = HeaderMap::new();
        admin_headers.insert("x-user-role", HeaderValue::from_static("admin"));
        let mut other_role = HeaderMap::new();
        other_role.insert("x-user-role", HeaderValue::from_static("moderator"));

        assert!(require_admin(&plain, &empty).is_err());
        assert!(require_admin(&plain, &other_role).is_err());
        assert!(require_admin(&plain, &admin_headers).is_ok());
        assert!(require_admin(&scoped, &empty).is_ok());
    }
}
