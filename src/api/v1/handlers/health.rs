/*
 * Responsibility
 * - liveness (/health) と readiness (/ready)
 * - readiness は DB と cache への実クエリで判定、どちらか落ちたら 503
 */
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::services::cache::CacheClient;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    let cache_ok = state.cache.ping().await.is_ok();

    let status = if db_ok && cache_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let check = |ok: bool| if ok { "ok" } else { "error" };
    (
        status,
        Json(json!({
            "status": if db_ok && cache_ok { "ready" } else { "not_ready" },
            "checks": {
                "database": check(db_ok),
                "cache": check(cache_ok),
            }
        })),
    )
}
