/*
 * Responsibility
 * - /metrics (Prometheus text) と /metrics/detailed (運用向け JSON)
 */
use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tokio::time::Instant;

use crate::state::AppState;

pub async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

pub async fn metrics_detailed(State(state): State<AppState>) -> Json<Value> {
    let service_token = match state.tokens.cached_token().await {
        Some(token) => json!({
            "cached": true,
            "tokenType": token.token_type,
            "expiresInSeconds": token
                .effective_expires_at
                .saturating_duration_since(Instant::now())
                .as_secs(),
        }),
        None => json!({ "cached": false }),
    };

    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "authMode": state.auth.mode_name(),
        "serviceToken": service_token,
    }))
}
