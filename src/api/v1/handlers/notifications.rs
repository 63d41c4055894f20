/*
 * Responsibility
 * - 自分宛て notifications の一覧 / 既読化 / 削除
 * - service principal (user identity なし) はアクセス不可
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::api::v1::dto::notifications::{NotificationQuery, NotificationResponse};
use crate::api::v1::extractors::CurrentPrincipal;
use crate::error::AppError;
use crate::repos::notification_repo;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let user_id = principal.user_uuid().ok_or(AppError::Forbidden)?;
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let rows =
        notification_repo::list(&state.db, user_id, query.unread_only, limit, offset).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = principal.user_uuid().ok_or(AppError::Forbidden)?;

    if !notification_repo::mark_read(&state.db, user_id, notification_id).await? {
        return Err(AppError::not_found("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = principal.user_uuid().ok_or(AppError::Forbidden)?;

    if !notification_repo::delete(&state.db, user_id, notification_id).await? {
        return Err(AppError::not_found("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}
