/*
 * Responsibility
 * - follow / unfollow とフォロワー・フォロー中・活動履歴の一覧
 *
 * Notes
 * - follow/unfollow は冪等。二重 follow も未 follow の unfollow も 200
 * - follow 時の通知は in-DB insert + 下流通知の両方。下流は fire-and-forget
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use uuid::Uuid;

use crate::api::v1::dto::social::{
    ActivityResponse, FollowResponse, FollowUserResponse, PageQuery,
};
use crate::api::v1::extractors::CurrentPrincipal;
use crate::api::v1::handlers::admin_override;
use crate::error::AppError;
use crate::repos::{activity_repo, follow_repo, notification_repo, user_repo};
use crate::services::visibility::{self, TargetUser};
use crate::state::AppState;

pub async fn follow(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path((user_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FollowResponse>, AppError> {
    visibility::ensure_actor(&principal, user_id, admin_override(&headers))?;

    let actor = user_repo::get(&state.db, user_id)
        .await?
        .filter(|row| row.is_active)
        .ok_or(AppError::not_found("user"))?;

    let target = user_repo::get_visibility(&state.db, target_id)
        .await?
        .map(|row| TargetUser::from_row(&row))
        .ok_or(AppError::not_found("user"))?;
    visibility::decide_follow(user_id, &target)?;

    let created = follow_repo::follow(&state.db, user_id, target_id).await?;

    // A repeated follow still returns 200, but must not grow the
    // notification/activity tables or re-notify the target.
    if let Some(body) = follow_announcement(created, &actor.user_name) {
        notification_repo::insert(&state.db, target_id, "new_follower", &body).await?;
        activity_repo::record(&state.db, user_id, "followed_user").await?;
        state.notifier.notify(target_id, "new_follower", body);
    }

    Ok(Json(FollowResponse { following: true }))
}

/// The announcement to emit after a follow insert, or `None` when the edge
/// already existed.
fn follow_announcement(created: bool, actor_name: &str) -> Option<String> {
    created.then(|| format!("{actor_name} started following you"))
}

pub async fn unfollow(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    headers: HeaderMap,
    Path((user_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FollowResponse>, AppError> {
    visibility::ensure_actor(&principal, user_id, admin_override(&headers))?;

    if user_id == target_id {
        return Err(AppError::bad_request(
            "VALIDATION_ERROR",
            "Cannot unfollow yourself",
        ));
    }

    let exists = user_repo::get_visibility(&state.db, target_id)
        .await?
        .is_some_and(|row| row.is_active);
    if !exists {
        return Err(AppError::not_found("user"));
    }

    follow_repo::unfollow(&state.db, user_id, target_id).await?;
    activity_repo::record(&state.db, user_id, "unfollowed_user").await?;

    Ok(Json(FollowResponse { following: false }))
}

pub async fn followers(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FollowUserResponse>>, AppError> {
    visibility::authorize_read(&state.db, &principal, user_id, false).await?;

    let (limit, offset) = page.normalize();
    let rows = follow_repo::followers(&state.db, user_id, limit, offset).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn following(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<FollowUserResponse>>, AppError> {
    visibility::authorize_read(&state.db, &principal, user_id, false).await?;

    let (limit, offset) = page.normalize();
    let rows = follow_repo::following(&state.db, user_id, limit, offset).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn activity(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ActivityResponse>>, AppError> {
    visibility::authorize_read(&state.db, &principal, user_id, false).await?;

    let (limit, offset) = page.normalize();
    let rows = activity_repo::list(&state.db, user_id, limit, offset).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}
