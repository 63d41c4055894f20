/*
 * Responsibility
 * - プロフィール取得/更新、ユーザー検索、二段階アカウント削除
 *
 * Notes
 * - プロフィール read は visibility gate を通す。private は存在ごと隠す (404)
 * - 削除は request (確認トークン発行) → confirm (ダイジェスト照合) の二段階。
 *   トークンそのものは保存せず SHA-256 ダイジェストだけを cache に置く
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::api::v1::dto::users::{
    DeletionConfirmRequest, DeletionRequestResponse, ProfileResponse, SearchQuery,
    UpdateProfileRequest,
};
use crate::api::v1::extractors::CurrentPrincipal;
use crate::error::AppError;
use crate::repos::{activity_repo, user_repo};
use crate::services::cache::{CacheClient, ttl_seconds};
use crate::services::visibility;
use crate::state::AppState;

const DELETION_TOKEN_TTL_SECONDS: u64 = 86_400;

fn deletion_key(user_id: Uuid) -> String {
    format!("delete-request:{user_id}")
}

fn sha256_hex(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    visibility::authorize_read(&state.db, &principal, user_id, true).await?;

    let row = user_repo::get(&state.db, user_id)
        .await?
        .filter(|row| row.is_active)
        .ok_or(AppError::not_found("user"))?;

    let is_self = principal.user_uuid() == Some(user_id);
    Ok(Json(ProfileResponse::from_row(row, is_self)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    // Owner-only: no admin override on profile mutation.
    visibility::ensure_actor(&principal, user_id, false)?;
    req.validate()
        .map_err(|msg| AppError::bad_request("VALIDATION_ERROR", msg))?;

    let before = user_repo::get(&state.db, user_id)
        .await?
        .filter(|row| row.is_active)
        .ok_or(AppError::not_found("user"))?;

    let bio = req.bio.as_ref().map(|inner| inner.as_deref());
    let image_url = req.image_url.as_ref().map(|inner| inner.as_deref());

    let row = user_repo::update_profile(
        &state.db,
        user_id,
        req.user_name.as_deref(),
        req.email.as_deref(),
        bio,
        image_url,
        req.profile_visibility.as_deref(),
        req.allow_follows,
    )
    .await?
    .ok_or(AppError::not_found("user"))?;

    if let Some(new_email) = &req.email
        && *new_email != before.email
    {
        state.notifier.notify(
            user_id,
            "email_changed",
            format!("Your email address was changed to {new_email}"),
        );
    }
    activity_repo::record(&state.db, user_id, "profile_updated").await?;

    Ok(Json(ProfileResponse::from_row(row, true)))
}

pub async fn search(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::bad_request("VALIDATION_ERROR", "q is required"));
    }
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let viewer = principal.user_uuid();
    let rows = user_repo::search(&state.db, q, viewer, limit, offset).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| {
                let is_self = viewer == Some(row.id);
                ProfileResponse::from_row(row, is_self)
            })
            .collect(),
    ))
}

pub async fn request_deletion(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<(StatusCode, Json<DeletionRequestResponse>), AppError> {
    // Owner-only: only the account holder can start a deletion.
    visibility::ensure_actor(&principal, user_id, false)?;

    let exists = user_repo::get_visibility(&state.db, user_id)
        .await?
        .is_some_and(|row| row.is_active);
    if !exists {
        return Err(AppError::not_found("user"));
    }

    // Only the digest is stored; the token is returned once and never kept.
    let token = Uuid::new_v4().to_string();
    state
        .cache
        .set_string_with_ttl(
            &deletion_key(user_id),
            &sha256_hex(&token),
            ttl_seconds(DELETION_TOKEN_TTL_SECONDS),
        )
        .await?;

    tracing::info!(user_id = %user_id, "deletion requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(DeletionRequestResponse {
            confirmation_token: token,
            expires_in_seconds: DELETION_TOKEN_TTL_SECONDS,
        }),
    ))
}

pub async fn confirm_deletion(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Json(req): Json<DeletionConfirmRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    visibility::ensure_actor(&principal, user_id, false)?;

    let key = deletion_key(user_id);
    let stored = state
        .cache
        .get_string(&key)
        .await?
        .ok_or(AppError::bad_request(
            "INVALID_CONFIRMATION_TOKEN",
            "No pending deletion request",
        ))?;

    if sha256_hex(&req.token) != stored {
        return Err(AppError::bad_request(
            "INVALID_CONFIRMATION_TOKEN",
            "Confirmation token does not match",
        ));
    }

    if !user_repo::deactivate(&state.db, user_id).await? {
        return Err(AppError::not_found("user"));
    }
    state.cache.del(&key).await?;
    activity_repo::record(&state.db, user_id, "account_deactivated").await?;

    tracing::info!(user_id = %user_id, "account deactivated");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
