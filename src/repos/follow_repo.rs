/*
 * Responsibility
 * - follows テーブル向け SQLx 操作 (follow / unfollow / 一覧 / 判定)
 * - follow は ON CONFLICT DO NOTHING、unfollow は 0 行でも成功 (冪等)
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

/// A user summary as listed in followers/following responses.
#[derive(Debug, FromRow)]
pub struct FollowUserRow {
    #[sqlx(rename = "userId")]
    pub id: Uuid,
    #[sqlx(rename = "userName")]
    pub user_name: String,
    #[sqlx(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[sqlx(rename = "followedAt")]
    pub followed_at: DateTime<Utc>,
}

/// Idempotent: a duplicate follow is a no-op. Returns whether a new edge
/// was created, so callers can skip side effects on a repeat.
pub async fn follow(db: &PgPool, follower_id: Uuid, followee_id: Uuid) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        INSERT INTO follows ("followerId", "followeeId")
        VALUES ($1, $2)
        ON CONFLICT ("followerId", "followeeId") DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Idempotent: unfollowing a non-edge is a no-op.
pub async fn unfollow(db: &PgPool, follower_id: Uuid, followee_id: Uuid) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        DELETE FROM follows
        WHERE "followerId" = $1 AND "followeeId" = $2
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn is_following(
    db: &PgPool,
    follower_id: Uuid,
    followee_id: Uuid,
) -> Result<bool, RepoError> {
    let exists: Option<i32> = sqlx::query_scalar(
        r#"
        SELECT 1 FROM follows
        WHERE "followerId" = $1 AND "followeeId" = $2
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .fetch_optional(db)
    .await?;

    Ok(exists.is_some())
}

pub async fn followers(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<FollowUserRow>, RepoError> {
    let rows = sqlx::query_as::<_, FollowUserRow>(
        r#"
        SELECT u."userId", u."userName", u."imageUrl", f."createdAt" AS "followedAt"
        FROM follows f
        JOIN users u ON u."userId" = f."followerId"
        WHERE f."followeeId" = $1 AND u."isActive" = true
        ORDER BY f."createdAt" DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

pub async fn following(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<FollowUserRow>, RepoError> {
    let rows = sqlx::query_as::<_, FollowUserRow>(
        r#"
        SELECT u."userId", u."userName", u."imageUrl", f."createdAt" AS "followedAt"
        FROM follows f
        JOIN users u ON u."userId" = f."followeeId"
        WHERE f."followerId" = $1 AND u."isActive" = true
        ORDER BY f."createdAt" DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows)
}
