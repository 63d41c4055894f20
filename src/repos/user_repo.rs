/*
 * Responsibility
 * - users テーブル向け SQLx 操作 (profile read/update, search, deactivate, stats)
 * - PgPool を受け取り、DB エラーは RepoError に変換しやすい形で返す
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct UserRow {
    #[sqlx(rename = "userId")]
    pub id: Uuid,
    #[sqlx(rename = "userName")]
    pub user_name: String,
    pub email: String,
    pub bio: Option<String>,
    #[sqlx(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[sqlx(rename = "profileVisibility")]
    pub profile_visibility: String,
    #[sqlx(rename = "allowFollows")]
    pub allow_follows: bool,
    #[sqlx(rename = "isActive")]
    pub is_active: bool,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// The subset the visibility gate needs; fetched without the full profile.
#[derive(Debug, FromRow)]
pub struct VisibilityRow {
    #[sqlx(rename = "userId")]
    pub id: Uuid,
    #[sqlx(rename = "isActive")]
    pub is_active: bool,
    #[sqlx(rename = "profileVisibility")]
    pub profile_visibility: String,
    #[sqlx(rename = "allowFollows")]
    pub allow_follows: bool,
}

#[derive(Debug, FromRow)]
pub struct StatsRow {
    pub total_users: i64,
    pub active_users: i64,
    pub total_follows: i64,
    pub total_notifications: i64,
}

const USER_COLUMNS: &str = r#""userId", "userName", email, bio, "imageUrl",
       "profileVisibility", "allowFollows", "isActive", "createdAt""#;

pub async fn get(db: &PgPool, user_id: Uuid) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE "userId" = $1
        "#
    ))
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn get_visibility(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Option<VisibilityRow>, RepoError> {
    let row = sqlx::query_as::<_, VisibilityRow>(
        r#"
        SELECT "userId", "isActive", "profileVisibility", "allowFollows"
        FROM users
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

/// Name search over active users. Only public profiles are listed, plus the
/// searcher's own profile regardless of its visibility.
pub async fn search(
    db: &PgPool,
    query: &str,
    viewer_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<Vec<UserRow>, RepoError> {
    let rows = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE "isActive" = true
          AND "userName" ILIKE '%' || $1 || '%'
          AND ("profileVisibility" = 'public' OR "userId" = $2)
        ORDER BY "userName" ASC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(query)
    .bind(viewer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

#[allow(clippy::too_many_arguments)]
pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    user_name: Option<&str>,
    email: Option<&str>,
    bio: Option<Option<&str>>,
    image_url: Option<Option<&str>>,
    profile_visibility: Option<&str>,
    allow_follows: Option<bool>,
) -> Result<Option<UserRow>, RepoError> {
    // bio / image_url tri-state:
    // - Some(Some(v)) -> set to v
    // - Some(None)    -> set to NULL
    // - None          -> do not update
    let row = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        UPDATE users
        SET
            "userName" = COALESCE($2, "userName"),
            email = COALESCE($3, email),
            bio = CASE WHEN $4 = false THEN bio ELSE $5 END,
            "imageUrl" = CASE WHEN $6 = false THEN "imageUrl" ELSE $7 END,
            "profileVisibility" = COALESCE($8, "profileVisibility"),
            "allowFollows" = COALESCE($9, "allowFollows"),
            "updatedAt" = now()
        WHERE "userId" = $1 AND "isActive" = true
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(user_name)
    .bind(email)
    .bind(bio.is_some())
    .bind(bio.flatten())
    .bind(image_url.is_some())
    .bind(image_url.flatten())
    .bind(profile_visibility)
    .bind(allow_follows)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn deactivate(db: &PgPool, user_id: Uuid) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET "isActive" = false, "updatedAt" = now()
        WHERE "userId" = $1 AND "isActive" = true
        "#,
    )
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn stats(db: &PgPool) -> Result<StatsRow, RepoError> {
    let row = sqlx::query_as::<_, StatsRow>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM users WHERE "isActive" = true) AS active_users,
            (SELECT COUNT(*) FROM follows) AS total_follows,
            (SELECT COUNT(*) FROM notifications) AS total_notifications
        "#,
    )
    .fetch_one(db)
    .await?;

    Ok(row)
}
