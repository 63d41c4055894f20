/*
 * Responsibility
 * - activities テーブル向け SQLx 操作 (record / list)
 * - フォローやプロフィール更新の軽量な活動履歴
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct ActivityRow {
    #[sqlx(rename = "activityId")]
    pub id: Uuid,
    #[sqlx(rename = "userId")]
    pub user_id: Uuid,
    pub action: String,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub async fn record(db: &PgPool, user_id: Uuid, action: &str) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO activities ("userId", action)
        VALUES ($1, $2)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ActivityRow>, RepoError> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT "activityId", "userId", action, "createdAt"
        FROM activities
        WHERE "userId" = $1
        ORDER BY "createdAt" DESC
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
