/*
 * Responsibility
 * - notifications テーブル向け SQLx 操作 (insert / list / mark-read / delete)
 * - mark-read と delete は所有者スコープ (user_id 条件付き)
 */
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    #[sqlx(rename = "notificationId")]
    pub id: Uuid,
    #[sqlx(rename = "userId")]
    pub user_id: Uuid,
    pub kind: String,
    pub body: String,
    #[sqlx(rename = "isRead")]
    pub is_read: bool,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    kind: &str,
    body: &str,
) -> Result<NotificationRow, RepoError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        r#"
        INSERT INTO notifications ("userId", kind, body)
        VALUES ($1, $2, $3)
        RETURNING "notificationId", "userId", kind, body, "isRead", "createdAt"
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(body)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<NotificationRow>, RepoError> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT "notificationId", "userId", kind, body, "isRead", "createdAt"
        FROM notifications
        WHERE "userId" = $1
          AND ($2 = false OR "isRead" = false)
        ORDER BY "createdAt" DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

/// Returns false when the notification does not exist or belongs to someone
/// else; the handler maps that to 404.
pub async fn mark_read(
    db: &PgPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET "isRead" = true
        WHERE "notificationId" = $1 AND "userId" = $2
        "#,
    )
    .bind(notification_id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(
    db: &PgPool,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM notifications
        WHERE "notificationId" = $1 AND "userId" = $2
        "#,
    )
    .bind(notification_id)
    .bind(user_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
