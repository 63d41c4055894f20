/*
 * Responsibility
 * - Follow / followers / activity の request/response DTO
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repos::activity_repo::ActivityRow;
use crate::repos::follow_repo::FollowUserRow;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub following: bool,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    // limit は 1..=100 に clamp、offset は負値を 0 に
    pub fn normalize(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUserResponse {
    pub user_id: Uuid,
    pub user_name: String,
    pub image_url: Option<String>,
    pub followed_at: DateTime<Utc>,
}

impl From<FollowUserRow> for FollowUserResponse {
    fn from(row: FollowUserRow) -> Self {
        Self {
            user_id: row.id,
            user_name: row.user_name,
            image_url: row.image_url,
            followed_at: row.followed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub activity_id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityResponse {
    fn from(row: ActivityRow) -> Self {
        Self {
            activity_id: row.id,
            action: row.action,
            created_at: row.created_at,
        }
    }
}
