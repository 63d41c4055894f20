/*
 * Responsibility
 * - Admin 向け response DTO
 */
use serde::Serialize;

use crate::repos::user_repo::StatsRow;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: i64,
    pub active_users: i64,
    pub total_follows: i64,
    pub total_notifications: i64,
}

impl From<StatsRow> for StatsResponse {
    fn from(row: StatsRow) -> Self {
        Self {
            total_users: row.total_users,
            active_users: row.active_users,
            total_follows: row.total_follows,
            total_notifications: row.total_notifications,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    pub cleared: bool,
    pub backend: String,
}
