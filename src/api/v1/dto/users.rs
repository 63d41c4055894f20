/*
 * Responsibility
 * - Users の request/response DTO
 * - validation (形式チェック) 用の validate() を持たせる
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repos::user_repo::UserRow;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub user_name: String,
    // Only exposed to the profile owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub profile_visibility: String,
    pub allow_follows: bool,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn from_row(row: UserRow, include_email: bool) -> Self {
        Self {
            user_id: row.id,
            user_name: row.user_name,
            email: include_email.then_some(row.email),
            bio: row.bio,
            image_url: row.image_url,
            profile_visibility: row.profile_visibility,
            allow_follows: row.allow_follows,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_name: Option<String>,
    pub email: Option<String>,
    // Tri-state:
    // - None: field missing (do not update)
    // - Some(None): null (set NULL)
    // - Some(Some(v)): set value
    pub bio: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub profile_visibility: Option<String>,
    pub allow_follows: Option<bool>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.user_name
            && name.trim().is_empty()
        {
            return Err("userName cannot be empty");
        }
        if let Some(email) = &self.email
            && (!email.contains('@') || email.len() > 254)
        {
            return Err("email is not valid");
        }
        if let Some(Some(bio)) = &self.bio
            && bio.len() > 1024
        {
            return Err("bio must be <= 1024 chars");
        }
        if let Some(Some(url)) = &self.image_url
            && url.len() > 256
        {
            return Err("imageUrl must be <= 256 chars");
        }
        if let Some(v) = &self.profile_visibility
            && !matches!(v.as_str(), "public" | "followers_only" | "private")
        {
            return Err("profileVisibility must be public, followers_only or private");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRequestResponse {
    pub confirmation_token: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeletionConfirmRequest {
    pub token: String,
}
