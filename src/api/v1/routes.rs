/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - ここに載る route はすべて認証必須 (app 側で auth middleware を適用)
 */
use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    admin, notifications,
    social::{activity, follow, followers, following, unfollow},
    users::{confirm_deletion, get_profile, request_deletion, search, update_profile},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/search", get(search))
        .route(
            "/users/{user_id}/profile",
            get(get_profile).put(update_profile),
        )
        .route("/users/{user_id}/deletion-request", post(request_deletion))
        .route("/users/{user_id}/deletion-confirm", post(confirm_deletion))
        .route(
            "/users/{user_id}/follow/{target_id}",
            post(follow).delete(unfollow),
        )
        .route("/users/{user_id}/followers", get(followers))
        .route("/users/{user_id}/following", get(following))
        .route("/users/{user_id}/activity", get(activity))
        .route("/notifications", get(notifications::list))
        .route(
            "/notifications/{notification_id}/read",
            put(notifications::mark_read),
        )
        .route(
            "/notifications/{notification_id}",
            axum::routing::delete(notifications::delete),
        )
        .route("/admin/stats", get(admin::stats))
        .route("/admin/cache/clear", post(admin::cache_clear))
}
