/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::middleware::auth::Authenticator;
use crate::services::auth::ServiceTokenManager;
use crate::services::cache::ValkeyClient;
use crate::services::notifications::NotificationClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub cache: ValkeyClient,
    pub auth: Arc<Authenticator>,
    pub tokens: Arc<ServiceTokenManager>,
    pub notifier: NotificationClient,
    pub metrics: PrometheusHandle,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        db: sqlx::PgPool,
        cache: ValkeyClient,
        auth: Arc<Authenticator>,
        tokens: Arc<ServiceTokenManager>,
        notifier: NotificationClient,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            db,
            cache,
            auth,
            tokens,
            notifier,
            metrics,
            started_at: Instant::now(),
        }
    }
}
