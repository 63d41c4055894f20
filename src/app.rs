/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (CORS/認証/request-id/timeout など)
 * - axum::serve() で起動、SIGINT で graceful shutdown
 */
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use crate::{
    api,
    api::v1::handlers::{health, metrics},
    config::Config,
    middleware::{auth::Authenticator, cors, http},
    services::auth::{OAuth2Client, ServiceTokenManager, oauth2::TokenFetcher},
    services::cache::ValkeyClient,
    services::notifications::NotificationClient,
    state::AppState,
};

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;

    let cache = ValkeyClient::new(&config.redis_url)
        .await
        .context("failed to connect to valkey")?;

    let auth = Arc::new(Authenticator::from_config(&config.oauth2));
    tracing::info!(mode = auth.mode_name(), "authentication configured");

    // Built in every mode. With empty credentials the first outbound call
    // fails with MissingCredentials and the notification is skipped.
    let fetcher: Arc<dyn TokenFetcher> = Arc::new(OAuth2Client::new(
        config.oauth2.base_url.clone(),
        config.oauth2.client_id.clone(),
        config.oauth2.client_secret.clone(),
        config.oauth2.token_path.clone(),
        config.oauth2.introspection_path.clone(),
        config.oauth2.revocation_path.clone(),
    ));
    let tokens = Arc::new(ServiceTokenManager::new(
        fetcher,
        config.oauth2.scopes.clone(),
        config.oauth2.refresh_buffer,
    ));

    let notifier = NotificationClient::new(config.notification_service_url.clone(), tokens.clone());

    let state = AppState::new(db, cache, auth, tokens.clone(), notifier, prometheus);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokens.close().await;
    Ok(())
}

fn build_router(state: AppState, config: &Config) -> Router {
    // Probes and metrics stay outside the authenticated surface.
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(metrics::metrics))
        .route("/metrics/detailed", get(metrics::metrics_detailed));

    let router = public
        .nest(
            "/api/v1/user-management",
            crate::middleware::auth::apply(api::v1::routes(), state.clone()),
        )
        .with_state(state);

    http::apply(cors::apply(router, config), config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
