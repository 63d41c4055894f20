/*
 * Responsibility
 * - service-to-service 呼び出し用 client_credentials トークンのキャッシュ
 * - single-flight refresh (read → write 再チェック) と early-refresh buffer
 */
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::services::auth::error::AuthError;
use crate::services::auth::oauth2::TokenFetcher;

const DEFAULT_REFRESH_BUFFER: f64 = 0.1;

/// A cached client-credentials token.
///
/// `effective_expires_at` is the server TTL shortened by the refresh buffer,
/// so the cache treats tokens as expired before the authorization server
/// does.
#[derive(Debug, Clone)]
pub struct CachedServiceToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub effective_expires_at: Instant,
}

impl CachedServiceToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.effective_expires_at
    }
}

struct CacheState {
    token: Option<CachedServiceToken>,
    closed: bool,
}

/// Supplies a valid access token for outbound calls.
///
/// Concurrency contract: readers hold the shared section only long enough to
/// snapshot the token string; a refresh holds the exclusive section for the
/// whole fetch, so at most one fetch is in flight at any instant. The
/// read-then-write upgrade admits at most one extra fetch under a race.
pub struct ServiceTokenManager {
    fetcher: Arc<dyn TokenFetcher>,
    scopes: Vec<String>,
    refresh_buffer: f64,
    cache: RwLock<CacheState>,
}

impl ServiceTokenManager {
    /// A `refresh_buffer` outside `[0, 1]` (including NaN) falls back to 0.1.
    pub fn new(fetcher: Arc<dyn TokenFetcher>, scopes: Vec<String>, refresh_buffer: f64) -> Self {
        let refresh_buffer = if (0.0..=1.0).contains(&refresh_buffer) {
            refresh_buffer
        } else {
            DEFAULT_REFRESH_BUFFER
        };

        Self {
            fetcher,
            scopes,
            refresh_buffer,
            cache: RwLock::new(CacheState {
                token: None,
                closed: false,
            }),
        }
    }

    pub fn refresh_buffer(&self) -> f64 {
        self.refresh_buffer
    }

    /// Return the cached token, fetching a fresh one when missing or past
    /// its effective expiry. Always fails after `close()`.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        {
            let state = self.cache.read().await;
            if state.closed {
                return Err(AuthError::TokenFetchFailed(
                    "token manager is closed".to_string(),
                ));
            }
            if let Some(token) = &state.token
                && token.is_fresh(Instant::now())
            {
                return Ok(token.access_token.clone());
            }
        }

        // Another caller may have refreshed while we waited for the
        // exclusive section, so re-check before fetching.
        let mut state = self.cache.write().await;
        if state.closed {
            return Err(AuthError::TokenFetchFailed(
                "token manager is closed".to_string(),
            ));
        }
        if let Some(token) = &state.token
            && token.is_fresh(Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let response = self.fetcher.client_credentials(&self.scopes).await?;
        metrics::counter!("service_token_fetches_total").increment(1);

        let ttl = response.expires_in as f64 * (1.0 - self.refresh_buffer);
        let token = CachedServiceToken {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            effective_expires_at: Instant::now() + Duration::from_secs_f64(ttl),
        };

        let access_token = token.access_token.clone();
        state.token = Some(token);
        Ok(access_token)
    }

    /// Drop the cached token; the next `get_token` will fetch.
    pub async fn invalidate_token(&self) {
        self.cache.write().await.token = None;
    }

    /// Mark the manager terminal. Idempotent; subsequent `get_token` calls
    /// fail with `TokenFetchFailed`.
    pub async fn close(&self) {
        let mut state = self.cache.write().await;
        state.closed = true;
        state.token = None;
    }

    /// Snapshot of the current cache entry (defensive copy).
    pub async fn cached_token(&self) -> Option<CachedServiceToken> {
        self.cache.read().await.token.clone()
    }
}
