//! Cache client interface used by higher-level services (deletion tokens,
//! admin cache clearing, readiness probe).
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command).
///
/// Kept independent from `AppError` so callers can decide how to fail
/// (fail-closed for deletion confirmation, fail-open for notifications).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
}

/// A minimal cache interface.
///
/// Intentionally small and string-based: the deletion-confirmation flow only
/// needs `SET EX` + `GET` + `DEL`, and the admin surface needs a flush.
///
/// Implementations must be cheap to clone (typically a connection manager
/// handle inside).
#[async_trait]
pub trait CacheClient: Clone + Send + Sync + 'static {
    // Returns the cache backend name (for logging/metrics).
    fn backend_name(&self) -> &'static str;

    // Get UTF-8 string value.
    async fn get_string(&self, key: &str) -> CacheResult<Option<String>>;

    // Set value with TTL, overwriting any previous value.
    async fn set_string_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    // Delete a key. Returns number of deleted keys.
    async fn del(&self, key: &str) -> CacheResult<u64>;

    // Drop every key in the current database (admin cache clear).
    async fn flush_all(&self) -> CacheResult<()>;

    // Round-trip check for the readiness probe.
    async fn ping(&self) -> CacheResult<()>;
}

/// Convenience helper to build a TTL from seconds.
pub fn ttl_seconds(seconds: u64) -> Duration {
    Duration::from_secs(seconds)
}
