pub mod client;
pub mod valkey;

pub use client::{CacheClient, CacheError, ttl_seconds};
pub use valkey::ValkeyClient;
