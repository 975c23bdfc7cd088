//! Cache backend trait

use super::errors::CacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend diagnostics, each field reported only where the backend knows it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    pub version: Option<String>,
    pub memory_usage: Option<String>,
}

/// Operations a concrete key-value store must provide
///
/// Implementations must be safe to share across concurrent requests. Every
/// failure is returned as an error; deciding what a failure means is left to
/// [`CacheStore`](super::CacheStore).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a value; `Ok(None)` on miss or expiry
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value, replacing any previous one, expiring after `ttl`
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove a key; `Ok(true)` when a live entry was removed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Count live keys starting with `prefix`
    async fn count_prefix(&self, prefix: &str) -> CacheResult<u64>;

    /// Version and memory diagnostics
    async fn info(&self) -> CacheResult<BackendInfo>;

    /// Probe the backend; `Ok(true)` when it is reachable and usable
    async fn health_check(&self) -> CacheResult<bool>;

    /// Short backend name for logs and diagnostics
    fn provider_name(&self) -> &'static str;
}
