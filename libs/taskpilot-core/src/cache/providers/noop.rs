//! Backend used when caching is disabled

use crate::cache::backend::{BackendInfo, CacheBackend};
use crate::cache::errors::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Stores nothing and reports itself unhealthy, so a store built on it runs
/// disconnected
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

#[async_trait]
impl CacheBackend for NoopBackend {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    async fn delete_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn count_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        Ok(0)
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        Ok(BackendInfo::default())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(false)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
