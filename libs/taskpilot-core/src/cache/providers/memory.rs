//! In-process cache backend built on moka

use crate::cache::backend::{BackendInfo, CacheBackend};
use crate::cache::errors::CacheResult;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Entries far beyond any realistic TTL are clamped to this horizon
const MAX_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-entry expiry: every write carries its own deadline
struct EntryDeadline;

impl Expiry<String, MemoryEntry> for EntryDeadline {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &MemoryEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &MemoryEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(updated_at))
    }
}

/// Bounded in-memory backend
///
/// Expiry and capacity eviction are both handled by moka; reads never
/// remove entries themselves.
#[derive(Clone)]
pub struct MemoryBackend {
    entries: Cache<String, MemoryEntry>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl MemoryBackend {
    /// Create a backend holding at most `max_capacity` entries
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(EntryDeadline)
                .build(),
        }
    }

    fn live_keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self
            .entries
            .get(key)
            .await
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl.min(MAX_TTL);
        self.entries
            .insert(
                key.to_string(),
                MemoryEntry {
                    value: value.to_string(),
                    expires_at,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let removed = self.entries.remove(key).await;
        Ok(removed.is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut deleted = 0;
        for key in self.live_keys_with_prefix(prefix) {
            if self.entries.remove(&key).await.is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn count_prefix(&self, prefix: &str) -> CacheResult<u64> {
        Ok(self.live_keys_with_prefix(prefix).len() as u64)
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        Ok(BackendInfo::default())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
