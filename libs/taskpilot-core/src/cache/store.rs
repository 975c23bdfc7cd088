//! Fail-open cache store
//!
//! [`CacheStore`] is the only cache type the rest of the crate talks to. It
//! never returns an error: a backend failure is logged, counted, and turned
//! into a miss (`get`), `false` (`set`, `delete`), or `0` (`clear_by_prefix`).

use super::backend::CacheBackend;
use super::errors::CacheError;
use super::providers::{MemoryBackend, NoopBackend, RedisBackend, RedisBackendConfig};
use crate::config::{CacheBackendKind, CacheConfig};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use taskpilot_common::redact_url;
use tracing::{debug, info, warn};

/// Cache diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub connected: bool,
    pub backend: String,
    pub namespace: String,
    pub key_count: u64,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
    pub memory_usage: Option<String>,
    pub backend_version: Option<String>,
    pub error: Option<String>,
}

impl CacheStats {
    pub fn calculate_hit_rate(&mut self) {
        let total = self.hits + self.misses;
        self.hit_rate = if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                self.hits as f64 / total as f64
            }
        } else {
            0.0
        };
    }
}

/// Result of a bulk clear of the store's namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub success: bool,
    pub removed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    errors: u64,
    last_error: Option<String>,
}

/// Shared, fail-open handle over one [`CacheBackend`]
///
/// Availability is decided once, when the store is built. A store that could
/// not reach its backend stays disconnected for its whole life and answers
/// every call locally; a connected store still catches per-call failures.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    default_ttl: Duration,
    connected: bool,
    connect_error: Option<String>,
    counters: RwLock<Counters>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.provider_name())
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .field("connected", &self.connected)
            .finish()
    }
}

impl CacheStore {
    /// Build a store over `backend`, probing it once
    pub async fn connect(
        backend: Arc<dyn CacheBackend>,
        namespace: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        let namespace = namespace.into();
        let (connected, connect_error) = match backend.health_check().await {
            Ok(true) => (true, None),
            Ok(false) => (
                false,
                Some(format!("{} backend is not available", backend.provider_name())),
            ),
            Err(e) => (false, Some(e.to_string())),
        };

        if connected {
            info!(
                backend = backend.provider_name(),
                namespace = %namespace,
                "Cache store connected"
            );
        } else {
            warn!(
                backend = backend.provider_name(),
                error = connect_error.as_deref().unwrap_or_default(),
                "Cache store running without a backend; every lookup is a miss"
            );
        }

        Self {
            backend,
            namespace,
            default_ttl,
            connected,
            connect_error,
            counters: RwLock::new(Counters::default()),
        }
    }

    /// Build a store that never reaches a backend
    #[must_use]
    pub fn disconnected(
        namespace: impl Into<String>,
        default_ttl: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            backend: Arc::new(NoopBackend),
            namespace: namespace.into(),
            default_ttl,
            connected: false,
            connect_error: Some(reason.into()),
            counters: RwLock::new(Counters::default()),
        }
    }

    /// Build the store described by `config`
    ///
    /// A Redis backend that cannot be reached yields a disconnected store
    /// rather than an error.
    pub async fn from_config(config: &CacheConfig) -> Self {
        let ttl = config.ttl();
        match config.backend {
            CacheBackendKind::Disabled => {
                Self::disconnected(&config.namespace, ttl, "caching is disabled")
            }
            CacheBackendKind::Memory => {
                let backend = Arc::new(MemoryBackend::new(config.max_entries));
                Self::connect(backend, &config.namespace, ttl).await
            }
            CacheBackendKind::Redis => {
                let redis_config = RedisBackendConfig {
                    url: config.redis_url(),
                    connect_timeout: Duration::from_millis(config.connect_timeout_ms),
                    operation_timeout: Duration::from_millis(config.operation_timeout_ms),
                };
                match RedisBackend::connect(&redis_config).await {
                    Ok(backend) => Self::connect(Arc::new(backend), &config.namespace, ttl).await,
                    Err(e) => {
                        warn!(
                            url = %redact_url(&redis_config.url),
                            error = %e,
                            "Failed to connect to Redis"
                        );
                        Self::disconnected(&config.namespace, ttl, e.to_string())
                    }
                }
            }
        }
    }

    /// Whether the backend answered the construction-time probe
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// TTL applied to every generation entry
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    /// Look up a key; `None` on miss, expiry, or backend failure
    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.connected {
            self.record_miss();
            return None;
        }

        match self.backend.get(key).await {
            Ok(Some(value)) => {
                self.record_hit();
                debug!(key = key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                self.record_miss();
                debug!(key = key, "Cache miss");
                None
            }
            Err(e) => {
                self.record_error("get", &e);
                self.record_miss();
                None
            }
        }
    }

    /// Store a value for `ttl`; `false` when it could not be stored
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        if !self.connected {
            return false;
        }

        match self.backend.set(key, value, ttl).await {
            Ok(()) => {
                debug!(key = key, ttl_secs = ttl.as_secs(), "Cached value");
                true
            }
            Err(e) => {
                self.record_error("set", &e);
                false
            }
        }
    }

    /// Remove one key; `true` only when a live entry was removed
    pub async fn delete(&self, key: &str) -> bool {
        if !self.connected {
            return false;
        }

        match self.backend.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                self.record_error("delete", &e);
                false
            }
        }
    }

    /// Remove every key starting with `prefix`, returning how many went away
    pub async fn clear_by_prefix(&self, prefix: &str) -> u64 {
        self.try_clear_prefix(prefix).await.unwrap_or(0)
    }

    /// Remove every entry under this store's namespace
    pub async fn clear_namespace(&self) -> ClearOutcome {
        let prefix = self.namespace_prefix();
        match self.try_clear_prefix(&prefix).await {
            Some(removed) => {
                info!(namespace = %self.namespace, removed = removed, "Cleared cache namespace");
                ClearOutcome {
                    success: true,
                    removed,
                }
            }
            None => ClearOutcome {
                success: false,
                removed: 0,
            },
        }
    }

    /// Best-effort diagnostics; a failing backend reports `connected: false`
    pub async fn stats(&self) -> CacheStats {
        let mut stats = {
            let counters = self.counters.read();
            CacheStats {
                connected: false,
                backend: self.backend.provider_name().to_string(),
                namespace: self.namespace.clone(),
                hits: counters.hits,
                misses: counters.misses,
                errors: counters.errors,
                ..CacheStats::default()
            }
        };
        stats.calculate_hit_rate();

        if !self.connected {
            stats.error = self.connect_error.clone();
            return stats;
        }

        match self.backend.count_prefix(&self.namespace_prefix()).await {
            Ok(count) => {
                stats.connected = true;
                stats.key_count = count;
            }
            Err(e) => {
                self.record_error("stats", &e);
                stats.error = Some(e.to_string());
                return stats;
            }
        }

        match self.backend.info().await {
            Ok(info) => {
                stats.backend_version = info.version;
                stats.memory_usage = info.memory_usage;
            }
            Err(e) => debug!(error = %e, "Cache backend info unavailable"),
        }

        stats
    }

    fn namespace_prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    async fn try_clear_prefix(&self, prefix: &str) -> Option<u64> {
        if !self.connected {
            return None;
        }

        match self.backend.delete_prefix(prefix).await {
            Ok(removed) => Some(removed),
            Err(e) => {
                self.record_error("clear", &e);
                None
            }
        }
    }

    fn record_hit(&self) {
        self.counters.write().hits += 1;
        #[cfg(feature = "observability")]
        metrics::counter!("taskpilot_cache_hits_total").increment(1);
    }

    fn record_miss(&self) {
        self.counters.write().misses += 1;
        #[cfg(feature = "observability")]
        metrics::counter!("taskpilot_cache_misses_total").increment(1);
    }

    fn record_error(&self, operation: &'static str, error: &CacheError) {
        warn!(
            operation = operation,
            backend = self.backend.provider_name(),
            error = %error,
            "Cache operation failed; continuing without cache"
        );
        let mut counters = self.counters.write();
        counters.errors += 1;
        counters.last_error = Some(error.to_string());
        #[cfg(feature = "observability")]
        metrics::counter!("taskpilot_cache_errors_total", "operation" => operation).increment(1);
    }

    /// Most recent backend failure seen by this store
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.counters.read().last_error.clone()
    }
}
