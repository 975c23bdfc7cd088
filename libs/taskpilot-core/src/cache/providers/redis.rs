//! Redis cache backend
//!
//! Uses `redis::aio::ConnectionManager` for a shared multiplexed connection.
//! Every command is bounded by the configured operation timeout.

use crate::cache::backend::{BackendInfo, CacheBackend};
use crate::cache::errors::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::FromRedisValue;
use std::time::Duration;
use taskpilot_common::redact_url;
use tracing::{debug, info};

/// Connection settings for [`RedisBackend`]
#[derive(Debug, Clone)]
pub struct RedisBackendConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

/// Redis-backed cache using SETEX for expiry and SCAN for prefix operations
#[derive(Clone)]
pub struct RedisBackend {
    connection_manager: ConnectionManager,
    operation_timeout: Duration,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connection_manager", &"ConnectionManager")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RedisBackend {
    /// Open a connection, failing if Redis is not reachable within the
    /// connect timeout
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] for an invalid URL or refused
    /// connection and [`CacheError::Timeout`] when the connect timeout elapses.
    pub async fn connect(config: &RedisBackendConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {e}"))
        })?;

        let connection_manager =
            tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| CacheError::Timeout(millis(config.connect_timeout)))?
                .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {e}")))?;

        info!(url = %redact_url(&config.url), "Redis cache backend connected");

        Ok(Self {
            connection_manager,
            operation_timeout: config.operation_timeout,
        })
    }

    async fn run<T: FromRedisValue>(&self, cmd: redis::Cmd, name: &str) -> CacheResult<T> {
        let mut conn = self.connection_manager.clone();
        tokio::time::timeout(self.operation_timeout, cmd.query_async::<T>(&mut conn))
            .await
            .map_err(|_| CacheError::Timeout(millis(self.operation_timeout)))?
            .map_err(|e| CacheError::Backend(format!("Redis {name} failed: {e}")))
    }

    /// Walk every key matching `prefix*`, handing each SCAN batch to `visit`
    ///
    /// Returns the sum of the integer replies of the follow-up commands.
    async fn scan_prefix<F>(&self, prefix: &str, mut visit: F) -> CacheResult<u64>
    where
        F: FnMut(Vec<String>) -> Option<redis::Cmd> + Send,
    {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut replies: u64 = 0;

        loop {
            let mut scan = redis::cmd("SCAN");
            scan.arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100);
            let (next_cursor, keys): (u64, Vec<String>) = self.run(scan, "SCAN").await?;

            if let Some(follow_up) = visit(keys) {
                replies += self.run::<u64>(follow_up, "batch command").await?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                return Ok(replies);
            }
        }
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run(cmd, "GET").await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let ttl_seconds = ttl.as_secs().max(1);
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(ttl_seconds).arg(value);
        self.run::<()>(cmd, "SETEX").await?;

        debug!(key = key, ttl_seconds = ttl_seconds, "Redis SETEX");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: u64 = self.run(cmd, "DEL").await?;
        Ok(removed > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<u64> {
        // DEL reports only keys that still existed, so duplicates returned by
        // SCAN and keys that expired mid-walk are not counted.
        let deleted = self
            .scan_prefix(prefix, |keys| {
                if keys.is_empty() {
                    return None;
                }
                let mut del = redis::cmd("DEL");
                del.arg(keys);
                Some(del)
            })
            .await?;

        debug!(prefix = prefix, deleted = deleted, "Redis prefix DEL");
        Ok(deleted)
    }

    async fn count_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut count: u64 = 0;
        self.scan_prefix(prefix, |keys| {
            count += keys.len() as u64;
            None
        })
        .await?;
        Ok(count)
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        let mut server = redis::cmd("INFO");
        server.arg("server");
        let server: String = self.run(server, "INFO server").await?;

        let mut memory = redis::cmd("INFO");
        memory.arg("memory");
        let memory: String = self.run(memory, "INFO memory").await?;

        Ok(BackendInfo {
            version: info_field(&server, "redis_version"),
            memory_usage: info_field(&memory, "used_memory_human"),
        })
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let pong: String = self.run(redis::cmd("PING"), "PING").await?;
        Ok(pong == "PONG")
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

/// Escape Redis glob metacharacters so a prefix matches literally
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extract `field` from the `key:value` lines of an INFO reply
fn info_field(info: &str, field: &str) -> Option<String> {
    info.lines().find_map(|line| {
        line.trim()
            .strip_prefix(field)?
            .strip_prefix(':')
            .map(|value| value.trim().to_string())
    })
}
