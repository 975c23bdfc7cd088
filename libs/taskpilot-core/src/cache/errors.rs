//! Cache error types

use thiserror::Error;

/// Result type for cache backend operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Failures reported by a cache backend
///
/// These never cross the [`CacheStore`](super::CacheStore) boundary; the store
/// logs them and degrades to a miss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    Connection(String),

    #[error("Cache operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Cache backend error: {0}")]
    Backend(String),
}
