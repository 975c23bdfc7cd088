//! Response cache for generated text
//!
//! The cache is layered:
//!
//! - [`CacheBackend`] implementations ([`MemoryBackend`], [`RedisBackend`],
//!   [`NoopBackend`]) speak to a concrete store and report every failure as a
//!   [`CacheError`].
//! - [`CacheStore`] wraps one backend and is fail-open: failures become misses
//!   or `false`/`0` results and are only visible through logs and [`CacheStats`].
//! - [`fingerprint`] derives the `{namespace}:{endpoint}:{digest}` key for a
//!   task collection.

pub mod backend;
pub mod errors;
pub mod keys;
pub mod providers;
pub mod store;

pub use backend::{BackendInfo, CacheBackend};
pub use errors::{CacheError, CacheResult};
pub use keys::{fingerprint, task_digest};
pub use providers::{MemoryBackend, NoopBackend, RedisBackend};
pub use store::{CacheStats, CacheStore, ClearOutcome};
