//! Concrete cache backends

mod memory;
mod noop;
mod redis;

pub use memory::MemoryBackend;
pub use noop::NoopBackend;
pub use redis::{RedisBackend, RedisBackendConfig};
