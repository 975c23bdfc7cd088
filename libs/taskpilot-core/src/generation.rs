//! Cache-aside wrapper around text generation

use crate::cache::{fingerprint, CacheStore};
use crate::models::Task;
use crate::provider::ProviderError;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Serves generated text from the cache when the task collection is unchanged
///
/// Concurrent misses on the same key are not coalesced; each one runs the
/// generator.
#[derive(Debug, Clone)]
pub struct GenerationCache {
    store: Arc<CacheStore>,
}

impl GenerationCache {
    #[must_use]
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Key under which `tasks` are cached for `endpoint`
    #[must_use]
    pub fn key_for(&self, endpoint: &str, tasks: &[Task]) -> String {
        fingerprint(self.store.namespace(), endpoint, tasks)
    }

    /// Return cached text for `(endpoint, tasks)` or run `generator` once
    ///
    /// A successful result is cached for the store's TTL; a failed one is
    /// returned as-is and not cached. Cache trouble never reaches the caller.
    ///
    /// # Errors
    /// Returns the generator's error on a miss whose generation failed
    #[instrument(skip(self, tasks, generator), fields(task_count = tasks.len()))]
    pub async fn get_or_generate<'a, F, Fut>(
        &self,
        endpoint: &str,
        tasks: &'a [Task],
        generator: F,
    ) -> Result<String, ProviderError>
    where
        F: FnOnce(&'a [Task]) -> Fut,
        Fut: Future<Output = Result<String, ProviderError>>,
    {
        let key = self.key_for(endpoint, tasks);

        if let Some(text) = self.store.get(&key).await {
            debug!(key = %key, "Serving generated text from cache");
            return Ok(text);
        }

        let text = generator(tasks).await?;

        if !self.store.set(&key, &text, self.store.default_ttl()).await {
            debug!(key = %key, "Generated text was not cached");
        }
        Ok(text)
    }
}
