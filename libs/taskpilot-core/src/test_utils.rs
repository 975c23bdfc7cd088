//! Fixtures and test doubles shared by unit tests, integration tests, and the CLI

use crate::cache::{BackendInfo, CacheBackend, CacheError, CacheResult};
use crate::models::{Priority, Task};
use crate::provider::{ProviderError, TextGenerator};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

/// Reference instant used by deterministic tests: 2024-06-15 12:00 UTC
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Pending task with sensible defaults
#[must_use]
pub fn task(id: i64, title: &str, due_date: DateTime<Utc>) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        due_date: Some(due_date),
        completed: false,
        created_at: fixed_now() - Duration::days(7),
        owner_id: 1,
        priority: None,
        tags: Vec::new(),
        mini_tasks: BTreeMap::new(),
    }
}

/// Builder-style tweaks for fixture tasks
pub trait TaskFixtureExt {
    #[must_use]
    fn completed(self) -> Self;
    #[must_use]
    fn with_priority(self, priority: Priority) -> Self;
    #[must_use]
    fn with_owner(self, owner_id: i64) -> Self;
    #[must_use]
    fn with_mini_tasks(self, items: &[(&str, bool)]) -> Self;
}

impl TaskFixtureExt for Task {
    fn completed(mut self) -> Self {
        self.completed = true;
        self
    }

    fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    fn with_owner(mut self, owner_id: i64) -> Self {
        self.owner_id = owner_id;
        self
    }

    fn with_mini_tasks(mut self, items: &[(&str, bool)]) -> Self {
        self.mini_tasks = items
            .iter()
            .map(|(label, done)| ((*label).to_string(), *done))
            .collect();
        self
    }
}

/// Three tasks relative to `now`: one done and past due, one pending
/// high-priority task due yesterday, one pending task due next week
#[must_use]
pub fn create_mock_tasks(now: DateTime<Utc>) -> Vec<Task> {
    vec![
        task(1, "Submit expense report", now - Duration::days(1)).completed(),
        task(2, "Fix login bug", now - Duration::days(1)).with_priority(Priority::High),
        task(3, "Plan team offsite", now + Duration::days(7)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    /// Health check fails, so the store never connects
    Unreachable,
    /// Health check passes, every later call fails
    AfterConnect,
}

/// Cache backend that fails on purpose and counts every call it receives
#[derive(Debug)]
pub struct FailingCacheBackend {
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingCacheBackend {
    #[must_use]
    pub fn unreachable() -> Self {
        Self {
            mode: FailureMode::Unreachable,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn failing_after_connect() -> Self {
        Self {
            mode: FailureMode::AfterConnect,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of trait calls received, including the health check
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> CacheResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Connection("connection refused".to_string()))
    }
}

#[async_trait]
impl CacheBackend for FailingCacheBackend {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: StdDuration) -> CacheResult<()> {
        self.fail()
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        self.fail()
    }

    async fn delete_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        self.fail()
    }

    async fn count_prefix(&self, _prefix: &str) -> CacheResult<u64> {
        self.fail()
    }

    async fn info(&self) -> CacheResult<BackendInfo> {
        self.fail()
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self.mode {
            FailureMode::Unreachable => self.fail(),
            FailureMode::AfterConnect => {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

/// Text generator that records how often it was asked to generate
#[derive(Debug)]
pub struct CountingGenerator {
    response: Result<String, ProviderError>,
    calls: AtomicUsize,
}

impl CountingGenerator {
    /// Always succeeds with `text`
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails with `error`
    #[must_use]
    pub fn failing(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generator closure body for `GenerationCache::get_or_generate`
    ///
    /// # Errors
    /// Returns the configured error for a failing generator
    pub async fn generate_for(&self, tasks: &[Task]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .map(|text| format!("{text} ({} tasks)", tasks.len()))
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str, _system_instructions: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
