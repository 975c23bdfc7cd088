//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use taskpilot_core::cache::MemoryBackend;
use taskpilot_core::{
    CacheStore, CreateTaskRequest, GenerationCache, Priority, ProviderError, TextGenerator,
};

pub const HOUR: StdDuration = StdDuration::from_secs(3600);

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 30, 0).unwrap()
}

pub async fn memory_store() -> Arc<CacheStore> {
    Arc::new(CacheStore::connect(Arc::new(MemoryBackend::new(1_000)), "ai_cache", HOUR).await)
}

pub async fn memory_cache() -> GenerationCache {
    GenerationCache::new(memory_store().await)
}

pub fn task_request(title: &str, due_in_days: i64, priority: Option<Priority>) -> CreateTaskRequest {
    CreateTaskRequest {
        title: title.to_string(),
        description: Some(format!("{title} details")),
        due_date: Some(now() + Duration::days(due_in_days)),
        priority,
        tags: Some(vec!["project".to_string()]),
        mini_tasks: Some(BTreeMap::from([("first step".to_string(), false)])),
    }
}

/// Generator that echoes which prompt it saw and counts calls
#[derive(Debug, Default)]
pub struct EchoGenerator {
    calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str, _system_instructions: &str) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(format!("response #{n} to: {first_line}"))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}
