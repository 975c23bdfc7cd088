//! Cache-aside behaviour of the generation pipeline against real backends

mod common;

use common::{memory_cache, memory_store, now, EchoGenerator, HOUR};
use std::sync::Arc;
use taskpilot_core::cache::{fingerprint, NoopBackend};
use taskpilot_core::{CacheStore, GenerationCache, Task, TextGenerator};

fn sample_tasks() -> Vec<Task> {
    let json = serde_json::json!([
        {
            "id": 1, "title": "Renew certificates", "description": null,
            "due_date": "2024-09-01T09:00:00Z", "completed": true,
            "created_at": "2024-08-20T10:00:00Z", "owner_id": 7, "priority": "high",
            "tags": ["ops"], "mini_tasks": {"staging": true, "production": true}
        },
        {
            "id": 2, "title": "Rotate API keys", "description": "All services",
            "due_date": "2024-09-01T12:00:00Z", "completed": false,
            "created_at": "2024-08-21T10:00:00Z", "owner_id": 7, "priority": "high",
            "tags": [], "mini_tasks": {}
        },
        {
            "id": 3, "title": "Write postmortem", "description": null,
            "due_date": "2024-09-09T17:00:00Z", "completed": false,
            "created_at": "2024-08-22T10:00:00Z", "owner_id": 7, "priority": null
        }
    ]);
    serde_json::from_value(json).unwrap()
}

async fn summarize(
    cache: &GenerationCache,
    generator: &EchoGenerator,
    tasks: &[Task],
) -> String {
    cache
        .get_or_generate("summary", tasks, |tasks| async move {
            let prompt = taskpilot_core::prompts::build_summary_prompt(tasks, now());
            generator.generate(&prompt, "").await
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_identical_requests_generate_once() {
    let cache = memory_cache().await;
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    let first = summarize(&cache, &generator, &tasks).await;
    let second = summarize(&cache, &generator, &tasks).await;

    assert_eq!(first, second);
    assert_eq!(generator.calls(), 1);
    assert!(first.starts_with("response #1 to: I need a comprehensive"));
}

#[tokio::test]
async fn test_stored_under_fingerprint_key() {
    let store = memory_store().await;
    let cache = GenerationCache::new(store.clone());
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    let text = summarize(&cache, &generator, &tasks).await;

    let key = fingerprint("ai_cache", "summary", &tasks);
    assert_eq!(store.get(&key).await, Some(text));
}

#[tokio::test]
async fn test_disabled_cache_still_answers() {
    let store = CacheStore::connect(Arc::new(NoopBackend), "ai_cache", HOUR).await;
    let cache = GenerationCache::new(Arc::new(store));
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    let first = summarize(&cache, &generator, &tasks).await;
    let second = summarize(&cache, &generator, &tasks).await;

    assert_ne!(first, second);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_clearing_namespace_forces_regeneration() {
    let store = memory_store().await;
    let cache = GenerationCache::new(store.clone());
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    summarize(&cache, &generator, &tasks).await;
    assert!(store.set("sessions:abc", "unrelated", HOUR).await);

    let outcome = store.clear_namespace().await;
    assert!(outcome.success);
    assert_eq!(outcome.removed, 1);
    assert_eq!(store.get("sessions:abc").await.as_deref(), Some("unrelated"));

    summarize(&cache, &generator, &tasks).await;
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_misses_may_each_generate() {
    let cache = memory_cache().await;
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    let (a, b) = tokio::join!(
        summarize(&cache, &generator, &tasks),
        summarize(&cache, &generator, &tasks)
    );

    assert!(!a.is_empty() && !b.is_empty());
    assert!((1..=2).contains(&generator.calls()));
}

#[tokio::test]
async fn test_stats_reflect_hits_and_keys() {
    let store = memory_store().await;
    let cache = GenerationCache::new(store.clone());
    let generator = EchoGenerator::default();
    let tasks = sample_tasks();

    summarize(&cache, &generator, &tasks).await;
    summarize(&cache, &generator, &tasks).await;

    let stats = store.stats().await;
    assert!(stats.connected);
    assert_eq!(stats.backend, "memory");
    assert_eq!(stats.key_count, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
}
