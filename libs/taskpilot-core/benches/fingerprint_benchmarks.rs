use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use taskpilot_core::cache::{fingerprint, MemoryBackend};
use taskpilot_core::prompts::build_summary_prompt;
use taskpilot_core::test_utils::{fixed_now, task, CountingGenerator, TaskFixtureExt};
use taskpilot_core::{CacheStore, GenerationCache, Priority, Task};
use tokio::runtime::Runtime;

fn tasks(count: usize) -> Vec<Task> {
    let now = fixed_now();
    (0..count)
        .map(|i| {
            let id = i64::try_from(i).unwrap_or(i64::MAX);
            let t = task(id, &format!("Benchmark task {i}"), now + Duration::hours(id - 50))
                .with_mini_tasks(&[("design", true), ("build", false), ("review", false)]);
            match i % 4 {
                0 => t.completed(),
                1 => t.with_priority(Priority::High),
                2 => t.with_priority(Priority::Low),
                _ => t,
            }
        })
        .collect()
}

fn bench_fingerprint(c: &mut Criterion) {
    let mut group = c.benchmark_group("fingerprint");

    for size in [10, 100, 1000].iter() {
        let input = tasks(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(fingerprint("ai_cache", "summary", black_box(input))));
        });
    }

    group.finish();
}

fn bench_summary_prompt(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_prompt");

    for size in [10, 100, 1000].iter() {
        let input = tasks(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| black_box(build_summary_prompt(black_box(input), fixed_now())));
        });
    }

    group.finish();
}

fn bench_cached_generation(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = rt.block_on(async {
        let store = CacheStore::connect(
            Arc::new(MemoryBackend::new(10_000)),
            "ai_cache",
            std::time::Duration::from_secs(3600),
        )
        .await;
        GenerationCache::new(Arc::new(store))
    });
    let generator = CountingGenerator::new("cached text");
    let input = tasks(100);

    rt.block_on(async {
        cache
            .get_or_generate("summary", &input, |t| generator.generate_for(t))
            .await
            .unwrap();
    });

    c.bench_function("get_or_generate_hit_100_tasks", |b| {
        b.iter(|| {
            rt.block_on(async {
                let text = cache
                    .get_or_generate("summary", &input, |t| generator.generate_for(t))
                    .await
                    .unwrap();
                black_box(text);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_summary_prompt,
    bench_cached_generation
);
criterion_main!(benches);
