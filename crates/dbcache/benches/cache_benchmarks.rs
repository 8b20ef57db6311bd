//! Performance benchmarks for the connection cache
//!
//! Measures the hit path, which holds the entry lock only for a map lookup,
//! and lock contention under concurrent lookups.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dbcache::{BoxError, ConnectionCache, Handle, HandleFactory};
use tokio::runtime::Runtime;

struct NullHandle;

#[async_trait]
impl Handle for NullHandle {
    fn set_max_idle_time(&self, _idle: Duration) {}

    async fn close(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

struct NullFactory;

#[async_trait]
impl HandleFactory for NullFactory {
    type Handle = NullHandle;

    async fn open(&self, _driver: &str, _key: &str) -> Result<NullHandle, BoxError> {
        Ok(NullHandle)
    }
}

fn create_test_key(index: usize) -> String {
    format!("postgres://bench@db-{index}.internal/app")
}

fn bench_get_hit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("get_hit");

    for num_entries in [1usize, 100, 10_000] {
        let cache = rt.block_on(async {
            let cache = ConnectionCache::new("bench", NullFactory);
            for i in 0..num_entries {
                cache.get(&create_test_key(i)).await.unwrap();
            }
            cache
        });
        let key = create_test_key(num_entries / 2);

        group.bench_with_input(
            BenchmarkId::from_parameter(num_entries),
            &num_entries,
            |b, _| {
                b.to_async(&rt).iter(|| async {
                    let _ = black_box(cache.get(&key).await);
                });
            },
        );

        rt.block_on(cache.shutdown()).unwrap();
    }

    group.finish();
}

fn bench_concurrent_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_get");

    for num_tasks in [2usize, 8, 32] {
        group.bench_with_input(
            BenchmarkId::new("tasks", num_tasks),
            &num_tasks,
            |b, &num_tasks| {
                let rt = Runtime::new().unwrap();
                let cache = rt.block_on(async {
                    let cache = Arc::new(ConnectionCache::new("bench", NullFactory));
                    for i in 0..16 {
                        cache.get(&create_test_key(i)).await.unwrap();
                    }
                    cache
                });

                b.to_async(&rt).iter(|| {
                    let cache = Arc::clone(&cache);
                    async move {
                        let handles: Vec<_> = (0..num_tasks)
                            .map(|task_id| {
                                let cache = Arc::clone(&cache);
                                tokio::spawn(async move {
                                    for i in 0..100 {
                                        let key = create_test_key((task_id + i) % 16);
                                        let _ = cache.get(&key).await;
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.await.unwrap();
                        }
                    }
                });

                rt.block_on(cache.shutdown()).unwrap();
            },
        );
    }

    group.finish();
}

fn bench_cold_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let cache = rt.block_on(async { ConnectionCache::new("bench", NullFactory) });
    let mut counter = 0usize;

    c.bench_function("cold_get_then_remove", |b| {
        b.to_async(&rt).iter(|| {
            counter += 1;
            let key = create_test_key(counter);
            let cache = &cache;
            async move {
                let _ = black_box(cache.get(&key).await);
                let _ = cache.remove(&key).await;
            }
        });
    });

    rt.block_on(cache.shutdown()).unwrap();
}

criterion_group!(benches, bench_get_hit, bench_concurrent_get, bench_cold_get);
criterion_main!(benches);
