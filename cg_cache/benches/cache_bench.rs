use std::hint::black_box;

use cg_cache::CacheConfig;
use cg_cache::CacheManager;
use cg_cache::generate_key;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;

fn bench_get(c: &mut Criterion) {
    let cache: CacheManager<String> = CacheManager::new(CacheConfig::new().with_max_size(10_000)).unwrap();
    for i in 0..10_000 {
        cache.set(format!("key_{i}"), format!("value_{i}"));
    }

    c.bench_function("cache_get_hit", |b| b.iter(|| black_box(cache.get(black_box("key_5000")))));
    c.bench_function("cache_get_miss", |b| b.iter(|| black_box(cache.get(black_box("absent")))));
}

fn bench_set_with_eviction(c: &mut Criterion) {
    let cache: CacheManager<u64> = CacheManager::new(CacheConfig::new().with_max_size(1_000)).unwrap();
    let mut i = 0u64;

    c.bench_function("cache_set_evicting", |b| {
        b.iter(|| {
            i += 1;
            cache.set(format!("key_{i}"), i);
        })
    });
}

fn bench_generate_key(c: &mut Criterion) {
    let prompt = "a watercolor painting of a lighthouse on a cliff at dusk, warm light";
    c.bench_function("generate_key", |b| b.iter(|| black_box(generate_key("image", [black_box(prompt), "1024x1024", "seed=42"]))));
}

criterion_group!(benches, bench_get, bench_set_with_eviction, bench_generate_key);
criterion_main!(benches);
