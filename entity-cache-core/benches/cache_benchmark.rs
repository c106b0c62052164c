use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use entity_cache_core::{
    build_query_key, CacheConfig, CachedList, Entity, EntityCache, FilterOperator, Scalar,
    TypeKey, TypeOptions, TypeRegistry,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::thread;

const ORDER: TypeKey = TypeKey::new("Order");
const RUSH_ORDER: TypeKey = TypeKey::new("RushOrder");
const EXPRESS_ORDER: TypeKey = TypeKey::new("ExpressOrder");

static REGISTRY: Lazy<Arc<TypeRegistry>> = Lazy::new(|| {
    let registry = TypeRegistry::builder()
        .register(ORDER, TypeOptions::new())
        .register(RUSH_ORDER, TypeOptions::new().parent(ORDER))
        .register(EXPRESS_ORDER, TypeOptions::new().parent(RUSH_ORDER))
        .build()
        .unwrap();
    Arc::new(registry)
});

struct Row {
    kind: TypeKey,
    id: usize,
}

impl Entity for Row {
    fn type_key(&self) -> TypeKey {
        self.kind
    }

    fn id(&self) -> String {
        self.id.to_string()
    }
}

fn new_cache() -> EntityCache {
    EntityCache::new(REGISTRY.clone(), &CacheConfig::default())
}

fn populated(kind: TypeKey, size: usize) -> EntityCache {
    let cache = new_cache();
    for id in 0..size {
        cache.add(Arc::new(Row { kind, id }));
    }
    cache
}

fn bench_add_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_sequential");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("fresh", size), size, |b, &size| {
            b.iter(|| {
                let cache = new_cache();
                for id in 0..size {
                    cache.add(black_box(Arc::new(Row { kind: ORDER, id })));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("replace", size), size, |b, &size| {
            let cache = populated(ORDER, size);
            b.iter(|| {
                for id in 0..size {
                    cache.add(black_box(Arc::new(Row { kind: ORDER, id })));
                }
            });
        });
    }

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for size in [10, 100, 1000].iter() {
        let exact = populated(ORDER, *size);
        group.bench_with_input(BenchmarkId::new("exact", size), size, |b, &size| {
            b.iter(|| {
                for id in 0..size {
                    black_box(exact.get(ORDER, &id.to_string()));
                }
            });
        });

        // Two levels of subtype probing per hit
        let derived = populated(EXPRESS_ORDER, *size);
        group.bench_with_input(BenchmarkId::new("subtype_probe", size), size, |b, &size| {
            b.iter(|| {
                for id in 0..size {
                    black_box(derived.get(ORDER, &id.to_string()));
                }
            });
        });
    }

    group.finish();
}

fn bench_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("lists");

    group.bench_function("build_query_key", |b| {
        let filters = [
            entity_cache_core::Criterion::new("Status", FilterOperator::Equals, "Open"),
            entity_cache_core::Criterion::new("Total", FilterOperator::GreaterThan, "100"),
        ];
        b.iter(|| black_box(build_query_key(ORDER, &filters, Some(50))));
    });

    group.bench_function("add_list_then_invalidate", |b| {
        let cache = new_cache();
        let list = CachedList::scalars(vec![Scalar::Integer(1); 32]);
        b.iter(|| {
            for page in 0..16 {
                let key = build_query_key(ORDER, &[page], Some(32));
                cache.add_list(ORDER, &key, list.clone());
            }
            // Expires the Order lists through the ancestor chain
            cache.add(Arc::new(Row {
                kind: EXPRESS_ORDER,
                id: 1,
            }));
        });
    });

    group.finish();
}

fn bench_concurrent_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_get");

    for threads in [2, 4, 8].iter() {
        let cache = Arc::new(populated(ORDER, 1000));
        group.bench_with_input(
            BenchmarkId::new("threads", threads),
            threads,
            |b, &threads| {
                b.iter(|| {
                    let handles: Vec<_> = (0..threads)
                        .map(|t| {
                            let cache = cache.clone();
                            thread::spawn(move || {
                                for id in (t..1000).step_by(threads) {
                                    black_box(cache.get(ORDER, &id.to_string()));
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_sequential,
    bench_get,
    bench_lists,
    bench_concurrent_get
);
criterion_main!(benches);
