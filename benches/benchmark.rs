use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use assoc_maps::{AvlTreeMap, ChainedHashMap};

const N: usize = 100_000;

pub fn tree_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("tree_insert", |b| {
        let mut map = AvlTreeMap::new();
        b.iter(|| {
            for value in &values {
                black_box(map.insert(*value, *value)).ok();
            }
        })
    });

    c.bench_function("tree_extend", |b| {
        b.iter(|| {
            let mut map = AvlTreeMap::new();
            black_box(map.try_extend(values.iter().map(|value| (*value, *value)))).ok();
        })
    });

    let map = AvlTreeMap::try_from_entries(values.iter().map(|value| (*value, *value)))
        .expect("benchmark map");

    c.bench_function("tree_get", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.get(value));
            }
        })
    });

    c.bench_function("tree_iter", |b| {
        b.iter(|| {
            for (k, v) in &map {
                black_box((k, v));
            }
        })
    });

    c.bench_function("tree_remove", |b| {
        let mut map = map.clone();
        b.iter(|| {
            for value in &values {
                black_box(map.remove(value)).ok();
            }
        })
    });
}

pub fn hash_benchmarks(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let values: Vec<i32> = (1..=N).map(|_| rng.gen()).collect();

    c.bench_function("hash_insert", |b| {
        let mut map = ChainedHashMap::with_bucket_count(N);
        b.iter(|| {
            for value in &values {
                black_box(map.insert(*value, *value)).ok();
            }
        })
    });

    let mut map = ChainedHashMap::with_bucket_count(N);
    for value in &values {
        map.insert(*value, *value).expect("benchmark map");
    }

    c.bench_function("hash_get", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.get(value));
            }
        })
    });

    c.bench_function("hash_iter", |b| {
        b.iter(|| {
            for (k, v) in &map {
                black_box((k, v));
            }
        })
    });

    c.bench_function("hash_remove", |b| {
        let mut map = map.clone();
        b.iter(|| {
            for value in &values {
                black_box(map.remove(value)).ok();
            }
        })
    });
}

criterion_group!(benches, tree_benchmarks, hash_benchmarks);
criterion_main!(benches);
