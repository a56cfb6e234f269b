#[macro_use]
extern crate criterion;

use criterion::{black_box, BenchmarkId, Criterion};

use tiny_containers::{FixedMap, Pair, Ring, Vector};

static SIZES: [u32; 4] = [16, 256, 4096, 65536];

fn vector_push(c: &mut Criterion) {
    let mut g = c.benchmark_group("vector_push");
    for n in &SIZES {
        g.bench_with_input(BenchmarkId::new("tiny_containers", n), n, |b, n| {
            b.iter(|| {
                let mut v = Vector::new();
                for i in 0..*n {
                    v.try_push(i).unwrap();
                }
                black_box(v.len())
            })
        });
        g.bench_with_input(BenchmarkId::new("std", n), n, |b, n| {
            b.iter(|| {
                let mut v = Vec::new();
                for i in 0..*n {
                    v.push(i);
                }
                black_box(v.len())
            })
        });
    }
}

fn hash_u32(key: &u32) -> i32 {
    key.wrapping_mul(0x9E37_79B9) as i32
}

fn map_insert_find(c: &mut Criterion) {
    let mut g = c.benchmark_group("fixed_map");
    for n in &SIZES[..3] {
        g.bench_with_input(BenchmarkId::new("insert", n), n, |b, n| {
            b.iter(|| {
                let mut map: FixedMap<u32, u32, 64> = FixedMap::new(hash_u32);
                for i in 0..*n {
                    map.insert(Pair::new(i, i));
                }
                black_box(map.len())
            })
        });

        let mut map: FixedMap<u32, u32, 64> = FixedMap::new(hash_u32);
        for i in 0..*n {
            map.insert(Pair::new(i, i));
        }
        g.bench_with_input(BenchmarkId::new("find", n), n, |b, n| {
            b.iter(|| {
                let mut sum = 0u32;
                for i in 0..*n {
                    sum = sum.wrapping_add(*map.find(&i).unwrap());
                }
                black_box(sum)
            })
        });
    }
}

fn ring_put_get(c: &mut Criterion) {
    c.bench_function("ring_put_get", |b| {
        let mut ring: Ring<u64, 64> = Ring::new();
        b.iter(|| {
            for i in 0..1000u64 {
                ring.put(i);
                if i % 3 == 0 {
                    black_box(ring.get());
                }
            }
            ring.clear();
        })
    });
}

criterion_group!(benches, vector_push, map_insert_find, ring_put_get);
criterion_main!(benches);
