//! Criterion micro-benchmarks for the counter backings, in the style of
//! the teacher's own `[[bench]] name = "sux"` / `examples/bench_bit_vec.rs`.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use facetcore::bits::{Incrementable, Vector, VectorMut};
use facetcore::npm::{NPlaneMutable, NpmOptions, PlaneVariant};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn long_tailed_maxima(n: usize, rng: &mut SmallRng) -> Vec<u64> {
    (0..n)
        .map(|_| {
            if rng.gen_bool(0.99) {
                rng.gen_range(0..16)
            } else {
                rng.gen_range(16..1_000_000)
            }
        })
        .collect()
}

fn bench_inc(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(1);
    let n = 1_000_000;
    let maxima = long_tailed_maxima(n, &mut rng);

    let mut group = c.benchmark_group("npm_inc");
    for variant in [PlaneVariant::Split, PlaneVariant::SplitRank, PlaneVariant::Shift] {
        let options = NpmOptions {
            variant,
            ..NpmOptions::default()
        };
        let mut npm = NPlaneMutable::new(&maxima, options).unwrap();
        group.bench_function(format!("{variant:?}"), |b| {
            b.iter(|| {
                let i = rng.gen_range(0..n);
                if npm.get(i) < maxima[i] {
                    npm.inc(black_box(i));
                }
            })
        });
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(2);
    let n = 1_000_000;
    let maxima = long_tailed_maxima(n, &mut rng);
    let npm = NPlaneMutable::new(&maxima, NpmOptions::default()).unwrap();

    c.bench_function("npm_get", |b| {
        b.iter(|| black_box(npm.get(black_box(rng.gen_range(0..n)))))
    });
}

fn bench_clear(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(3);
    let n = 200_000;
    let maxima = long_tailed_maxima(n, &mut rng);
    let mut npm = NPlaneMutable::new(&maxima, NpmOptions::default()).unwrap();
    for i in 0..n {
        if maxima[i] > 0 {
            npm.set(i, 1);
        }
    }

    c.bench_function("npm_clear", |b| b.iter(|| npm.clear()));
}

criterion_group!(benches, bench_inc, bench_get, bench_clear);
criterion_main!(benches);
