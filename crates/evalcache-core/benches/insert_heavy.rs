//! Criterion benchmark: insert-heavy workloads on a bare cache and under a
//! Pareto view.
//! Run with: cargo bench -p evalcache-core --bench insert_heavy

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Bencher, Criterion};
use evalcache_core::{
    AppId, Cache, CacheExt, CacheRead, Domain, FieldTag, KeyQuery, LocalCache, ParetoView,
    ResponseFieldMap,
};

/// Deterministic point on a slanted grid so that roughly a tenth of the
/// points land on the front.
fn sample(i: usize) -> (Domain, ResponseFieldMap) {
    let x = i as f64 * 0.37;
    let f1 = (i % 97) as f64;
    let f2 = ((i * 31) % 89) as f64;
    let fields = ResponseFieldMap::new()
        .with(FieldTag::Objective, f1 + f2)
        .with(FieldTag::MultiObjective, vec![f1, f2]);
    (Domain::real(vec![x, -x]), fields)
}

fn bench_insert_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_heavy");
    if std::env::var("QUICK").is_ok() {
        group
            .sample_size(10)
            .measurement_time(Duration::from_secs(2));
    } else {
        group.sample_size(20);
    }

    group.bench_function("local_2000_inserts_then_lookups", |b: &mut Bencher<'_>| {
        b.iter(|| {
            let mut cache = LocalCache::new();
            let app = AppId::new();
            for i in 0..2000 {
                let (domain, fields) = sample(i);
                cache.insert(app, &domain, fields).unwrap();
            }
            let mut hits = 0usize;
            for i in (0..2000).step_by(7) {
                let (domain, _) = sample(i);
                hits += usize::from(!cache.find(app, KeyQuery::Domain(&domain)).0.is_end());
            }
            black_box(hits);
        });
    });

    group.bench_function("pareto_view_1000_inserts", |b: &mut Bencher<'_>| {
        b.iter(|| {
            let core = LocalCache::new().into_shared();
            let view = ParetoView::over(core.clone()).unwrap();
            let app = AppId::new();
            for i in 0..1000 {
                let (domain, fields) = sample(i);
                core.borrow_mut().insert(app, &domain, fields).unwrap();
            }
            black_box(view.inspect(|r| r.size()));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert_heavy);
criterion_main!(benches);
