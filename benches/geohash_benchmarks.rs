use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use georange::compute::{GeoHash, GeoHashRange, Precision, circle_ranges, range::merge_ranges};
use georange::{Circle, Distance, GeoIndex, Location, MemoryStore};

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let location = Location::new(37.7749, -122.4194).unwrap();

    for chars in [5, 10, 22] {
        let precision = Precision::new(chars).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", chars), &precision, |b, p| {
            b.iter(|| GeoHash::encode(black_box(&location), *p))
        });
    }

    let hash = GeoHash::encode(&location, Precision::DEFAULT);
    group.bench_function("decode", |b| b.iter(|| black_box(&hash).decode()));

    group.finish();
}

fn benchmark_planner(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner");
    let center = Location::new(40.7128, -74.0060).unwrap();

    for meters in [10.0, 500.0, 10_000.0, 1_000_000.0] {
        let circle = Circle::new(center, Distance::meters(meters));
        group.bench_with_input(
            BenchmarkId::new("circle_ranges", meters as u64),
            &circle,
            |b, circle| b.iter(|| circle_ranges(black_box(circle))),
        );
    }

    let ranges: Vec<GeoHashRange> = ["9q8", "9q9", "9qb", "9qc", "dr5", "dr7", "dr4", "dr6", "9q8"]
        .iter()
        .map(|prefix| GeoHashRange::prefixed(&GeoHash::new(*prefix).unwrap()))
        .collect();
    group.bench_function("merge_ranges", |b| {
        b.iter(|| merge_ranges(black_box(ranges.clone())))
    });

    group.finish();
}

fn benchmark_index_writes(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let index = GeoIndex::new(MemoryStore::new());

    c.bench_function("set_location", |b| {
        let mut counter = 0u64;
        b.iter(|| {
            let key = format!("vehicle:{}", counter % 1000);
            let lat = 40.0 + (counter % 1000) as f64 * 0.0001;
            counter += 1;
            runtime
                .block_on(index.set_location(&key, Location::new(lat, -74.0).unwrap()))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_codec,
    benchmark_planner,
    benchmark_index_writes
);
criterion_main!(benches);
