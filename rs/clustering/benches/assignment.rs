use clustering::assignment::{assign_sequential, AssignmentEngine};
use clustering::model::{Centroids, FeatureVector, Record};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use utils::test_utils::generate_random_points;

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("Assignment");
    let dimension = 13;
    let num_datapoints = 100000;
    let records: Vec<Record> = generate_random_points(num_datapoints, dimension)
        .into_iter()
        .map(|p| Record::new(FeatureVector::new(p)))
        .collect();
    let centroids = Centroids::new(
        records[..8]
            .iter()
            .map(|r| r.features.clone())
            .collect(),
    )
    .unwrap();

    for num_threads in [1, 2, 4, 8].iter() {
        let engine = AssignmentEngine::new(*num_threads, 0).unwrap();
        group.bench_with_input(
            BenchmarkId::new("engine", num_threads),
            num_threads,
            |bencher, _| {
                bencher.iter(|| {
                    let mut local = records.clone();
                    black_box(engine.assign(&mut local, &centroids))
                })
            },
        );
    }

    group.bench_function("sequential", |bencher| {
        bencher.iter(|| {
            let mut local = records.clone();
            black_box(assign_sequential(&mut local, &centroids))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_assignment);
criterion_main!(benches);
