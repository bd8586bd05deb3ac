//! Benchmarks for exact search and ranking

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use place_recommender::pipeline::rank;
use place_recommender::{FlatIndex, Index, MetadataStore, ReviewRecord, Vector};

fn create_unit_vectors(n: usize, dim: usize) -> Vec<Vector> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rand::random::<f32>() - 0.5).collect();
            Vector::new(data).normalized().unwrap()
        })
        .collect()
}

fn create_metadata(n: usize) -> MetadataStore {
    MetadataStore::from_records(
        (0..n)
            .map(|i| ReviewRecord {
                name: format!("place {}", i),
                address: format!("{} Main St", i),
                review_text: "quiet, good coffee".to_string(),
            })
            .collect(),
    )
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let dim = 1536;

    for size in [100, 1000, 10000].iter() {
        let index = FlatIndex::from_vectors(dim, create_unit_vectors(*size, dim)).unwrap();
        let query = create_unit_vectors(1, dim).remove(0);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| index.search(black_box(&query), black_box(5)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_rank(c: &mut Criterion) {
    let dim = 1536;
    let size = 1000;
    let index = FlatIndex::from_vectors(dim, create_unit_vectors(size, dim)).unwrap();
    let metadata = create_metadata(size);
    let query = create_unit_vectors(1, dim).remove(0);
    let neighbors = index.search(&query, 5).unwrap();

    c.bench_function("rank_top5", |b| {
        b.iter(|| rank(black_box(&neighbors), black_box(&metadata)));
    });
}

criterion_group!(benches, benchmark_search, benchmark_rank);
criterion_main!(benches);
