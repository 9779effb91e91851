//! Criterion benchmarks for training and classification.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use falx::classifier::{BayesClassifier, Classifier, FisherClassifier, inverse_chi_square};
use falx::config::AnalysisConfig;
use falx::counter_store::{CounterStore, JournaledCounterStore, MemoryCounterStore};
use falx::storage::memory::MemoryStorage;

const WORDS: &[&str] = &[
    "quick", "rabbit", "money", "casino", "online", "water", "fences", "brown", "jumps",
    "pharmaceuticals", "meeting", "agenda", "invoice", "cheap", "offer", "project", "deadline",
    "report", "winner", "prize",
];

/// Generate deterministic pseudo-random documents.
fn generate_documents(count: usize, length: usize) -> Vec<String> {
    let mut state = 0x2545_f491_u64;
    (0..count)
        .map(|_| {
            (0..length)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    WORDS[(state % WORDS.len() as u64) as usize]
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn trained(store: Arc<dyn CounterStore>, documents: &[String]) -> BayesClassifier {
    let extractor = AnalysisConfig::default().build_extractor().unwrap();
    let classifier = BayesClassifier::new(store, extractor);
    for (i, document) in documents.iter().enumerate() {
        let category = ["good", "bad", "spam"][i % 3];
        classifier.train(document, category).unwrap();
    }
    classifier
}

fn bench_training(c: &mut Criterion) {
    let documents = generate_documents(100, 12);
    let mut group = c.benchmark_group("train");
    group.throughput(Throughput::Elements(documents.len() as u64));

    group.bench_function("memory_store", |b| {
        b.iter(|| trained(Arc::new(MemoryCounterStore::new()), black_box(&documents)))
    });

    group.bench_function("journaled_store", |b| {
        b.iter(|| {
            let store = JournaledCounterStore::open_default(Arc::new(MemoryStorage::default()))
                .unwrap();
            trained(Arc::new(store), black_box(&documents))
        })
    });

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let documents = generate_documents(300, 12);
    let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
    let bayes = trained(Arc::clone(&store), &documents);
    let fisher = FisherClassifier::new(store, AnalysisConfig::default().build_extractor().unwrap());
    let queries = generate_documents(10, 8);

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(queries.len() as u64));

    group.bench_function("bayes", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(bayes.classify(black_box(query), "unknown").unwrap());
            }
        })
    });

    group.bench_function("fisher", |b| {
        b.iter(|| {
            for query in &queries {
                black_box(fisher.classify(black_box(query), "unknown").unwrap());
            }
        })
    });

    group.finish();
}

fn bench_inverse_chi_square(c: &mut Criterion) {
    c.bench_function("inverse_chi_square_df200", |b| {
        b.iter(|| inverse_chi_square(black_box(180.0), black_box(200)))
    });
}

criterion_group!(
    benches,
    bench_training,
    bench_classification,
    bench_inverse_chi_square
);
criterion_main!(benches);
