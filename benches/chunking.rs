use context_rag::embeddings::{ChunkingConfig, chunk_text, split_sentences};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_document() -> String {
    (0..2_000)
        .map(|i| {
            format!(
                "Paragraph {} explains how component {} interacts with the storage layer. \
                 It notes that value {} is cached for later lookups!",
                i,
                i % 17,
                i * 31
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = sample_document();
    let config = ChunkingConfig::default();

    c.bench_function("sentence_split", |b| {
        b.iter(|| split_sentences(black_box(&document)))
    });
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_text(black_box(&document), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
