use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::{tempdir, TempDir};

use marten::core::config::IndexConfig;
use marten::core::types::Document;
use marten::index::handle::Index;
use marten::indexer::single_pass::SinglePassIndexer;
use marten::query::engine::QueryEngine;
use marten::query::terms::MatchingQueryTerms;

fn build_index() -> (TempDir, Index) {
    let dir = tempdir().unwrap();
    let config = IndexConfig::with_path(dir.path(), "data");
    let mut indexer = SinglePassIndexer::create(&config).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    let vocabulary: Vec<String> = (0..2000).map(|i| format!("w{:04}", i)).collect();
    for i in 0..5000 {
        let terms: Vec<String> = (0..80)
            .map(|_| vocabulary[rng.gen_range(0..vocabulary.len())].clone())
            .collect();
        indexer
            .index_document(&Document::new(format!("doc{}", i), terms))
            .unwrap();
    }
    indexer.finish().unwrap();
    let index = Index::open(dir.path(), "data").unwrap();
    (dir, index)
}

fn bench_matching(c: &mut Criterion) {
    let (_dir, index) = build_index();
    let engine = QueryEngine::new(&index, "bm25").unwrap();

    c.bench_function("daat_two_terms", |b| {
        let terms = MatchingQueryTerms::parse("w0001 w0002");
        b.iter(|| engine.match_query(&terms).unwrap());
    });

    c.bench_function("daat_five_terms", |b| {
        let terms = MatchingQueryTerms::parse("w0001 w0002 w0100 w0500 w1999");
        b.iter(|| engine.match_query(&terms).unwrap());
    });

    c.bench_function("lexicon_lookup", |b| {
        b.iter(|| index.lookup("w1234").unwrap());
    });
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
