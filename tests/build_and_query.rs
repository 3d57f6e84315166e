use std::collections::HashMap;

use tempfile::tempdir;

use marten::core::config::{IndexConfig, QueryConfig};
use marten::core::types::{DocId, Document};
use marten::index::handle::Index;
use marten::index::layout::IndexLayout;
use marten::indexer::merge::recompress;
use marten::indexer::single_pass::SinglePassIndexer;
use marten::query::engine::QueryEngine;
use marten::query::modifiers::modifier_for;
use marten::query::terms::MatchingQueryTerms;

fn doc(docno: &str, text: &str) -> Document {
    Document::new(docno, text.split_whitespace().map(String::from).collect())
}

fn build(dir: &std::path::Path, configure: impl FnOnce(&mut IndexConfig), docs: &[(&str, &str)]) {
    let mut config = IndexConfig::with_path(dir, "data");
    configure(&mut config);
    let mut indexer = SinglePassIndexer::create(&config).unwrap();
    for (docno, text) in docs {
        indexer.index_document(&doc(docno, text)).unwrap();
    }
    indexer.finish().unwrap();
}

#[test]
fn two_document_collection_statistics() {
    let dir = tempdir().unwrap();
    build(dir.path(), |_| {}, &[("d0", "a b a"), ("d1", "b c")]);
    let index = Index::open(dir.path(), "data").unwrap();

    let a = index.lookup("a").unwrap().unwrap();
    assert_eq!((a.doc_freq, a.collection_freq), (1, 2));
    let b = index.lookup("b").unwrap().unwrap();
    assert_eq!((b.doc_freq, b.collection_freq), (2, 2));
    let c = index.lookup("c").unwrap().unwrap();
    assert_eq!((c.doc_freq, c.collection_freq), (1, 1));

    let mut cursor = index.open_cursor(&b).unwrap();
    let ids: Vec<u32> = std::iter::from_fn(|| cursor.next().unwrap().map(|p| p.doc_id.0)).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn boolean_fallback_is_a_noop_without_full_matches() {
    let dir = tempdir().unwrap();
    build(dir.path(), |_| {}, &[("d0", "a b a"), ("d1", "b c")]);
    let index = Index::open(dir.path(), "data").unwrap();

    // No document contains both "a" and "c"
    let terms = MatchingQueryTerms::parse("a c");
    let engine = QueryEngine::new(&index, "bm25").unwrap();
    let mut results = engine.match_query(&terms).unwrap();
    let scores_before = results.scores.clone();
    let ids_before = results.doc_ids.clone();

    let fallback = modifier_for("boolean", &QueryConfig::default()).unwrap();
    let changed = fallback.modify(&index, &terms, &mut results).unwrap();
    assert!(!changed);
    assert_eq!(results.scores, scores_before);
    assert_eq!(results.doc_ids, ids_before);
}

#[test]
fn round_trip_frequencies_match_the_collection() {
    let dir = tempdir().unwrap();
    let docs = [
        ("d0", "the quick brown fox"),
        ("d1", "the lazy dog the dog"),
        ("d2", "quick quick slow"),
        ("d3", "fox"),
    ];
    build(dir.path(), |_| {}, &docs);
    let index = Index::open(dir.path(), "data").unwrap();

    // Recount from the raw collection
    let mut doc_freq: HashMap<&str, u32> = HashMap::new();
    let mut collection_freq: HashMap<&str, u64> = HashMap::new();
    for (_, text) in &docs {
        let mut seen = std::collections::HashSet::new();
        for term in text.split_whitespace() {
            *collection_freq.entry(term).or_default() += 1;
            if seen.insert(term) {
                *doc_freq.entry(term).or_default() += 1;
            }
        }
    }

    assert_eq!(index.lexicon.len(), doc_freq.len());
    for entry in index.lexicon.iter() {
        let entry = entry.unwrap();
        assert_eq!(entry.doc_freq, doc_freq[entry.term.as_str()], "df {}", entry.term);
        assert_eq!(
            entry.collection_freq,
            collection_freq[entry.term.as_str()],
            "cf {}",
            entry.term
        );

        // Posting doc ids are ascending with no duplicates
        let mut cursor = index.open_cursor(&entry).unwrap();
        let mut last: Option<u32> = None;
        while let Some(posting) = cursor.next().unwrap() {
            if let Some(last) = last {
                assert!(posting.doc_id.0 > last);
            }
            last = Some(posting.doc_id.0);
        }
    }
}

#[test]
fn lexicon_iterates_in_strict_term_and_id_order() {
    let dir = tempdir().unwrap();
    build(
        dir.path(),
        |_| {},
        &[("d0", "zebra apple mango"), ("d1", "banana apple zebra kiwi")],
    );
    let index = Index::open(dir.path(), "data").unwrap();

    let mut last_term: Option<Vec<u8>> = None;
    let mut last_id: Option<u32> = None;
    for entry in index.lexicon.iter() {
        let entry = entry.unwrap();
        if let Some(last) = &last_term {
            assert!(entry.term.as_bytes() > last.as_slice());
        }
        if let Some(last) = last_id {
            assert!(entry.term_id > last);
        }
        last_term = Some(entry.term.into_bytes());
        last_id = Some(entry.term_id);
    }
}

#[test]
fn missing_structure_is_a_hard_failure() {
    let dir = tempdir().unwrap();
    build(dir.path(), |_| {}, &[("d0", "a")]);
    assert!(Index::exists(dir.path(), "data"));

    let layout = IndexLayout::new(dir.path(), "data");
    std::fs::remove_file(layout.doc_index_path()).unwrap();
    assert!(!Index::exists(dir.path(), "data"));
    assert!(Index::open(dir.path(), "data").is_err());
}

#[test]
fn recompression_preserves_postings_exactly() {
    let dir = tempdir().unwrap();
    build(
        dir.path(),
        |c| c.blocks_enabled = true,
        &[
            ("d0", "alpha beta alpha gamma"),
            ("d1", "beta beta delta"),
            ("d2", "alpha delta epsilon beta"),
        ],
    );

    let read_everything = |index: &Index| {
        let mut all = Vec::new();
        for entry in index.lexicon.iter() {
            let entry = entry.unwrap();
            let mut cursor = index.open_cursor(&entry).unwrap();
            let mut postings = Vec::new();
            while let Some(p) = cursor.next().unwrap() {
                postings.push(p);
            }
            all.push((entry.term.clone(), entry.doc_freq, entry.collection_freq, postings));
        }
        all
    };

    let before = {
        let index = Index::open(dir.path(), "data").unwrap();
        assert_eq!(
            index.metadata.compression,
            marten::compression::codec::CompressionConfig::from_name("vbyte").unwrap()
        );
        read_everything(&index)
    };

    recompress(dir.path(), "data", "gamma").unwrap();

    let index = Index::open(dir.path(), "data").unwrap();
    assert_eq!(
        index.metadata.compression,
        marten::compression::codec::CompressionConfig::from_name("gamma").unwrap()
    );
    assert_eq!(read_everything(&index), before);

    // No backup files left behind
    for name in std::fs::read_dir(dir.path()).unwrap() {
        let name = name.unwrap().file_name().to_string_lossy().into_owned();
        assert!(!name.ends_with(".bak"), "leftover backup {}", name);
    }
}

#[test]
fn recompress_requires_a_closed_index() {
    let dir = tempdir().unwrap();
    build(dir.path(), |_| {}, &[("d0", "a")]);

    let _reader = Index::open(dir.path(), "data").unwrap();
    assert!(recompress(dir.path(), "data", "gamma").is_err());
}

#[test]
fn unknown_compression_name_fails_before_touching_anything() {
    let dir = tempdir().unwrap();
    build(dir.path(), |_| {}, &[("d0", "a")]);
    assert!(recompress(dir.path(), "data", "brotli-ultra").is_err());
    assert!(Index::open(dir.path(), "data").is_ok());
}

#[test]
fn gamma_built_index_answers_queries() {
    let dir = tempdir().unwrap();
    build(
        dir.path(),
        |c| {
            c.compression =
                marten::compression::codec::CompressionConfig::from_name("gamma").unwrap();
        },
        &[("d0", "red green blue"), ("d1", "green yellow")],
    );
    let index = Index::open(dir.path(), "data").unwrap();

    let engine = QueryEngine::new(&index, "tfidf").unwrap();
    let results = engine.match_query(&MatchingQueryTerms::parse("green")).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.doc_ids.contains(&DocId(0)));
    assert!(results.doc_ids.contains(&DocId(1)));
}
