use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;

use marten::batch::collection::TextCollection;
use marten::core::config::IndexConfig;
use marten::core::types::{DocId, Document};
use marten::index::doc_index::DocumentEntry;
use marten::index::handle::Index;
use marten::index::layout::IndexLayout;
use marten::indexer::merge::{merge_indices, merge_runs};
use marten::indexer::run::write_run;
use marten::indexer::single_pass::SinglePassIndexer;
use marten::lexicon::reader::Lexicon;
use marten::parallel::mapreduce::{map_shard, partition_for_term, post_merge, reduce_partition};
use marten::parallel::threaded::ThreadedIndexer;
use marten::postings::cursor::PostingsFile;
use marten::postings::Posting;

fn doc(docno: &str, text: &str) -> Document {
    Document::new(docno, text.split_whitespace().map(String::from).collect())
}

#[test]
fn merging_two_runs_concatenates_shared_terms() {
    let dir = tempdir().unwrap();
    let config = IndexConfig::with_path(dir.path(), "data");

    // Two runs over disjoint ascending doc ranges, both holding "shared"
    let mut first: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    first.insert("only_first".into(), vec![Posting::new(DocId(0), 1)]);
    first.insert(
        "shared".into(),
        vec![Posting::new(DocId(0), 2), Posting::new(DocId(1), 1)],
    );
    let mut second: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    second.insert("only_second".into(), vec![Posting::new(DocId(3), 1)]);
    second.insert(
        "shared".into(),
        vec![Posting::new(DocId(2), 1), Posting::new(DocId(4), 5)],
    );

    let runs = vec![
        write_run(dir.path(), "data", 0, &config, 0, 2, &first).unwrap(),
        write_run(dir.path(), "data", 1, &config, 2, 3, &second).unwrap(),
    ];

    let lex_path = dir.path().join("merged.lex");
    let inv_path = dir.path().join("merged.if.0");
    let (terms, pointers) = merge_runs(runs, &config, &lex_path, &inv_path).unwrap();
    assert_eq!(terms, 3);
    assert_eq!(pointers, 6);

    let lexicon = Lexicon::open(&lex_path).unwrap();
    let shared = lexicon.lookup("shared").unwrap().unwrap();
    assert_eq!(shared.doc_freq, 4);
    assert_eq!(shared.collection_freq, 9);

    let postings_file = PostingsFile::open(&inv_path).unwrap();
    let mut cursor = postings_file
        .open_cursor(&shared.pointer, config.compression, false, false, config.skip_interval)
        .unwrap();
    let mut ids = Vec::new();
    while let Some(p) = cursor.next().unwrap() {
        ids.push(p.doc_id.0);
    }
    // Doc-id-ascending concatenation, nothing repeated
    assert_eq!(ids, vec![0, 1, 2, 4]);
}

#[test]
fn structure_merge_rebases_the_second_index() {
    let dir = tempdir().unwrap();

    let build_at = |prefix: &str, docs: &[(&str, &str)]| {
        let config = IndexConfig::with_path(dir.path(), prefix);
        let mut indexer = SinglePassIndexer::create(&config).unwrap();
        for (docno, text) in docs {
            indexer.index_document(&doc(docno, text)).unwrap();
        }
        indexer.finish().unwrap();
    };

    build_at("left", &[("l0", "apple mango"), ("l1", "apple")]);
    build_at("right", &[("r0", "mango pear"), ("r1", "pear pear")]);

    merge_indices(dir.path(), "left", dir.path(), "right", dir.path(), "data").unwrap();
    let index = Index::open(dir.path(), "data").unwrap();

    assert_eq!(index.metadata.statistics.num_docs, 4);
    assert_eq!(index.documents.get(DocId(2)).unwrap().docno, "r0");

    let mango = index.lookup("mango").unwrap().unwrap();
    assert_eq!(mango.doc_freq, 2);
    let mut cursor = index.open_cursor(&mango).unwrap();
    let ids: Vec<u32> = std::iter::from_fn(|| cursor.next().unwrap().map(|p| p.doc_id.0)).collect();
    assert_eq!(ids, vec![0, 2]);  // l0 stays 0, r0 rebased to 2

    let pear = index.lookup("pear").unwrap().unwrap();
    assert_eq!((pear.doc_freq, pear.collection_freq), (2, 3));
}

#[test]
fn threaded_build_matches_sequential_build() {
    let dir = tempdir().unwrap();
    let corpus = dir.path().join("corpus");
    std::fs::create_dir_all(&corpus).unwrap();

    // Four collection files, three lines each
    let mut files: Vec<PathBuf> = Vec::new();
    for f in 0..4 {
        let path = corpus.join(format!("part{}.txt", f));
        let mut file = std::fs::File::create(&path).unwrap();
        for l in 0..3 {
            writeln!(file, "alpha file{} line{} beta common", f, l).unwrap();
        }
        files.push(path);
    }

    let threaded_dir = dir.path().join("threaded");
    let mut config = IndexConfig::with_path(&threaded_dir, "data");
    config.workers = 4;
    ThreadedIndexer::new(config)
        .build(&files, |path| TextCollection::open(path))
        .unwrap();
    let threaded = Index::open(&threaded_dir, "data").unwrap();

    let sequential_dir = dir.path().join("sequential");
    let config = IndexConfig::with_path(&sequential_dir, "data");
    let mut indexer = SinglePassIndexer::create(&config).unwrap();
    for path in &files {
        indexer.index_collection(TextCollection::open(path).unwrap()).unwrap();
    }
    indexer.finish().unwrap();
    let sequential = Index::open(&sequential_dir, "data").unwrap();

    assert_eq!(
        threaded.metadata.statistics.num_docs,
        sequential.metadata.statistics.num_docs
    );
    assert_eq!(threaded.lexicon.len(), sequential.lexicon.len());

    // Same statistics and same postings for every term
    for (left, right) in threaded.lexicon.iter().zip(sequential.lexicon.iter()) {
        let left = left.unwrap();
        let right = right.unwrap();
        assert_eq!(left.term, right.term);
        assert_eq!(left.doc_freq, right.doc_freq);
        assert_eq!(left.collection_freq, right.collection_freq);

        let mut lc = threaded.open_cursor(&left).unwrap();
        let mut rc = sequential.open_cursor(&right).unwrap();
        loop {
            let lp = lc.next().unwrap();
            let rp = rc.next().unwrap();
            assert_eq!(lp, rp, "postings diverge for {}", left.term);
            if lp.is_none() {
                break;
            }
        }
    }

    // Intermediate sub-indices were cleaned up
    for entry in std::fs::read_dir(&threaded_dir).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        assert!(
            name.starts_with("data."),
            "leftover intermediate file {}",
            name
        );
    }
}

#[test]
fn mapreduce_build_with_empty_reducer_placeholder() {
    let dir = tempdir().unwrap();
    let config = IndexConfig::with_path(dir.path(), "data");
    let reducers = 3;

    let shards = vec![
        vec![doc("s0d0", "lion tiger"), doc("s0d1", "lion")],
        vec![doc("s1d0", "tiger wolf")],
    ];

    // Map phase: doc bases assigned by cumulative shard sizes
    let mut doc_base = 0u32;
    let mut grouped: Vec<BTreeMap<String, Vec<Vec<Posting>>>> =
        (0..reducers).map(|_| BTreeMap::new()).collect();
    let mut doc_entries = Vec::new();
    for shard in &shards {
        for emit in map_shard(shard, doc_base, &config) {
            let partition = partition_for_term(&emit.term, reducers);
            grouped[partition]
                .entry(emit.term)
                .or_default()
                .push(emit.postings);
        }
        for d in shard {
            doc_entries.push(DocumentEntry {
                docno: d.docno.clone(),
                length: d.terms.len() as u32,
            });
        }
        doc_base += shard.len() as u32;
    }

    // Reduce phase: lowercase terms all hash to the middle partition, so
    // reducers 0 and 2 produce nothing
    for (r, groups) in grouped.iter().enumerate() {
        reduce_partition(dir.path(), "data", r, groups, &config).unwrap();
    }

    post_merge(dir.path(), "data", reducers, &config, doc_entries).unwrap();

    let layout = IndexLayout::new(dir.path(), "data");
    // Placeholders keep file numbers contiguous
    assert!(layout.postings_path(0).is_file());
    assert_eq!(std::fs::metadata(layout.postings_path(0)).unwrap().len(), 0);
    assert!(layout.postings_path(1).is_file());
    assert!(layout.postings_path(2).is_file());

    let index = Index::open(dir.path(), "data").unwrap();
    assert_eq!(index.metadata.posting_files, 3);
    assert_eq!(index.metadata.statistics.num_docs, 3);

    let lion = index.lookup("lion").unwrap().unwrap();
    assert_eq!(lion.doc_freq, 2);
    let tiger = index.lookup("tiger").unwrap().unwrap();
    let mut cursor = index.open_cursor(&tiger).unwrap();
    let ids: Vec<u32> = std::iter::from_fn(|| cursor.next().unwrap().map(|p| p.doc_id.0)).collect();
    assert_eq!(ids, vec![0, 2]);  // Shard 2's doc rebased by map doc_base
}

#[test]
fn map_tasks_are_idempotent() {
    let config = IndexConfig::with_path("/tmp/unused", "data");
    let shard = vec![doc("d0", "x y x"), doc("d1", "y z")];
    assert_eq!(map_shard(&shard, 100, &config), map_shard(&shard, 100, &config));
}
