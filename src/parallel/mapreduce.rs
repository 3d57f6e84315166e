use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use log::{info, warn};

use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::stats::CollectionStatistics;
use crate::core::types::{DocId, Document};
use crate::index::doc_index::{DocumentEntry, DocumentIndexWriter};
use crate::index::layout::IndexLayout;
use crate::index::metadata::IndexMetadata;
use crate::indexer::merge::activate;
use crate::indexer::run::{write_run, RunFiles, RunReader, run_lexicon_path, run_postings_path};
use crate::lexicon::entry::{clip_term, TermEntry};
use crate::lexicon::writer::LexiconWriter;
use crate::postings::writer::PostingsWriter;
use crate::postings::Posting;

/// Default reducer cap: one per letter of the grouping keyspace's
/// alphabetic range.
pub const DEFAULT_MAX_REDUCERS: usize = 26;

/// One (term, partial posting list) pair emitted by a map task.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEmit {
    pub term: String,
    pub postings: Vec<Posting>,
}

/// Map task: index one shard of documents and emit term-sorted partial
/// posting lists. Doc ids are `doc_base` plus the shard-local offset, so
/// re-running a map task over the same shard produces identical output --
/// the external execution layer relies on that to retry failed tasks.
pub fn map_shard(documents: &[Document], doc_base: u32, config: &IndexConfig) -> Vec<MapEmit> {
    let mut accumulator: BTreeMap<String, Vec<Posting>> = BTreeMap::new();

    for (offset, doc) in documents.iter().enumerate() {
        let doc_id = DocId(doc_base + offset as u32);
        let mut term_positions: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for (pos, term) in doc.terms.iter().enumerate() {
            term_positions
                .entry(clip_term(term))
                .or_default()
                .push(pos as u32);
        }
        for (term, positions) in term_positions {
            let mut posting = Posting::new(doc_id, positions.len() as u32);
            if config.blocks_enabled {
                posting.positions = positions;
            }
            accumulator.entry(term.to_string()).or_default().push(posting);
        }
    }

    accumulator
        .into_iter()
        .map(|(term, postings)| MapEmit { term, postings })
        .collect()
}

/// Alphabetic range partitioning over the first byte of the term. Terms
/// in reducer r all precede terms in reducer r+1, so concatenating
/// reducer lexicons in index order stays globally term-sorted.
pub fn partition_for_term(term: &str, reducers: usize) -> usize {
    let first = term.as_bytes().first().copied().unwrap_or(0) as usize;
    (first * reducers) / 256
}

/// Reduce task for one partition: concatenate each term's partial lists
/// in shard order and write one compressed lexicon + postings pair.
/// Partials arrive from ascending disjoint doc ranges; any doc id going
/// backwards is a format violation. Returns the written run files, or
/// None when the partition received no terms.
pub fn reduce_partition(
    dir: &Path,
    prefix: &str,
    reducer: usize,
    groups: &BTreeMap<String, Vec<Vec<Posting>>>,
    config: &IndexConfig,
) -> Result<Option<RunFiles>> {
    if groups.is_empty() {
        return Ok(None);
    }

    let mut accumulator: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    for (term, partials) in groups {
        let mut merged: Vec<Posting> = Vec::new();
        for partial in partials {
            if let (Some(last), Some(first)) = (merged.last(), partial.first()) {
                if first.doc_id <= last.doc_id {
                    return Err(Error::corrupt(format!(
                        "partial posting lists for '{}' overlap at doc {}",
                        term, first.doc_id.0
                    )));
                }
            }
            merged.extend(partial.iter().cloned());
        }
        accumulator.insert(term.clone(), merged);
    }

    let files = write_run(
        dir,
        &format!("{}.reduce", prefix),
        reducer as u32,
        config,
        0,
        0,
        &accumulator,
    )?;
    Ok(Some(files))
}

/// Post-pass over the reducer outputs: merges the reducer-numbered
/// lexicons into one term-id space, re-encodes each reducer's postings as
/// `{prefix}.if.{r}` (file number = reducer index), and writes an empty
/// placeholder posting file for any reducer that produced nothing so the
/// file-number arithmetic downstream stays contiguous.
pub fn post_merge(
    path: &Path,
    prefix: &str,
    reducers: usize,
    config: &IndexConfig,
    doc_entries: Vec<DocumentEntry>,
) -> Result<()> {
    if reducers == 0 || reducers > u8::MAX as usize {
        return Err(Error::config(format!("reducer count {} out of range", reducers)));
    }

    let staging = path.join(format!(".mapreduce.{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&staging)?;
    let staged = IndexLayout::new(&staging, prefix);

    let result = (|| -> Result<IndexMetadata> {
        let mut lexicon = LexiconWriter::create(&staged.lexicon_path())?;
        let mut term_id = 0u32;
        let mut pointers = 0u64;
        let mut tokens = 0u64;

        for r in 0..reducers {
            let reduce_prefix = format!("{}.reduce", prefix);
            let files = RunFiles {
                lexicon: run_lexicon_path(path, &reduce_prefix, r as u32),
                postings: run_postings_path(path, &reduce_prefix, r as u32),
                doc_base: 0,
                doc_count: 0,
            };

            if !files.lexicon.is_file() {
                // Empty reducer: placeholder keeps file numbers contiguous
                warn!("reducer {} produced no output, writing placeholder", r);
                File::create(staged.postings_path(r as u8))?;
                continue;
            }

            let mut reader = RunReader::open(&files, config)?;
            let mut writer = PostingsWriter::create(
                &staged.postings_path(r as u8),
                config.compression,
                config.fields_enabled,
                config.blocks_enabled,
                config.skip_interval,
                r as u8,
            )?;

            while let Some(record) = reader.next_term()? {
                let postings = reader.read_postings(&record)?;
                let pointer = writer.write_list(&record.term, &postings)?;
                lexicon.add(&TermEntry {
                    term: record.term,
                    term_id,
                    doc_freq: record.doc_freq,
                    collection_freq: record.collection_freq,
                    pointer,
                })?;
                term_id += 1;
                pointers += postings.len() as u64;
                tokens += record.collection_freq;
            }
            writer.finish()?;
        }
        lexicon.finish()?;

        let mut doc_writer = DocumentIndexWriter::create(&staged.doc_index_path())?;
        let mut num_docs = 0u32;
        for entry in doc_entries {
            doc_writer.add(entry.docno, entry.length)?;
            num_docs += 1;
        }
        doc_writer.finish()?;

        let mut metadata = IndexMetadata::new(
            config.compression,
            config.fields_enabled,
            config.blocks_enabled,
            config.skip_interval,
        );
        metadata.posting_files = reducers as u8;
        metadata.statistics = CollectionStatistics {
            num_docs,
            num_tokens: tokens,
            num_unique_terms: term_id,
            num_pointers: pointers,
        };
        metadata.save(&staged.metadata_path())?;
        Ok(metadata)
    })();

    match result {
        Ok(metadata) => {
            let layout = IndexLayout::new(path, prefix);
            activate(&staging, &layout, &metadata)?;
            fs::remove_dir_all(&staging)?;

            // Reducer outputs are transient like runs; delete them
            for r in 0..reducers {
                let reduce_prefix = format!("{}.reduce", prefix);
                let _ = fs::remove_file(run_lexicon_path(path, &reduce_prefix, r as u32));
                let _ = fs::remove_file(run_postings_path(path, &reduce_prefix, r as u32));
            }
            info!("map-reduce post-merge complete: {} reducers", reducers);
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            Err(e)
        }
    }
}
