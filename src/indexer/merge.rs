use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs;
use std::path::Path;

use log::info;

use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::stats::CollectionStatistics;
use crate::core::types::DocId;
use crate::index::doc_index::DocumentIndexWriter;
use crate::index::handle::Index;
use crate::index::layout::IndexLayout;
use crate::index::lock::FileLock;
use crate::index::metadata::IndexMetadata;
use crate::indexer::run::{RunFiles, RunReader, RunTermRecord};
use crate::lexicon::entry::TermEntry;
use crate::lexicon::reader::Lexicon;
use crate::lexicon::writer::LexiconWriter;
use crate::postings::cursor::PostingsFile;
use crate::postings::writer::PostingsWriter;
use crate::postings::Posting;

/// K-way merge of term-sorted runs into one lexicon + posting file pair.
///
/// Runs cover disjoint, ascending document ranges, so when several runs
/// hold the same term their lists concatenate in run order and stay
/// sorted by doc id; nothing is re-sorted. Dense term ids are assigned in
/// output order. Returns (unique terms, total pointers).
pub fn merge_runs(
    runs: Vec<RunFiles>,
    config: &IndexConfig,
    lexicon_path: &Path,
    postings_path: &Path,
) -> Result<(u32, u64)> {
    let mut readers = Vec::with_capacity(runs.len());
    for files in &runs {
        readers.push(RunReader::open(files, config)?);
    }

    let mut lexicon = LexiconWriter::create(lexicon_path)?;
    let mut postings = PostingsWriter::create(
        postings_path,
        config.compression,
        config.fields_enabled,
        config.blocks_enabled,
        config.skip_interval,
        0,
    )?;

    // Heap keyed by (term, run index): byte-lexicographic term order,
    // run order as the tie-break so concatenation preserves doc order.
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::new();
    let mut current: Vec<Option<RunTermRecord>> = Vec::with_capacity(readers.len());
    for (i, reader) in readers.iter_mut().enumerate() {
        let record = reader.next_term()?;
        if let Some(record) = &record {
            heap.push(Reverse((record.term.clone(), i)));
        }
        current.push(record);
    }

    let mut term_id = 0u32;
    let mut pointers = 0u64;

    while let Some(Reverse((term, first_run))) = heap.pop() {
        // Gather every run holding this term, in run order
        let mut holders = vec![first_run];
        while heap.peek().is_some_and(|Reverse((t, _))| *t == term) {
            let Reverse((_, run)) = heap.pop().expect("peeked entry");
            holders.push(run);
        }
        holders.sort_unstable();

        let mut merged: Vec<Posting> = Vec::new();
        let mut doc_freq = 0u32;
        let mut collection_freq = 0u64;
        for &run in &holders {
            let record = current[run].take().expect("heap entry without record");
            doc_freq += record.doc_freq;
            collection_freq += record.collection_freq;
            merged.extend(readers[run].read_postings(&record)?);

            // Advance the run
            let next = readers[run].next_term()?;
            if let Some(next_record) = &next {
                heap.push(Reverse((next_record.term.clone(), run)));
            }
            current[run] = next;
        }

        let pointer = postings.write_list(&term, &merged)?;
        lexicon.add(&TermEntry {
            term,
            term_id,
            doc_freq,
            collection_freq,
            pointer,
        })?;
        term_id += 1;
        pointers += merged.len() as u64;
    }

    lexicon.finish()?;
    postings.finish()?;
    Ok((term_id, pointers))
}

/// Move completed structures from a staging directory into place. The
/// descriptor is renamed last: its presence marks a complete index, so a
/// crash mid-activation never leaves a loadable half-index.
pub fn activate(staging: &Path, layout: &IndexLayout, metadata: &IndexMetadata) -> Result<()> {
    let staged = IndexLayout::new(staging, &layout.prefix);

    fs::rename(staged.lexicon_path(), layout.lexicon_path())?;
    for n in 0..metadata.posting_files {
        fs::rename(staged.postings_path(n), layout.postings_path(n))?;
    }
    fs::rename(staged.doc_index_path(), layout.doc_index_path())?;
    fs::rename(staged.metadata_path(), layout.metadata_path())?;
    Ok(())
}

/// Delete every structure of an index, plus its lock file. Used for
/// intermediate sub-indices in the reduction tree and for backups.
pub fn remove_index_files(path: &Path, prefix: &str) -> Result<()> {
    let layout = IndexLayout::new(path, prefix);
    let metadata = IndexMetadata::load(&layout.metadata_path())?;

    fs::remove_file(layout.metadata_path())?;
    fs::remove_file(layout.lexicon_path())?;
    for n in 0..metadata.posting_files {
        fs::remove_file(layout.postings_path(n))?;
    }
    fs::remove_file(layout.doc_index_path())?;
    let _ = fs::remove_file(layout.lock_path());
    Ok(())
}

/// Structure merge of two complete indices into a third: term-ordered
/// two-pointer walk over both lexicons, second index's doc ids shifted by
/// the first's document count. Inputs are read-only; output is staged and
/// atomically activated.
pub fn merge_indices(
    a_path: &Path,
    a_prefix: &str,
    b_path: &Path,
    b_prefix: &str,
    out_path: &Path,
    out_prefix: &str,
) -> Result<()> {
    let a = Index::open(a_path, a_prefix)?;
    let b = Index::open(b_path, b_prefix)?;

    if !a.metadata.merge_compatible(&b.metadata) {
        return Err(Error::config(
            "indices have incompatible compression or payload flags".to_string(),
        ));
    }

    let doc_shift = a.metadata.statistics.num_docs;
    let staging = out_path.join(format!(".merge.{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&staging)?;

    let result = (|| -> Result<IndexMetadata> {
        let staged = IndexLayout::new(&staging, out_prefix);
        let mut lexicon = LexiconWriter::create(&staged.lexicon_path())?;
        let mut postings = PostingsWriter::create(
            &staged.postings_path(0),
            a.metadata.compression,
            a.metadata.fields_enabled,
            a.metadata.blocks_enabled,
            a.metadata.skip_interval,
            0,
        )?;

        let read_all = |index: &Index, entry: &TermEntry, shift: u32| -> Result<Vec<Posting>> {
            let mut cursor = index.open_cursor(entry)?;
            let mut list = Vec::with_capacity(entry.pointer.entries as usize);
            while let Some(mut posting) = cursor.next()? {
                posting.doc_id = DocId(posting.doc_id.0 + shift);
                list.push(posting);
            }
            cursor.close();
            Ok(list)
        };

        let mut term_id = 0u32;
        let mut pointers = 0u64;
        let mut iter_a = a.lexicon.iter();
        let mut iter_b = b.lexicon.iter();
        let mut next_a = iter_a.next().transpose()?;
        let mut next_b = iter_b.next().transpose()?;

        while next_a.is_some() || next_b.is_some() {
            let take_a = match (&next_a, &next_b) {
                (Some(ea), Some(eb)) => ea.term.as_bytes() <= eb.term.as_bytes(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => unreachable!(),
            };

            let (term, merged, doc_freq, collection_freq) = if take_a {
                let ea = next_a.take().unwrap();
                next_a = iter_a.next().transpose()?;

                if next_b.as_ref().is_some_and(|eb| eb.term == ea.term) {
                    let eb = next_b.take().unwrap();
                    next_b = iter_b.next().transpose()?;
                    let mut list = read_all(&a, &ea, 0)?;
                    list.extend(read_all(&b, &eb, doc_shift)?);
                    (
                        ea.term,
                        list,
                        ea.doc_freq + eb.doc_freq,
                        ea.collection_freq + eb.collection_freq,
                    )
                } else {
                    let list = read_all(&a, &ea, 0)?;
                    (ea.term, list, ea.doc_freq, ea.collection_freq)
                }
            } else {
                let eb = next_b.take().unwrap();
                next_b = iter_b.next().transpose()?;
                let list = read_all(&b, &eb, doc_shift)?;
                (eb.term, list, eb.doc_freq, eb.collection_freq)
            };

            let pointer = postings.write_list(&term, &merged)?;
            pointers += merged.len() as u64;
            lexicon.add(&TermEntry { term, term_id, doc_freq, collection_freq, pointer })?;
            term_id += 1;
        }

        lexicon.finish()?;
        postings.finish()?;

        // Concatenated document index: a's rows keep their ids, b's rows
        // follow in order, matching the doc id shift.
        let mut doc_writer = DocumentIndexWriter::create(&staged.doc_index_path())?;
        for entry in &a.documents.entries {
            doc_writer.add(entry.docno.clone(), entry.length)?;
        }
        for entry in &b.documents.entries {
            doc_writer.add(entry.docno.clone(), entry.length)?;
        }
        doc_writer.finish()?;

        let mut metadata = IndexMetadata::new(
            a.metadata.compression,
            a.metadata.fields_enabled,
            a.metadata.blocks_enabled,
            a.metadata.skip_interval,
        );
        metadata.statistics = CollectionStatistics {
            num_docs: a.metadata.statistics.num_docs + b.metadata.statistics.num_docs,
            num_tokens: a.metadata.statistics.num_tokens + b.metadata.statistics.num_tokens,
            num_unique_terms: term_id,
            num_pointers: pointers,
        };
        metadata.save(&staged.metadata_path())?;
        Ok(metadata)
    })();

    // Release shared locks before activation
    a.close();
    b.close();

    match result {
        Ok(metadata) => {
            fs::create_dir_all(out_path)?;
            let layout = IndexLayout::new(out_path, out_prefix);
            activate(&staging, &layout, &metadata)?;
            fs::remove_dir_all(&staging)?;
            info!("merged {} and {} into {}", a_prefix, b_prefix, out_prefix);
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_dir_all(&staging);
            Err(e)
        }
    }
}

/// Rewrite an index's postings under a different compression
/// configuration. Destructive in place: old structures are renamed to
/// backups, replaced, and the backups deleted only after the new
/// structures are complete. The index must be closed; the exclusive lock
/// enforces that.
pub fn recompress(path: &Path, prefix: &str, name: &str) -> Result<()> {
    let layout = IndexLayout::new(path, prefix);
    let _lock = FileLock::acquire(&layout.lock_path(), true)?;

    let compression = crate::compression::codec::CompressionConfig::from_name(name)?;
    let metadata = IndexMetadata::load(&layout.metadata_path())?;
    if metadata.compression == compression {
        return Ok(());
    }

    let lexicon = Lexicon::open(&layout.lexicon_path())?;
    let mut posting_files = Vec::with_capacity(metadata.posting_files as usize);
    for n in 0..metadata.posting_files {
        posting_files.push(PostingsFile::open(&layout.postings_path(n))?);
    }

    let staging = path.join(format!(".recompress.{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&staging)?;
    let staged = IndexLayout::new(&staging, prefix);

    let result = (|| -> Result<IndexMetadata> {
        let mut new_lexicon = LexiconWriter::create(&staged.lexicon_path())?;
        let mut new_postings = PostingsWriter::create(
            &staged.postings_path(0),
            compression,
            metadata.fields_enabled,
            metadata.blocks_enabled,
            metadata.skip_interval,
            0,
        )?;

        for entry in lexicon.iter() {
            let entry = entry?;
            let file = posting_files
                .get(entry.pointer.file_number as usize)
                .ok_or_else(|| Error::corrupt("posting pointer references missing file"))?;
            let mut cursor = file.open_cursor(
                &entry.pointer,
                metadata.compression,
                metadata.fields_enabled,
                metadata.blocks_enabled,
                metadata.skip_interval,
            )?;
            let mut list = Vec::with_capacity(entry.pointer.entries as usize);
            while let Some(posting) = cursor.next()? {
                list.push(posting);
            }
            cursor.close();

            let pointer = new_postings.write_list(&entry.term, &list)?;
            new_lexicon.add(&TermEntry { pointer, ..entry })?;
        }

        new_lexicon.finish()?;
        new_postings.finish()?;

        let mut new_metadata = metadata.clone();
        new_metadata.compression = compression;
        new_metadata.posting_files = 1;
        new_metadata.save(&staged.metadata_path())?;
        Ok(new_metadata)
    })();

    if let Err(e) = result {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    // Old structures to backup, new into place, backups deleted last
    let backup = |p: &Path| -> std::path::PathBuf {
        let mut name = p.file_name().unwrap().to_string_lossy().into_owned();
        name.push_str(".bak");
        p.with_file_name(name)
    };

    let old_lexicon = layout.lexicon_path();
    let old_meta = layout.metadata_path();
    fs::rename(&old_lexicon, backup(&old_lexicon))?;
    let mut old_posting_backups = Vec::new();
    for n in 0..metadata.posting_files {
        let p = layout.postings_path(n);
        fs::rename(&p, backup(&p))?;
        old_posting_backups.push(backup(&p));
    }
    fs::rename(&old_meta, backup(&old_meta))?;

    fs::rename(staged.lexicon_path(), layout.lexicon_path())?;
    fs::rename(staged.postings_path(0), layout.postings_path(0))?;
    fs::rename(staged.metadata_path(), layout.metadata_path())?;
    fs::remove_dir_all(&staging)?;

    fs::remove_file(backup(&old_lexicon))?;
    for p in old_posting_backups {
        fs::remove_file(p)?;
    }
    fs::remove_file(backup(&old_meta))?;

    info!("recompressed {}/{} as '{}'", path.display(), prefix, name);
    Ok(())
}
