use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::stats::CollectionStatistics;
use crate::core::types::{DocId, Document};
use crate::index::doc_index::DocumentIndexWriter;
use crate::index::layout::IndexLayout;
use crate::index::lock::FileLock;
use crate::index::metadata::IndexMetadata;
use crate::indexer::merge::{activate, merge_runs};
use crate::indexer::run::{write_run, RunFiles};
use crate::lexicon::entry::clip_term;
use crate::postings::Posting;

/// Indexing pass state. One pass cycles Accumulating -> Flushing until
/// the document stream ends, then a final flush completes the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexerState {
    Accumulating,
    Done,
}

/// Single-pass indexer: accumulates per-term postings in memory up to a
/// byte budget, spills each full batch as a term-sorted run, and k-way
/// merges the runs into the final structures on finish. All output is
/// staged and only renamed into place once the merge succeeds, so a
/// failed build leaves any previous index untouched.
pub struct SinglePassIndexer {
    config: IndexConfig,
    state: IndexerState,
    staging: PathBuf,
    accumulator: BTreeMap<String, Vec<Posting>>,
    estimated_bytes: usize,
    next_doc_id: u32,
    run_doc_base: u32,
    runs: Vec<RunFiles>,
    doc_writer: Option<DocumentIndexWriter>,
    stats: CollectionStatistics,
    docs_skipped: u64,
    _lock: FileLock,
}

impl SinglePassIndexer {
    pub fn create(config: &IndexConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        let layout = IndexLayout::new(&config.path, &config.prefix);
        let lock = FileLock::acquire(&layout.lock_path(), true)?;

        let staging = config.path.join(format!(".build.{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&staging)?;

        let staged = IndexLayout::new(&staging, &config.prefix);
        let doc_writer = DocumentIndexWriter::create(&staged.doc_index_path())?;

        Ok(SinglePassIndexer {
            config: config.clone(),
            state: IndexerState::Accumulating,
            staging,
            accumulator: BTreeMap::new(),
            estimated_bytes: 0,
            next_doc_id: 0,
            run_doc_base: 0,
            runs: Vec::new(),
            doc_writer: Some(doc_writer),
            stats: CollectionStatistics::default(),
            docs_skipped: 0,
            _lock: lock,
        })
    }

    /// Index one document, spilling a run first if the accumulator is over
    /// budget. Doc ids are assigned densely in arrival order.
    pub fn index_document(&mut self, doc: &Document) -> Result<()> {
        if self.state != IndexerState::Accumulating {
            return Err(Error::new(
                crate::core::error::ErrorKind::InvalidState,
                "indexer already finished".to_string(),
            ));
        }
        if self.estimated_bytes >= self.config.memory_budget && !self.accumulator.is_empty() {
            self.flush_run()?;
        }

        let doc_id = DocId(self.next_doc_id);

        // Group token positions by term for this document
        let mut term_positions: HashMap<&str, Vec<u32>> = HashMap::new();
        let mut term_fields: HashMap<&str, Vec<u32>> = HashMap::new();
        for (pos, term) in doc.terms.iter().enumerate() {
            let term = clip_term(term);
            term_positions.entry(term).or_default().push(pos as u32);
            if self.config.fields_enabled {
                let field = doc.field_ids.get(pos).copied().unwrap_or(0) as usize;
                let freqs = term_fields.entry(term).or_default();
                if freqs.len() <= field {
                    freqs.resize(field + 1, 0);
                }
                freqs[field] += 1;
            }
        }

        for (term, positions) in term_positions {
            let mut posting = Posting::new(doc_id, positions.len() as u32);
            if self.config.fields_enabled {
                posting.field_freqs = term_fields.remove(term).unwrap_or_default();
            }
            if self.config.blocks_enabled {
                posting.positions = positions;
            }

            self.estimated_bytes += term.len() + 16 + posting.positions.len() * 4;
            self.accumulator
                .entry(term.to_string())
                .or_default()
                .push(posting);
        }

        self.doc_writer
            .as_mut()
            .expect("doc writer present while accumulating")
            .add(doc.docno.clone(), doc.terms.len() as u32)?;

        self.stats.num_docs += 1;
        self.stats.num_tokens += doc.terms.len() as u64;
        self.next_doc_id += 1;
        Ok(())
    }

    /// Index a whole document stream. Unreadable documents are logged and
    /// skipped; the build continues.
    pub fn index_collection<I>(&mut self, documents: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        for document in documents {
            match document {
                Ok(doc) => self.index_document(&doc)?,
                Err(e) => {
                    warn!("skipping unreadable document: {}", e);
                    self.docs_skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn flush_run(&mut self) -> Result<()> {
        let run_number = self.runs.len() as u32;
        let doc_count = self.next_doc_id - self.run_doc_base;
        info!(
            "flushing run {} ({} docs, {} terms, ~{} bytes)",
            run_number,
            doc_count,
            self.accumulator.len(),
            self.estimated_bytes
        );

        let files = write_run(
            &self.staging,
            &self.config.prefix,
            run_number,
            &self.config,
            self.run_doc_base,
            doc_count,
            &self.accumulator,
        )?;
        self.runs.push(files);

        self.accumulator.clear();
        self.estimated_bytes = 0;
        self.run_doc_base = self.next_doc_id;
        Ok(())
    }

    /// Documents skipped so far because their source was unreadable.
    pub fn skipped(&self) -> u64 {
        self.docs_skipped
    }

    /// Final flush, merge and atomic activation. Returns the collection
    /// statistics of the finished index.
    pub fn finish(mut self) -> Result<CollectionStatistics> {
        if !self.accumulator.is_empty() || self.runs.is_empty() {
            self.flush_run()?;
        }
        self.state = IndexerState::Done;

        let doc_count = self
            .doc_writer
            .take()
            .expect("doc writer present at finish")
            .finish()?;
        debug_assert_eq!(doc_count, self.stats.num_docs);

        let staged = IndexLayout::new(&self.staging, &self.config.prefix);
        let runs = std::mem::take(&mut self.runs);
        let run_count = runs.len();
        let result = merge_runs(
            runs,
            &self.config,
            &staged.lexicon_path(),
            &staged.postings_path(0),
        );

        let (unique_terms, pointers) = match result {
            Ok(counts) => counts,
            Err(e) => {
                // A corrupt run aborts the whole build; staging is removed
                // and any previous index stays as it was.
                let _ = fs::remove_dir_all(&self.staging);
                return Err(e);
            }
        };

        self.stats.num_unique_terms = unique_terms;
        self.stats.num_pointers = pointers;

        let mut metadata = IndexMetadata::new(
            self.config.compression,
            self.config.fields_enabled,
            self.config.blocks_enabled,
            self.config.skip_interval,
        );
        metadata.statistics = self.stats.clone();
        metadata.save(&staged.metadata_path())?;

        let layout = IndexLayout::new(&self.config.path, &self.config.prefix);
        activate(&self.staging, &layout, &metadata)?;
        fs::remove_dir_all(&self.staging)?;

        info!(
            "built index {}/{}: {} docs, {} terms, {} runs",
            self.config.path.display(),
            self.config.prefix,
            self.stats.num_docs,
            self.stats.num_unique_terms,
            run_count
        );
        Ok(self.stats)
    }
}
