use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rayon::prelude::*;

use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::core::types::Document;
use crate::index::layout::IndexLayout;
use crate::index::metadata::IndexMetadata;
use crate::indexer::merge::{merge_indices, remove_index_files};
use crate::indexer::single_pass::SinglePassIndexer;

/// Threaded build: the collection file list is statically partitioned
/// into one disjoint list per worker, each worker runs a full single-pass
/// build into a private prefix, and a reduction tree structure-merges the
/// sub-indices pairwise until one remains. Map-then-tree-reduce avoids
/// any shared mutable term dictionary across workers.
pub struct ThreadedIndexer {
    pub config: IndexConfig,
}

impl ThreadedIndexer {
    pub fn new(config: IndexConfig) -> Self {
        // Size the rayon pool to the configured worker count; build_global
        // fails harmlessly if a pool already exists
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .build_global()
            .ok();

        ThreadedIndexer { config }
    }

    /// Split the file list into N contiguous partitions, dropping empty
    /// tails when there are fewer files than workers.
    fn partition(files: &[PathBuf], workers: usize) -> Vec<Vec<PathBuf>> {
        let chunk = files.len().div_ceil(workers.max(1));
        files
            .chunks(chunk.max(1))
            .map(|c| c.to_vec())
            .collect()
    }

    /// Build the index. `open` turns one collection file into a document
    /// stream; it runs on worker threads and must be Sync.
    pub fn build<F, I>(&self, files: &[PathBuf], open: F) -> Result<()>
    where
        F: Fn(&Path) -> Result<I> + Sync,
        I: Iterator<Item = Result<Document>>,
    {
        if files.is_empty() {
            return Err(Error::config("empty collection file list".to_string()));
        }

        let partitions = Self::partition(files, self.config.worker_count());
        info!(
            "threaded build: {} files across {} partitions",
            files.len(),
            partitions.len()
        );

        // Map phase: one complete private sub-index per partition. Every
        // worker owns its accumulator and run files exclusively.
        let prefixes: Vec<String> = partitions
            .par_iter()
            .enumerate()
            .map(|(i, partition)| -> Result<String> {
                let prefix = format!("{}_p{}", self.config.prefix, i);
                let mut config = self.config.clone();
                config.prefix = prefix.clone();

                let mut indexer = SinglePassIndexer::create(&config)?;
                for file in partition {
                    indexer.index_collection(open(file)?)?;
                }
                indexer.finish()?;
                Ok(prefix)
            })
            .collect::<Result<Vec<String>>>()?;

        // Reduce phase: pair and merge, halving the count each round.
        // Merges at the same level are independent and run in parallel.
        let mut level = 0usize;
        let mut current = prefixes;
        while current.len() > 1 {
            let pairs: Vec<Vec<String>> = current.chunks(2).map(|c| c.to_vec()).collect();
            current = pairs
                .par_iter()
                .enumerate()
                .map(|(i, pair)| -> Result<String> {
                    if pair.len() == 1 {
                        // Odd index carries straight up a level
                        return Ok(pair[0].clone());
                    }
                    let merged = format!("{}_m{}_{}", self.config.prefix, level, i);
                    merge_indices(
                        &self.config.path,
                        &pair[0],
                        &self.config.path,
                        &pair[1],
                        &self.config.path,
                        &merged,
                    )?;
                    remove_index_files(&self.config.path, &pair[0])?;
                    remove_index_files(&self.config.path, &pair[1])?;
                    Ok(merged)
                })
                .collect::<Result<Vec<String>>>()?;
            level += 1;
        }

        // Rename the surviving sub-index to the canonical prefix
        let last = current.remove(0);
        rename_index(&self.config.path, &last, &self.config.prefix)?;
        info!(
            "threaded build complete: {}/{}",
            self.config.path.display(),
            self.config.prefix
        );
        Ok(())
    }
}

/// Rename every structure of an index to a new prefix within the same
/// directory. The descriptor moves last.
pub fn rename_index(path: &Path, from: &str, to: &str) -> Result<()> {
    if from == to {
        return Ok(());
    }
    let src = IndexLayout::new(path, from);
    let dst = IndexLayout::new(path, to);
    let metadata = IndexMetadata::load(&src.metadata_path())?;

    fs::rename(src.lexicon_path(), dst.lexicon_path())?;
    for n in 0..metadata.posting_files {
        fs::rename(src.postings_path(n), dst.postings_path(n))?;
    }
    fs::rename(src.doc_index_path(), dst.doc_index_path())?;
    fs::rename(src.metadata_path(), dst.metadata_path())?;
    let _ = fs::remove_file(src.lock_path());
    Ok(())
}
