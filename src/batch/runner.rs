use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel;
use log::{info, warn};

use crate::core::config::QueryConfig;
use crate::core::error::Result;
use crate::index::handle::Index;
use crate::batch::output::ResultWriter;
use crate::batch::topics::Topic;
use crate::query::cache::{CacheKey, ResultCache};
use crate::query::engine::QueryEngine;
use crate::query::modifiers::build_chain;
use crate::query::terms::MatchingQueryTerms;
use crate::query::weighting::model_for;

/// Outcome of a batch run: how many queries produced output and how many
/// were skipped. A skipped query never aborts the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Runs a batch of queries against one opened index. Queries execute
/// request-parallel on a small thread pool; within a query the term
/// cursors are read sequentially. Configuration problems (bad model or
/// modifier key) fail fast before the first query runs.
pub struct BatchQueryRunner {
    pub config: QueryConfig,
}

impl BatchQueryRunner {
    pub fn new(config: QueryConfig) -> Self {
        BatchQueryRunner { config }
    }

    pub fn run(&self, index: &Index, topics: &[Topic], writer: &ResultWriter) -> Result<BatchSummary> {
        // Resolve everything configurable up front: an unknown key is a
        // configuration error, not a per-query failure.
        model_for(&self.config.model)?;
        let chain = build_chain(&self.config)?;

        let cache = if self.config.cache_entries > 0 {
            Some(ResultCache::new(self.config.cache_entries))
        } else {
            None
        };

        let processed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);

        let workers = num_cpus::get().min(topics.len()).max(1);
        let (sender, receiver) = channel::unbounded::<&Topic>();
        for topic in topics {
            sender.send(topic).expect("unbounded channel accepts all topics");
        }
        drop(sender);

        crossbeam::scope(|scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                let cache = cache.as_ref();
                let chain = &chain;
                let processed = &processed;
                let skipped = &skipped;
                scope.spawn(move |_| {
                    while let Ok(topic) = receiver.recv() {
                        match self.run_one(index, topic, writer, chain, cache) {
                            Ok(()) => {
                                processed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                // Isolated per query: a bad topic never
                                // aborts the batch
                                warn!("skipping query {}: {}", topic.id, e);
                                skipped.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        })
        .expect("query worker panicked");

        // All in-flight queries joined above; the sink can flush safely
        writer.flush()?;

        let summary = BatchSummary {
            processed: processed.into_inner(),
            skipped: skipped.into_inner(),
        };
        info!(
            "batch complete: {} processed, {} skipped",
            summary.processed, summary.skipped
        );
        Ok(summary)
    }

    fn run_one(
        &self,
        index: &Index,
        topic: &Topic,
        writer: &ResultWriter,
        chain: &[Box<dyn crate::query::modifiers::ScoreModifier>],
        cache: Option<&ResultCache>,
    ) -> Result<()> {
        let terms = MatchingQueryTerms::parse(&topic.text);

        let key = CacheKey {
            query: terms.canonical(),
            controls: self.config.signature(),
        };

        let results = match cache.and_then(|c| c.get(&key)) {
            Some(hit) => hit,
            None => {
                let engine = QueryEngine::new(index, &self.config.model)?;
                let mut results = engine.match_query(&terms)?;
                for modifier in chain {
                    modifier.modify(index, &terms, &mut results)?;
                }
                results.truncate(self.config.max_results);
                // Write-after-compute; failed queries never reach here,
                // so nothing negative is cached
                if let Some(cache) = cache {
                    cache.put(key, results.clone());
                }
                results
            }
        };

        writer.write_query_results(&topic.id, index, &results, self.config.max_results)?;
        Ok(())
    }
}
