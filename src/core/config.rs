use std::path::PathBuf;

use crate::compression::codec::CompressionConfig;

/// Build-time configuration for one index generation. Constructed once and
/// passed by reference; nothing reads configuration from global state.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub prefix: String,

    /// Codec selection for the four posting streams, fixed per generation.
    pub compression: CompressionConfig,

    /// Whole-index flags: payload layout is decided at build time, never
    /// per posting.
    pub fields_enabled: bool,
    pub blocks_enabled: bool,

    /// Accumulator byte budget before a run is spilled to disk.
    pub memory_budget: usize,

    /// Worker count for threaded builds. 0 means one per logical CPU.
    pub workers: usize,

    /// Posting lists at least this long get an on-disk skip table.
    pub skip_interval: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            path: PathBuf::from("./index"),
            prefix: "data".to_string(),
            compression: CompressionConfig::default(),
            fields_enabled: false,
            blocks_enabled: false,
            memory_budget: 64 * 1024 * 1024,  // 64MB accumulator
            workers: 0,
            skip_interval: 128,
        }
    }
}

impl IndexConfig {
    pub fn with_path(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        IndexConfig {
            path: path.into(),
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

/// Query-time configuration: weighting model, modifier chain and output
/// controls. Part of the cache key, so it must stay cheap to canonicalise.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Weighting model key, resolved through the closed registry.
    pub model: String,

    /// Ordered score-modifier keys, applied after matching.
    pub modifiers: Vec<String>,

    /// Per-query result truncation. 0 means unlimited.
    pub max_results: usize,

    /// Tag written in the last column of each output line.
    pub run_tag: String,

    /// Result cache capacity in entries. 0 disables the cache.
    pub cache_entries: usize,

    /// Dependence-model controls.
    pub proximity_window: usize,
    pub unigram_weight: f64,
    pub ordered_weight: f64,
    pub unordered_weight: f64,
    pub pair_combination: PairCombination,
    pub prior_weight: f64,
}

/// How pairwise proximity contributions are folded into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairCombination {
    Average,
    Product,
    Min,
    Max,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            model: "bm25".to_string(),
            modifiers: Vec::new(),
            max_results: 1000,
            run_tag: "marten".to_string(),
            cache_entries: 0,
            proximity_window: 8,
            unigram_weight: 1.0,
            ordered_weight: 0.1,
            unordered_weight: 0.1,
            pair_combination: PairCombination::Average,
            prior_weight: 1.0,
        }
    }
}

impl QueryConfig {
    /// Canonical signature used as the cache key: every control that can
    /// change a result set must appear here.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{:?}|{}",
            self.model,
            self.modifiers.join(","),
            self.max_results,
            self.proximity_window,
            self.unigram_weight,
            self.ordered_weight,
            self.unordered_weight,
            self.pair_combination,
            self.prior_weight,
        )
    }
}
