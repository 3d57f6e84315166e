use crate::core::error::{Error, Result};
use crate::core::stats::CollectionStatistics;

/// Per-term statistics a weighting model sees, read from the lexicon row.
#[derive(Debug, Clone, Copy)]
pub struct TermStatistics {
    pub doc_freq: u32,
    pub collection_freq: u64,
}

/// Weighting model: a function of term frequency, document length and
/// collection statistics. Implementations are stateless and shared across
/// query threads.
pub trait WeightingModel: Send + Sync {
    fn score(
        &self,
        term_freq: u32,
        doc_length: u32,
        term: &TermStatistics,
        collection: &CollectionStatistics,
    ) -> f64;

    fn name(&self) -> &str;
}

/// Closed registry of weighting models. An unknown key is a configuration
/// error, reported before any query runs.
pub fn model_for(key: &str) -> Result<Box<dyn WeightingModel>> {
    match key {
        "bm25" => Ok(Box::new(Bm25::default())),
        "tfidf" => Ok(Box::new(TfIdf)),
        other => Err(Error::config(format!("unknown weighting model '{}'", other))),
    }
}

/// BM25 with the usual k1/b parameterisation.
pub struct Bm25 {
    pub k1: f64,  // Term frequency saturation
    pub b: f64,   // Length normalization strength
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl WeightingModel for Bm25 {
    fn score(
        &self,
        term_freq: u32,
        doc_length: u32,
        term: &TermStatistics,
        collection: &CollectionStatistics,
    ) -> f64 {
        let tf = term_freq as f64;
        let num_docs = collection.num_docs as f64;
        let df = term.doc_freq as f64;
        let avg_len = collection.avg_doc_length().max(1.0);

        let idf = (1.0 + (num_docs - df + 0.5) / (df + 0.5)).ln();
        let numerator = tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_length as f64 / avg_len));

        idf * numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Plain TF-IDF with log-scaled document frequency.
pub struct TfIdf;

impl WeightingModel for TfIdf {
    fn score(
        &self,
        term_freq: u32,
        doc_length: u32,
        term: &TermStatistics,
        collection: &CollectionStatistics,
    ) -> f64 {
        let tf = term_freq as f64 / (doc_length as f64).max(1.0);
        let idf = ((collection.num_docs as f64 + 1.0) / (term.doc_freq as f64 + 1.0)).ln();
        tf * idf
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}
