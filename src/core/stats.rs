use serde::{Serialize, Deserialize};

/// Collection-wide statistics, persisted in the index descriptor and
/// consumed by the weighting models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStatistics {
    pub num_docs: u32,
    pub num_tokens: u64,
    pub num_unique_terms: u32,
    pub num_pointers: u64,
}

impl CollectionStatistics {
    pub fn avg_doc_length(&self) -> f64 {
        if self.num_docs == 0 {
            0.0
        } else {
            self.num_tokens as f64 / self.num_docs as f64
        }
    }

    /// Combine statistics from two disjoint document partitions.
    pub fn merge(&self, other: &CollectionStatistics) -> CollectionStatistics {
        CollectionStatistics {
            num_docs: self.num_docs + other.num_docs,
            num_tokens: self.num_tokens + other.num_tokens,
            // Unique terms overlap between partitions; the merger recounts
            // this from the merged lexicon.
            num_unique_terms: self.num_unique_terms.max(other.num_unique_terms),
            num_pointers: self.num_pointers + other.num_pointers,
        }
    }
}
