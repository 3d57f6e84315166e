use crate::core::types::DocId;

/// Ranked result set as parallel arrays: one entry per matched document,
/// with a bitmask recording exactly which query terms matched it. Score
/// modifiers mutate entries in place; dropped documents get a score of
/// negative infinity and are removed by `compact`.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub doc_ids: Vec<DocId>,
    pub scores: Vec<f64>,
    pub occurrences: Vec<u16>,
    /// Number of live entries. Equal to the array length after compact.
    pub result_size: usize,
    /// Whether `result_size` is exact or an estimate.
    pub exact: bool,
}

impl ResultSet {
    pub fn new() -> Self {
        ResultSet {
            doc_ids: Vec::new(),
            scores: Vec::new(),
            occurrences: Vec::new(),
            result_size: 0,
            exact: true,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ResultSet {
            doc_ids: Vec::with_capacity(capacity),
            scores: Vec::with_capacity(capacity),
            occurrences: Vec::with_capacity(capacity),
            result_size: 0,
            exact: true,
        }
    }

    pub fn push(&mut self, doc_id: DocId, score: f64, occurrences: u16) {
        self.doc_ids.push(doc_id);
        self.scores.push(score);
        self.occurrences.push(occurrences);
        self.result_size += 1;
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Stable descending sort by score with ascending doc id as the
    /// tie-break. Entries with equal score and equal doc id keep their
    /// relative order, so repeated sorts of the same input are
    /// bit-reproducible even under top-K truncation.
    pub fn sort(&mut self) {
        let mut entries: Vec<(DocId, f64, u16)> = self
            .doc_ids
            .iter()
            .zip(&self.scores)
            .zip(&self.occurrences)
            .map(|((&d, &s), &o)| (d, s, o))
            .collect();

        // Vec::sort_by is stable, which the top-K truncation downstream
        // makes observable
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        for (i, (doc_id, score, occurrences)) in entries.into_iter().enumerate() {
            self.doc_ids[i] = doc_id;
            self.scores[i] = score;
            self.occurrences[i] = occurrences;
        }
    }

    /// Mark one entry dropped: score to negative infinity, live count
    /// decremented.
    pub fn drop_entry(&mut self, i: usize) {
        if self.scores[i] != f64::NEG_INFINITY {
            self.scores[i] = f64::NEG_INFINITY;
            self.result_size -= 1;
        }
    }

    /// Shrink-and-compact: remove every dropped entry, preserving the
    /// order of the survivors.
    pub fn compact(&mut self) {
        if self.result_size == self.len() {
            return;
        }
        let mut doc_ids = Vec::with_capacity(self.result_size);
        let mut scores = Vec::with_capacity(self.result_size);
        let mut occurrences = Vec::with_capacity(self.result_size);
        for i in 0..self.len() {
            if self.scores[i] != f64::NEG_INFINITY {
                doc_ids.push(self.doc_ids[i]);
                scores.push(self.scores[i]);
                occurrences.push(self.occurrences[i]);
            }
        }
        self.doc_ids = doc_ids;
        self.scores = scores;
        self.occurrences = occurrences;
        debug_assert_eq!(self.result_size, self.doc_ids.len());
    }

    /// Truncate to the top K entries. 0 means unlimited.
    pub fn truncate(&mut self, k: usize) {
        if k == 0 || self.len() <= k {
            return;
        }
        self.doc_ids.truncate(k);
        self.scores.truncate(k);
        self.occurrences.truncate(k);
        self.result_size = self.result_size.min(k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_is_stable_and_tie_broken() {
        let mut results = ResultSet::new();
        results.push(DocId(5), 1.0, 1);
        results.push(DocId(2), 3.0, 1);
        results.push(DocId(9), 3.0, 1);
        results.push(DocId(1), 1.0, 1);

        results.sort();
        let ids: Vec<u32> = results.doc_ids.iter().map(|d| d.0).collect();
        // Equal scores order by ascending doc id
        assert_eq!(ids, vec![2, 9, 1, 5]);

        // A second sort of the same input changes nothing
        let before = results.clone();
        results.sort();
        assert_eq!(results.doc_ids, before.doc_ids);
        assert_eq!(results.scores, before.scores);
    }

    #[test]
    fn drop_and_compact() {
        let mut results = ResultSet::new();
        results.push(DocId(0), 2.0, 1);
        results.push(DocId(1), 1.0, 1);
        results.push(DocId(2), 3.0, 1);

        results.drop_entry(1);
        results.drop_entry(1);  // Dropping twice only counts once
        assert_eq!(results.result_size, 2);

        results.compact();
        assert_eq!(results.len(), 2);
        let ids: Vec<u32> = results.doc_ids.iter().map(|d| d.0).collect();
        assert_eq!(ids, vec![0, 2]);
    }
}
