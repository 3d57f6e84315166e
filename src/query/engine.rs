use crate::core::error::{Error, Result};
use crate::index::handle::Index;
use crate::postings::cursor::PostingCursor;
use crate::postings::Posting;
use crate::query::results::ResultSet;
use crate::query::terms::MatchingQueryTerms;
use crate::query::weighting::{model_for, TermStatistics, WeightingModel};

/// Document-at-a-time matcher over one opened index. The engine itself is
/// read-only; independent queries may run on separate threads, each with
/// its own cursors over the shared immutable posting bytes.
pub struct QueryEngine<'a> {
    index: &'a Index,
    model: Box<dyn WeightingModel>,
}

struct TermCursor<'a> {
    query_index: usize,
    weight: f64,
    negated: bool,
    stats: TermStatistics,
    cursor: PostingCursor<'a>,
    current: Option<Posting>,
}

impl<'a> QueryEngine<'a> {
    pub fn new(index: &'a Index, model_key: &str) -> Result<Self> {
        Ok(QueryEngine {
            index,
            model: model_for(model_key)?,
        })
    }

    /// Match and score: one cursor per query term (repeated terms share
    /// statistics but keep independent cursors), target document is the
    /// minimum current doc id across open cursors, and every cursor at
    /// the target contributes its term's score. Produces one entry per
    /// document with at least one matching term and an exact occurrence
    /// bitmask. Returned entries are ranked.
    pub fn match_query(&self, terms: &MatchingQueryTerms) -> Result<ResultSet> {
        let mut cursors: Vec<TermCursor<'_>> = Vec::with_capacity(terms.len());
        for (i, qterm) in terms.terms.iter().enumerate() {
            let Some(entry) = self.index.lookup(&qterm.term)? else {
                continue;  // Absent terms simply never match
            };
            let mut cursor = self.index.open_cursor(&entry)?;
            let current = cursor.next()?;
            cursors.push(TermCursor {
                query_index: i,
                weight: qterm.weight,
                negated: qterm.negated,
                stats: TermStatistics {
                    doc_freq: entry.doc_freq,
                    collection_freq: entry.collection_freq,
                },
                cursor,
                current,
            });
        }

        let mut results = ResultSet::new();
        let collection = &self.index.metadata.statistics;

        loop {
            // Target: minimum current doc id across open cursors
            let Some(target) = cursors
                .iter()
                .filter_map(|c| c.current.as_ref().map(|p| p.doc_id))
                .min()
            else {
                break;
            };

            let doc_length = self
                .index
                .documents
                .get(target)
                .map(|entry| entry.length)
                .ok_or_else(|| {
                    Error::corrupt(format!("posting references unknown doc {}", target.0))
                })?;

            let mut score = 0.0f64;
            let mut occurrences = 0u16;
            for tc in cursors.iter_mut() {
                let at_target = tc.current.as_ref().is_some_and(|p| p.doc_id == target);
                if !at_target {
                    continue;
                }
                let posting = tc.current.as_ref().expect("cursor at target");
                occurrences |= MatchingQueryTerms::bit(tc.query_index);
                if !tc.negated {
                    score += tc.weight
                        * self.model.score(posting.term_freq, doc_length, &tc.stats, collection);
                }
                tc.current = tc.cursor.next()?;
            }

            results.push(target, score, occurrences);
        }

        for tc in cursors.iter_mut() {
            tc.cursor.close();
        }

        results.sort();
        Ok(results)
    }
}
