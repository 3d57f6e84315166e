use std::collections::HashMap;

use log::warn;

use crate::core::config::{PairCombination, QueryConfig};
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::handle::Index;
use crate::postings::Posting;
use crate::query::modifiers::ScoreModifier;
use crate::query::results::ResultSet;
use crate::query::terms::MatchingQueryTerms;

/// Proximity (term dependence) modifier: re-opens postings for the
/// query's non-negated terms, walks them in lock-step by doc id, and for
/// each document containing all of them blends a proximity score into
/// the base score. The ordered variant only counts term pairs appearing
/// in query order; the full variant counts all pairs regardless of
/// direction. Requires an index built with position blocks.
pub struct DependenceModifier {
    pub ordered_only: bool,
    pub window: usize,
    pub unigram_weight: f64,
    pub ordered_weight: f64,
    pub unordered_weight: f64,
    pub combination: PairCombination,
}

impl DependenceModifier {
    pub fn from_config(config: &QueryConfig, ordered_only: bool) -> Self {
        DependenceModifier {
            ordered_only,
            window: config.proximity_window,
            unigram_weight: config.unigram_weight,
            ordered_weight: config.ordered_weight,
            unordered_weight: config.unordered_weight,
            combination: config.pair_combination,
        }
    }

    /// Count (pa, pb) pairs with pb after pa inside the window.
    fn ordered_matches(&self, a: &[u32], b: &[u32]) -> u32 {
        let mut count = 0;
        for &pa in a {
            for &pb in b {
                if pb > pa && (pb - pa) as usize <= self.window {
                    count += 1;
                }
            }
        }
        count
    }

    /// Count position pairs within the window in either direction.
    fn unordered_matches(&self, a: &[u32], b: &[u32]) -> u32 {
        let mut count = 0;
        for &pa in a {
            for &pb in b {
                let gap = pa.abs_diff(pb) as usize;
                if gap > 0 && gap <= self.window {
                    count += 1;
                }
            }
        }
        count
    }

    fn combine(&self, pair_scores: &[f64]) -> f64 {
        if pair_scores.is_empty() {
            return 0.0;
        }
        match self.combination {
            PairCombination::Average => {
                pair_scores.iter().sum::<f64>() / pair_scores.len() as f64
            }
            PairCombination::Product => pair_scores.iter().product(),
            PairCombination::Min => pair_scores.iter().cloned().fold(f64::INFINITY, f64::min),
            PairCombination::Max => pair_scores.iter().cloned().fold(0.0, f64::max),
        }
    }

    fn proximity_score(&self, positions: &[Vec<u32>]) -> f64 {
        let mut ordered = Vec::new();
        let mut unordered = Vec::new();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                ordered.push((1.0 + self.ordered_matches(&positions[i], &positions[j]) as f64).ln());
                if !self.ordered_only {
                    unordered
                        .push((1.0 + self.unordered_matches(&positions[i], &positions[j]) as f64).ln());
                }
            }
        }

        let mut score = self.ordered_weight * self.combine(&ordered);
        if !self.ordered_only {
            score += self.unordered_weight * self.combine(&unordered);
        }
        score
    }
}

impl ScoreModifier for DependenceModifier {
    fn name(&self) -> &str {
        if self.ordered_only { "ordered_dependence" } else { "dependence" }
    }

    fn modify(
        &self,
        index: &Index,
        terms: &MatchingQueryTerms,
        results: &mut ResultSet,
    ) -> Result<bool> {
        if !index.metadata.blocks_enabled {
            warn!("dependence modifier needs position blocks, skipping");
            return Ok(false);
        }

        // Phrase terms: non-negated and present in the lexicon
        let mut entries = Vec::new();
        for qterm in terms.terms.iter().filter(|t| !t.negated) {
            if let Some(entry) = index.lookup(&qterm.term)? {
                entries.push(entry);
            }
        }
        if entries.len() < 2 || results.is_empty() {
            return Ok(false);
        }

        let live: HashMap<DocId, usize> = results
            .doc_ids
            .iter()
            .enumerate()
            .filter(|&(i, _)| results.scores[i] != f64::NEG_INFINITY)
            .map(|(i, &doc)| (doc, i))
            .collect();

        let mut cursors = Vec::with_capacity(entries.len());
        let mut currents: Vec<Option<Posting>> = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut cursor = index.open_cursor(entry)?;
            currents.push(cursor.next()?);
            cursors.push(cursor);
        }

        // Lock-step conjunctive walk: advance lagging cursors with skips
        // until every cursor sits on the same document.
        let mut changed = false;
        'walk: loop {
            let mut target = match &currents[0] {
                Some(p) => p.doc_id,
                None => break 'walk,
            };

            let mut aligned = false;
            while !aligned {
                aligned = true;
                for (cursor, current) in cursors.iter_mut().zip(currents.iter_mut()) {
                    let at = match current {
                        Some(p) => p.doc_id,
                        None => break 'walk,
                    };
                    if at < target {
                        *current = cursor.next_skip(target)?;
                        match current {
                            Some(p) if p.doc_id == target => {}
                            Some(p) => {
                                target = p.doc_id;
                                aligned = false;
                            }
                            None => break 'walk,
                        }
                    } else if at > target {
                        target = at;
                        aligned = false;
                    }
                }
            }

            // Every phrase term occurs in `target`; only documents already
            // retrieved may have their score adjusted.
            if let Some(&slot) = live.get(&target) {
                let positions: Vec<Vec<u32>> = currents
                    .iter()
                    .map(|p| p.as_ref().expect("aligned cursor").positions.clone())
                    .collect();
                let proximity = self.proximity_score(&positions);
                let base = results.scores[slot];
                let blended = self.unigram_weight * base + proximity;
                if blended != base {
                    results.scores[slot] = blended;
                    changed = true;
                }
            }

            for (cursor, current) in cursors.iter_mut().zip(currents.iter_mut()) {
                *current = cursor.next()?;
            }
        }

        for cursor in cursors.iter_mut() {
            cursor.close();
        }

        if changed {
            results.sort();
        }
        Ok(changed)
    }
}
