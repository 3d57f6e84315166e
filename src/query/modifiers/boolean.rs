use crate::core::error::Result;
use crate::index::handle::Index;
use crate::query::modifiers::ScoreModifier;
use crate::query::results::ResultSet;
use crate::query::terms::MatchingQueryTerms;

/// Boolean fallback: if at least one retrieved document contains every
/// non-negated query term, documents missing any of them are dropped.
/// Otherwise the result set is left untouched. Applying it twice equals
/// applying it once: after a drop pass every survivor carries the full
/// mask.
pub struct BooleanFallback;

impl ScoreModifier for BooleanFallback {
    fn name(&self) -> &str {
        "boolean"
    }

    fn modify(
        &self,
        _index: &Index,
        terms: &MatchingQueryTerms,
        results: &mut ResultSet,
    ) -> Result<bool> {
        let mask = terms.required_mask();
        if mask == 0 || results.is_empty() {
            return Ok(false);
        }

        let any_full = (0..results.len()).any(|i| {
            results.scores[i] != f64::NEG_INFINITY && results.occurrences[i] & mask == mask
        });
        if !any_full {
            return Ok(false);
        }

        let mut dropped = false;
        for i in 0..results.len() {
            if results.scores[i] != f64::NEG_INFINITY && results.occurrences[i] & mask != mask {
                results.drop_entry(i);
                dropped = true;
            }
        }
        if dropped {
            // Survivors keep their relative order, which was already
            // descending by score.
            results.compact();
        }
        Ok(dropped)
    }
}
