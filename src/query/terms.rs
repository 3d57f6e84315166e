use log::warn;

use crate::lexicon::entry::clip_term;

/// The occurrence bitmask is a u16, so a query contributes at most 16
/// scoring terms.
pub const MAX_QUERY_TERMS: usize = 16;

/// One parsed query term. `weight` scales the term's score contribution,
/// `tag` carries an optional group label (`tag:term` syntax), `negated`
/// terms score zero and are excluded from the boolean-fallback mask.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerm {
    pub term: String,
    pub weight: f64,
    pub tag: Option<String>,
    pub negated: bool,
}

/// The ordered term list a query matches with. Immutable once matching
/// begins for a query instance.
#[derive(Debug, Clone)]
pub struct MatchingQueryTerms {
    pub terms: Vec<QueryTerm>,
}

impl MatchingQueryTerms {
    /// Parse free query text: whitespace-separated terms, `-term` negates,
    /// `term^2.5` weights, `tag:term` labels. Terms are lowercased and
    /// clipped to the lexicon's storable length.
    pub fn parse(text: &str) -> Self {
        let mut terms = Vec::new();

        for raw in text.split_whitespace() {
            let mut token = raw;

            let negated = token.starts_with('-');
            if negated {
                token = &token[1..];
            }

            let tag = match token.split_once(':') {
                Some((tag, rest)) if !tag.is_empty() && !rest.is_empty() => {
                    token = rest;
                    Some(tag.to_string())
                }
                _ => None,
            };

            let weight = match token.rsplit_once('^') {
                Some((rest, w)) => match w.parse::<f64>() {
                    Ok(weight) if weight > 0.0 => {
                        token = rest;
                        weight
                    }
                    _ => 1.0,
                },
                None => 1.0,
            };

            if token.is_empty() {
                continue;
            }

            if terms.len() == MAX_QUERY_TERMS {
                warn!("query has more than {} terms, ignoring the rest", MAX_QUERY_TERMS);
                break;
            }

            terms.push(QueryTerm {
                term: clip_term(&token.to_lowercase()).to_string(),
                weight,
                tag,
                negated,
            });
        }

        MatchingQueryTerms { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Occurrence-mask bit for query term `i`.
    pub fn bit(i: usize) -> u16 {
        1u16 << i
    }

    /// Mask of every non-negated term, as required by boolean fallback.
    pub fn required_mask(&self) -> u16 {
        let mut mask = 0u16;
        for (i, term) in self.terms.iter().enumerate() {
            if !term.negated {
                mask |= Self::bit(i);
            }
        }
        mask
    }

    /// Canonical form used as the cache key: parsing is normalising, so
    /// two spellings of the same query share one entry.
    pub fn canonical(&self) -> String {
        let mut parts = Vec::with_capacity(self.terms.len());
        for t in &self.terms {
            let mut s = String::new();
            if t.negated {
                s.push('-');
            }
            if let Some(tag) = &t.tag {
                s.push_str(tag);
                s.push(':');
            }
            s.push_str(&t.term);
            if t.weight != 1.0 {
                s.push_str(&format!("^{}", t.weight));
            }
            parts.push(s);
        }
        parts.join(" ")
    }
}
