use std::fs;
use std::path::PathBuf;

use log::warn;

use crate::core::error::{Error, Result};
use crate::index::handle::Index;
use crate::query::modifiers::ScoreModifier;
use crate::query::results::ResultSet;
use crate::query::terms::MatchingQueryTerms;

/// Static prior blending: adds `weight * prior(doc)` to every existing
/// non-zero score, then re-sorts. Priors are query-independent document
/// scores stored as a sidecar file of little-endian f64s, one per
/// document in doc id order.
pub struct PriorModifier {
    pub weight: f64,
}

impl PriorModifier {
    fn prior_path(index: &Index) -> PathBuf {
        index
            .layout
            .path
            .join(format!("{}.prior", index.layout.prefix))
    }

    fn load_priors(index: &Index) -> Result<Option<Vec<f64>>> {
        let path = Self::prior_path(index);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        if bytes.len() != index.documents.len() * 8 {
            return Err(Error::corrupt(format!(
                "prior file holds {} bytes for {} documents",
                bytes.len(),
                index.documents.len()
            )));
        }
        Ok(Some(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ))
    }
}

impl ScoreModifier for PriorModifier {
    fn name(&self) -> &str {
        "prior"
    }

    fn modify(
        &self,
        index: &Index,
        _terms: &MatchingQueryTerms,
        results: &mut ResultSet,
    ) -> Result<bool> {
        let Some(priors) = Self::load_priors(index)? else {
            warn!("no prior file next to the index, skipping prior modifier");
            return Ok(false);
        };

        let mut changed = false;
        for i in 0..results.len() {
            let score = results.scores[i];
            if score == 0.0 || score == f64::NEG_INFINITY {
                continue;
            }
            let bonus = self.weight * priors[results.doc_ids[i].0 as usize];
            if bonus != 0.0 {
                results.scores[i] = score + bonus;
                changed = true;
            }
        }

        if changed {
            results.sort();
        }
        Ok(changed)
    }
}
