pub mod boolean;
pub mod dependence;
pub mod prior;

use crate::core::config::QueryConfig;
use crate::core::error::{Error, Result};
use crate::index::handle::Index;
use crate::query::results::ResultSet;
use crate::query::terms::MatchingQueryTerms;

pub use boolean::BooleanFallback;
pub use dependence::DependenceModifier;
pub use prior::PriorModifier;

/// A score-modification stage. Modifiers run in a configured order after
/// matching; each may re-read postings, may only weaken or redistribute
/// the scores of documents already present, and must leave the result set
/// re-sorted (descending) whenever it returns true.
pub trait ScoreModifier: Send + Sync {
    fn name(&self) -> &str;

    fn modify(
        &self,
        index: &Index,
        terms: &MatchingQueryTerms,
        results: &mut ResultSet,
    ) -> Result<bool>;
}

/// Closed registry mapping configuration keys to modifier constructors.
/// Unknown keys are configuration errors, caught before any query runs.
pub fn modifier_for(key: &str, config: &QueryConfig) -> Result<Box<dyn ScoreModifier>> {
    match key {
        "dependence" => Ok(Box::new(DependenceModifier::from_config(config, false))),
        "ordered_dependence" => Ok(Box::new(DependenceModifier::from_config(config, true))),
        "boolean" => Ok(Box::new(BooleanFallback)),
        "prior" => Ok(Box::new(PriorModifier { weight: config.prior_weight })),
        other => Err(Error::config(format!("unknown score modifier '{}'", other))),
    }
}

/// Resolve the whole configured chain up front so a bad key fails fast.
pub fn build_chain(config: &QueryConfig) -> Result<Vec<Box<dyn ScoreModifier>>> {
    config
        .modifiers
        .iter()
        .map(|key| modifier_for(key, config))
        .collect()
}
