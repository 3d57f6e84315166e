pub mod cache;
pub mod engine;
pub mod modifiers;
pub mod results;
pub mod terms;
pub mod weighting;

pub use cache::ResultCache;
pub use engine::QueryEngine;
pub use results::ResultSet;
pub use terms::MatchingQueryTerms;
