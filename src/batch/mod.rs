pub mod collection;
pub mod output;
pub mod runner;
pub mod topics;

pub use collection::TextCollection;
pub use output::ResultWriter;
pub use runner::{BatchQueryRunner, BatchSummary};
pub use topics::{Topic, TopicFormat};
