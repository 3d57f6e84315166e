pub mod merge;
pub mod run;
pub mod single_pass;

pub use merge::{merge_indices, recompress};
pub use single_pass::SinglePassIndexer;
