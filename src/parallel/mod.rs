pub mod mapreduce;
pub mod threaded;

pub use threaded::ThreadedIndexer;
