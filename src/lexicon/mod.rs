pub mod entry;
pub mod reader;
pub mod writer;

pub use entry::{PostingPointer, TermEntry};
pub use reader::Lexicon;
pub use writer::LexiconWriter;
