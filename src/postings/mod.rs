pub mod cursor;
pub mod writer;

pub use cursor::{PostingCursor, PostingsFile};
pub use writer::PostingsWriter;

use crate::core::types::DocId;

/// One decoded posting. Field frequencies and positions are present only
/// when the index was built with the corresponding flag; that is a
/// whole-index invariant, not a per-posting one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,
    pub field_freqs: Vec<u32>,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(doc_id: DocId, term_freq: u32) -> Self {
        Posting {
            doc_id,
            term_freq,
            field_freqs: Vec::new(),
            positions: Vec::new(),
        }
    }
}
