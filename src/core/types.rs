use serde::{Serialize, Deserialize};

/// Internal document identifier, dense and ascending within one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// One logical document handed to the indexer: an external identifier plus
/// the token stream produced upstream. Tag stripping and format parsing
/// happen before this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub docno: String,
    pub terms: Vec<String>,
    /// Field id per token, parallel to `terms`. Empty unless the upstream
    /// parser tracks fields; only consulted when the index is built with
    /// fields enabled.
    pub field_ids: Vec<u8>,
}

impl Document {
    pub fn new(docno: impl Into<String>, terms: Vec<String>) -> Self {
        Document {
            docno: docno.into(),
            terms,
            field_ids: Vec::new(),
        }
    }

    pub fn with_fields(docno: impl Into<String>, terms: Vec<String>, field_ids: Vec<u8>) -> Self {
        Document {
            docno: docno.into(),
            terms,
            field_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
