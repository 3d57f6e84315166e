use crate::core::error::{Error, Result};

/// Longest term stored in a lexicon row. Longer terms are truncated at a
/// UTF-8 boundary at ingest, before they reach any writer.
pub const MAX_TERM_BYTES: usize = 47;

/// Fixed row size. Binary search relies on constant-size rows for direct
/// offset arithmetic.
pub const ROW_SIZE: usize = 80;

/// Location of one term's posting list inside the posting files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingPointer {
    pub file_number: u8,
    pub byte_offset: u64,
    pub bit_offset: u8,
    pub entries: u32,
}

/// One lexicon row: term, statistics and the pointer into postings.
#[derive(Debug, Clone, PartialEq)]
pub struct TermEntry {
    pub term: String,
    pub term_id: u32,
    pub doc_freq: u32,
    pub collection_freq: u64,
    pub pointer: PostingPointer,
}

impl TermEntry {
    /// Serialize into a fixed 80-byte row.
    ///
    /// Layout: len u8 | term 47B zero-padded | term_id u32 | doc_freq u32 |
    /// collection_freq u64 | entries u32 | byte_offset u64 | file_number u8 |
    /// bit_offset u8 | 2B pad. All integers little-endian.
    pub fn encode(&self) -> Result<[u8; ROW_SIZE]> {
        let term_bytes = self.term.as_bytes();
        if term_bytes.len() > MAX_TERM_BYTES {
            return Err(Error::corrupt(format!(
                "term '{}' exceeds {} bytes", self.term, MAX_TERM_BYTES
            )));
        }

        let mut row = [0u8; ROW_SIZE];
        row[0] = term_bytes.len() as u8;
        row[1..1 + term_bytes.len()].copy_from_slice(term_bytes);
        row[48..52].copy_from_slice(&self.term_id.to_le_bytes());
        row[52..56].copy_from_slice(&self.doc_freq.to_le_bytes());
        row[56..64].copy_from_slice(&self.collection_freq.to_le_bytes());
        row[64..68].copy_from_slice(&self.pointer.entries.to_le_bytes());
        row[68..76].copy_from_slice(&self.pointer.byte_offset.to_le_bytes());
        row[76] = self.pointer.file_number;
        row[77] = self.pointer.bit_offset;
        Ok(row)
    }

    pub fn decode(row: &[u8]) -> Result<TermEntry> {
        if row.len() < ROW_SIZE {
            return Err(Error::corrupt("lexicon row truncated"));
        }
        let len = row[0] as usize;
        if len > MAX_TERM_BYTES {
            return Err(Error::corrupt("lexicon row has invalid term length"));
        }
        let term = std::str::from_utf8(&row[1..1 + len])
            .map_err(|_| Error::corrupt("lexicon row has invalid UTF-8 term"))?
            .to_string();

        Ok(TermEntry {
            term,
            term_id: u32::from_le_bytes(row[48..52].try_into().unwrap()),
            doc_freq: u32::from_le_bytes(row[52..56].try_into().unwrap()),
            collection_freq: u64::from_le_bytes(row[56..64].try_into().unwrap()),
            pointer: PostingPointer {
                entries: u32::from_le_bytes(row[64..68].try_into().unwrap()),
                byte_offset: u64::from_le_bytes(row[68..76].try_into().unwrap()),
                file_number: row[76],
                bit_offset: row[77],
            },
        })
    }
}

/// Truncate a term to the storable length at a UTF-8 boundary.
pub fn clip_term(term: &str) -> &str {
    if term.len() <= MAX_TERM_BYTES {
        return term;
    }
    let mut end = MAX_TERM_BYTES;
    while !term.is_char_boundary(end) {
        end -= 1;
    }
    &term[..end]
}
