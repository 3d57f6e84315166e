use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::lexicon::entry::TermEntry;

/// Append-only lexicon writer. Rows must arrive in strictly increasing
/// byte-lexicographic term order; anything else is a fatal build error.
pub struct LexiconWriter {
    pub file: BufWriter<File>,
    pub rows_written: u32,
    last_term: Option<String>,
}

impl LexiconWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(LexiconWriter {
            file: BufWriter::new(file),
            rows_written: 0,
            last_term: None,
        })
    }

    pub fn add(&mut self, entry: &TermEntry) -> Result<()> {
        if let Some(last) = &self.last_term {
            if entry.term.as_bytes() <= last.as_bytes() {
                return Err(Error::corrupt(format!(
                    "lexicon terms out of order: '{}' after '{}'", entry.term, last
                )));
            }
        }

        let row = entry.encode()?;
        self.file.write_all(&row)?;
        self.last_term = Some(entry.term.clone());
        self.rows_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u32> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(self.rows_written)
    }
}
