use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use parking_lot::Mutex;

use crate::core::error::{Error, Result};
use crate::lexicon::entry::{ROW_SIZE, TermEntry};

enum Backing {
    /// Zero-copy reads over immutable bytes; no locking needed.
    Mapped(Mmap),
    /// Fallback file handle. Seek and read are one critical section; the
    /// lock is per handle, not global.
    Handle(Mutex<File>),
}

/// Disk-resident term dictionary: fixed-size rows sorted by term, binary
/// search point lookup plus full sequential iteration.
pub struct Lexicon {
    backing: Backing,
    pub rows: usize,
}

impl Lexicon {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len % ROW_SIZE != 0 {
            return Err(Error::corrupt(format!(
                "lexicon size {} is not a multiple of the row size", len
            )));
        }
        if len == 0 {
            // Zero-length files cannot be mapped; no row is ever read
            return Ok(Lexicon {
                backing: Backing::Handle(Mutex::new(file)),
                rows: 0,
            });
        }
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(Lexicon {
            backing: Backing::Mapped(mmap),
            rows: len / ROW_SIZE,
        })
    }

    /// Open without mapping; reads go through a locked file handle.
    pub fn open_unmapped(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len % ROW_SIZE != 0 {
            return Err(Error::corrupt(format!(
                "lexicon size {} is not a multiple of the row size", len
            )));
        }
        Ok(Lexicon {
            backing: Backing::Handle(Mutex::new(file)),
            rows: len / ROW_SIZE,
        })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    fn read_row(&self, index: usize) -> Result<TermEntry> {
        let offset = index * ROW_SIZE;
        match &self.backing {
            Backing::Mapped(mmap) => TermEntry::decode(&mmap[offset..offset + ROW_SIZE]),
            Backing::Handle(file) => {
                let mut row = [0u8; ROW_SIZE];
                {
                    let mut file = file.lock();
                    file.seek(SeekFrom::Start(offset as u64))?;
                    file.read_exact(&mut row)?;
                }
                TermEntry::decode(&row)
            }
        }
    }

    pub fn entry_at(&self, index: usize) -> Result<TermEntry> {
        if index >= self.rows {
            return Err(Error::new(
                crate::core::error::ErrorKind::InvalidArgument,
                format!("lexicon row {} out of range", index),
            ));
        }
        self.read_row(index)
    }

    /// Binary search over fixed-size rows. Terms compare byte-lexicographic,
    /// matching the order the merger wrote them in.
    pub fn lookup(&self, term: &str) -> Result<Option<TermEntry>> {
        let mut low = 0usize;
        let mut high = self.rows;

        while low < high {
            let mid = low + (high - low) / 2;
            let entry = self.read_row(mid)?;
            match entry.term.as_bytes().cmp(term.as_bytes()) {
                std::cmp::Ordering::Equal => return Ok(Some(entry)),
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
            }
        }

        Ok(None)
    }

    pub fn iter(&self) -> LexiconIter<'_> {
        LexiconIter { lexicon: self, next: 0 }
    }

    /// Rewrite term ids so they become the permutation consistent with the
    /// stored term order: term_id == row index. Verifies ordering while it
    /// scans. Returns the row count.
    pub fn optimise(path: &Path) -> Result<u32> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len() as usize;
        if len % ROW_SIZE != 0 {
            return Err(Error::corrupt("lexicon size is not a multiple of the row size"));
        }
        let rows = len / ROW_SIZE;

        let mut last_term: Option<String> = None;
        let mut row = [0u8; ROW_SIZE];
        for i in 0..rows {
            file.seek(SeekFrom::Start((i * ROW_SIZE) as u64))?;
            file.read_exact(&mut row)?;
            let entry = TermEntry::decode(&row)?;
            if let Some(last) = &last_term {
                if entry.term.as_bytes() <= last.as_bytes() {
                    return Err(Error::corrupt(format!(
                        "lexicon terms out of order at row {}: '{}'", i, entry.term
                    )));
                }
            }
            last_term = Some(entry.term);

            // term_id lives at a fixed offset inside the row
            file.seek(SeekFrom::Start((i * ROW_SIZE + 48) as u64))?;
            file.write_all(&(i as u32).to_le_bytes())?;
        }
        file.sync_all()?;
        Ok(rows as u32)
    }
}

pub struct LexiconIter<'a> {
    lexicon: &'a Lexicon,
    next: usize,
}

impl<'a> Iterator for LexiconIter<'a> {
    type Item = Result<TermEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.lexicon.rows {
            return None;
        }
        let entry = self.lexicon.read_row(self.next);
        self.next += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.lexicon.rows - self.next;
        (remaining, Some(remaining))
    }
}
