use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::compression::codec::CompressionConfig;
use crate::compression::gamma::BitWriter;
use crate::core::error::{Error, Result};
use crate::lexicon::entry::PostingPointer;
use crate::postings::Posting;

const FLUSH_THRESHOLD: usize = 1024 * 1024;  // 1MB buffer

/// Append-only, one-pass posting writer. Terms must arrive in strictly
/// increasing byte-lexicographic order and doc ids strictly ascending
/// within a term; violating either is a fatal build error.
///
/// Lists are not byte-aligned: the returned pointer carries both byte and
/// bit offsets. Lists with at least `skip_interval` postings get a skip
/// table ahead of the payload (skip_interval 0 disables skip tables, used
/// for run files that are only ever read sequentially).
pub struct PostingsWriter {
    file: File,
    bits: BitWriter,
    flushed_bytes: u64,
    config: CompressionConfig,
    fields_enabled: bool,
    blocks_enabled: bool,
    skip_interval: usize,
    file_number: u8,
    last_term: Option<String>,
}

impl PostingsWriter {
    pub fn create(
        path: &Path,
        config: CompressionConfig,
        fields_enabled: bool,
        blocks_enabled: bool,
        skip_interval: usize,
        file_number: u8,
    ) -> Result<Self> {
        Ok(PostingsWriter {
            file: File::create(path)?,
            bits: BitWriter::new(),
            flushed_bytes: 0,
            config,
            fields_enabled,
            blocks_enabled,
            skip_interval,
            file_number,
            last_term: None,
        })
    }

    /// Absolute (byte, bit) position the next list will start at.
    fn position(&self) -> (u64, u8) {
        let (byte, bit) = self.bits.position();
        (self.flushed_bytes + byte, bit)
    }

    /// Write one term's complete posting list; returns its pointer.
    pub fn write_list(&mut self, term: &str, postings: &[Posting]) -> Result<PostingPointer> {
        if let Some(last) = &self.last_term {
            if term.as_bytes() <= last.as_bytes() {
                return Err(Error::corrupt(format!(
                    "posting lists out of term order: '{}' after '{}'", term, last
                )));
            }
        }
        if postings.is_empty() {
            return Err(Error::corrupt(format!("empty posting list for term '{}'", term)));
        }

        let (byte_offset, bit_offset) = self.position();

        // Encode the payload separately so skip entries can record bit
        // offsets relative to the payload start.
        let mut payload = BitWriter::new();
        let mut skips: Vec<(u32, u64)> = Vec::new();
        let mut prev_id: Option<u32> = None;

        for (i, posting) in postings.iter().enumerate() {
            match prev_id {
                Some(prev) if posting.doc_id.0 <= prev => {
                    return Err(Error::corrupt(format!(
                        "doc ids out of order for term '{}': {} after {}",
                        term, posting.doc_id.0, prev
                    )));
                }
                _ => {}
            }

            if self.skip_interval > 0 && i > 0 && i % self.skip_interval == 0 {
                // Boundary before posting i: doc id of posting i-1, bit
                // offset where posting i starts.
                skips.push((prev_id.unwrap(), payload.bit_len()));
            }

            // First delta is doc_id + 1 so every delta stays >= 1
            let delta = match prev_id {
                Some(prev) => posting.doc_id.0 - prev,
                None => posting.doc_id.0 + 1,
            };
            self.config.doc_ids.encode(&mut payload, delta);
            self.config.term_freqs.encode(&mut payload, posting.term_freq);

            if self.fields_enabled {
                // Count and frequencies shifted by one: both may be zero
                self.config.field_freqs.encode(&mut payload, posting.field_freqs.len() as u32 + 1);
                for &freq in &posting.field_freqs {
                    self.config.field_freqs.encode(&mut payload, freq + 1);
                }
            }

            if self.blocks_enabled {
                self.config.positions.encode(&mut payload, posting.positions.len() as u32 + 1);
                let mut prev_pos: Option<u32> = None;
                for &pos in &posting.positions {
                    let delta = match prev_pos {
                        Some(p) if pos <= p => {
                            return Err(Error::corrupt(format!(
                                "positions out of order for term '{}' doc {}", term, posting.doc_id.0
                            )));
                        }
                        Some(p) => pos - p,
                        None => pos + 1,
                    };
                    self.config.positions.encode(&mut payload, delta);
                    prev_pos = Some(pos);
                }
            }

            prev_id = Some(posting.doc_id.0);
        }

        // Skip table header: count, then (doc id delta, bit offset delta)
        // pairs, vbyte regardless of the stream codecs.
        self.bits.write_vbyte(skips.len() as u32);
        let mut last_skip_doc = 0u32;
        let mut last_skip_bit = 0u64;
        for &(doc_id, bit) in &skips {
            self.bits.write_vbyte(doc_id - last_skip_doc);
            self.bits.write_vbyte((bit - last_skip_bit) as u32);
            last_skip_doc = doc_id;
            last_skip_bit = bit;
        }

        // Append the payload bit-for-bit
        let payload_bits = payload.bit_len();
        let payload_bytes = payload.into_bytes();
        for i in 0..payload_bits {
            let byte = payload_bytes[(i / 8) as usize];
            self.bits.write_bit((byte >> (7 - (i % 8))) & 1 == 1);
        }

        self.maybe_flush()?;
        self.last_term = Some(term.to_string());

        Ok(PostingPointer {
            file_number: self.file_number,
            byte_offset,
            bit_offset,
            entries: postings.len() as u32,
        })
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.bits.buffer.len() >= FLUSH_THRESHOLD {
            let drained = self.bits.drain_complete_bytes();
            self.flushed_bytes += drained.len() as u64;
            self.file.write_all(&drained)?;
        }
        Ok(())
    }

    /// Flush the remaining bits (zero padded) and sync. Returns the final
    /// file length in bytes.
    pub fn finish(mut self) -> Result<u64> {
        let remaining = self.bits.into_bytes();
        self.flushed_bytes += remaining.len() as u64;
        self.file.write_all(&remaining)?;
        self.file.sync_all()?;
        Ok(self.flushed_bytes)
    }
}
