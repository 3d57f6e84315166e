use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crc32fast::Hasher;
use serde::{Serialize, Deserialize};

use crate::compression::gamma::BitReader;
use crate::compression::vbyte::VByteEncoder;
use crate::core::config::IndexConfig;
use crate::core::error::{Error, Result};
use crate::postings::writer::PostingsWriter;
use crate::postings::Posting;

/// A run is a complete, self-contained mini index over one in-memory
/// batch: a term-ordered mini lexicon plus mini postings. Runs exist only
/// between a flush and the merge that consumes them.
#[derive(Debug, Clone)]
pub struct RunFiles {
    pub lexicon: PathBuf,
    pub postings: PathBuf,
    pub doc_base: u32,
    pub doc_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunHeader {
    version: u32,
    term_count: u32,
    doc_base: u32,
    doc_count: u32,
    checksum: u32,
}

impl RunHeader {
    const VERSION: u32 = 1;
    // Five fixed-width u32 fields
    const SIZE: usize = 20;
}

/// Record for one term in a run's mini lexicon. Rows are variable-size
/// and only ever read sequentially, so no fixed layout is needed here.
#[derive(Debug, Clone)]
pub struct RunTermRecord {
    pub term: String,
    pub doc_freq: u32,
    pub collection_freq: u64,
    pub entries: u32,
    pub byte_offset: u64,
    pub bit_offset: u8,
}

pub fn run_lexicon_path(dir: &Path, prefix: &str, run: u32) -> PathBuf {
    dir.join(format!("{}.run.{}.lex", prefix, run))
}

pub fn run_postings_path(dir: &Path, prefix: &str, run: u32) -> PathBuf {
    dir.join(format!("{}.run.{}.if", prefix, run))
}

/// Write one run from a term-sorted accumulator. Doc ids inside the
/// accumulator are already global, so merged runs concatenate without
/// re-basing.
pub fn write_run(
    dir: &Path,
    prefix: &str,
    run: u32,
    config: &IndexConfig,
    doc_base: u32,
    doc_count: u32,
    accumulator: &BTreeMap<String, Vec<Posting>>,
) -> Result<RunFiles> {
    let lexicon_path = run_lexicon_path(dir, prefix, run);
    let postings_path = run_postings_path(dir, prefix, run);

    // Runs are read back strictly sequentially; no skip tables
    let mut postings_writer = PostingsWriter::create(
        &postings_path,
        config.compression,
        config.fields_enabled,
        config.blocks_enabled,
        0,
        0,
    )?;

    let mut lexicon_file = BufWriter::new(File::create(&lexicon_path)?);
    lexicon_file.write_all(&[0u8; RunHeader::SIZE])?;

    let mut hasher = Hasher::new();
    let mut term_count = 0u32;

    for (term, postings) in accumulator {
        let pointer = postings_writer.write_list(term, postings)?;
        let collection_freq: u64 = postings.iter().map(|p| p.term_freq as u64).sum();

        let mut record = Vec::new();
        VByteEncoder::encode_u32(&mut record, term.len() as u32);
        record.extend_from_slice(term.as_bytes());
        VByteEncoder::encode_u32(&mut record, postings.len() as u32);
        VByteEncoder::encode_u64(&mut record, collection_freq);
        VByteEncoder::encode_u32(&mut record, pointer.entries);
        VByteEncoder::encode_u64(&mut record, pointer.byte_offset);
        record.push(pointer.bit_offset);

        hasher.update(&record);
        lexicon_file.write_all(&record)?;
        term_count += 1;
    }

    postings_writer.finish()?;

    let header = RunHeader {
        version: RunHeader::VERSION,
        term_count,
        doc_base,
        doc_count,
        checksum: hasher.finalize(),
    };
    lexicon_file.flush()?;
    let file = lexicon_file.get_mut();
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&bincode::serialize(&header)?)?;
    file.sync_all()?;

    Ok(RunFiles {
        lexicon: lexicon_path,
        postings: postings_path,
        doc_base,
        doc_count,
    })
}

/// Sequential reader over one run: mini lexicon records in term order,
/// posting lists decoded on demand.
pub struct RunReader {
    lexicon: BufReader<File>,
    postings: Vec<u8>,
    pub term_count: u32,
    pub doc_base: u32,
    pub doc_count: u32,
    read: u32,
    config: IndexConfig,
}

impl RunReader {
    pub fn open(files: &RunFiles, config: &IndexConfig) -> Result<Self> {
        let mut lexicon = BufReader::new(File::open(&files.lexicon)?);
        let mut header_buf = [0u8; RunHeader::SIZE];
        lexicon.read_exact(&mut header_buf)?;
        let header: RunHeader = bincode::deserialize(&header_buf)?;
        if header.version != RunHeader::VERSION {
            return Err(Error::corrupt("unsupported run version"));
        }

        // Verify the mini lexicon against its checksum before merging;
        // a truncated run must abort the merge, not corrupt the output.
        let mut remainder = Vec::new();
        lexicon.read_to_end(&mut remainder)?;
        let mut hasher = Hasher::new();
        hasher.update(&remainder);
        if hasher.finalize() != header.checksum {
            return Err(Error::corrupt(format!(
                "run {} failed checksum validation", files.lexicon.display()
            )));
        }
        lexicon.seek(SeekFrom::Start(RunHeader::SIZE as u64))?;

        let postings = std::fs::read(&files.postings)?;

        Ok(RunReader {
            lexicon,
            postings,
            term_count: header.term_count,
            doc_base: header.doc_base,
            doc_count: header.doc_count,
            read: 0,
            config: config.clone(),
        })
    }

    /// Next mini-lexicon record, or None when the run is exhausted.
    pub fn next_term(&mut self) -> Result<Option<RunTermRecord>> {
        if self.read >= self.term_count {
            return Ok(None);
        }

        let term_len = self.read_vbyte_u32()? as usize;
        let mut term_bytes = vec![0u8; term_len];
        self.lexicon.read_exact(&mut term_bytes)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| Error::corrupt("run lexicon has invalid UTF-8 term"))?;

        let doc_freq = self.read_vbyte_u32()?;
        let collection_freq = self.read_vbyte_u64()?;
        let entries = self.read_vbyte_u32()?;
        let byte_offset = self.read_vbyte_u64()?;
        let mut bit = [0u8; 1];
        self.lexicon.read_exact(&mut bit)?;

        self.read += 1;
        Ok(Some(RunTermRecord {
            term,
            doc_freq,
            collection_freq,
            entries,
            byte_offset,
            bit_offset: bit[0],
        }))
    }

    /// Decode the full posting list for a record.
    pub fn read_postings(&self, record: &RunTermRecord) -> Result<Vec<Posting>> {
        let mut reader = BitReader::at(&self.postings, record.byte_offset, record.bit_offset);
        // Run lists carry an (empty) skip table header
        let skip_count = reader.read_vbyte()?;
        if skip_count != 0 {
            return Err(Error::corrupt("run posting list has a skip table"));
        }

        let mut postings = Vec::with_capacity(record.entries as usize);
        let mut prev_id: Option<u32> = None;
        for _ in 0..record.entries {
            let delta = self.config.compression.doc_ids.decode(&mut reader)?;
            if delta == 0 {
                return Err(Error::corrupt("zero doc id delta in run"));
            }
            let doc_id = match prev_id {
                Some(prev) => prev + delta,
                None => delta - 1,
            };
            let term_freq = self.config.compression.term_freqs.decode(&mut reader)?;
            let mut posting = Posting::new(crate::core::types::DocId(doc_id), term_freq);

            if self.config.fields_enabled {
                let count = self.config.compression.field_freqs.decode(&mut reader)? - 1;
                for _ in 0..count {
                    posting
                        .field_freqs
                        .push(self.config.compression.field_freqs.decode(&mut reader)? - 1);
                }
            }
            if self.config.blocks_enabled {
                let count = self.config.compression.positions.decode(&mut reader)? - 1;
                let mut prev_pos: Option<u32> = None;
                for _ in 0..count {
                    let delta = self.config.compression.positions.decode(&mut reader)?;
                    let pos = match prev_pos {
                        Some(p) => p + delta,
                        None => delta - 1,
                    };
                    posting.positions.push(pos);
                    prev_pos = Some(pos);
                }
            }

            prev_id = Some(doc_id);
            postings.push(posting);
        }
        Ok(postings)
    }

    fn read_vbyte_u32(&mut self) -> Result<u32> {
        let mut value = 0u32;
        let mut shift = 0;
        loop {
            let mut byte = [0u8; 1];
            self.lexicon.read_exact(&mut byte)?;
            value |= ((byte[0] & 127) as u32) << shift;
            if byte[0] & 128 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 28 {
                return Err(Error::corrupt("vbyte overflow in run lexicon"));
            }
        }
    }

    fn read_vbyte_u64(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let mut byte = [0u8; 1];
            self.lexicon.read_exact(&mut byte)?;
            value |= ((byte[0] & 127) as u64) << shift;
            if byte[0] & 128 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(Error::corrupt("vbyte overflow in run lexicon"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use tempfile::tempdir;

    #[test]
    fn run_round_trip() {
        let dir = tempdir().unwrap();
        let config = IndexConfig::default();

        let mut accumulator: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        accumulator.insert("apple".to_string(), vec![
            Posting::new(DocId(0), 2),
            Posting::new(DocId(2), 1),
        ]);
        accumulator.insert("pear".to_string(), vec![Posting::new(DocId(1), 3)]);

        let files = write_run(dir.path(), "data", 0, &config, 0, 3, &accumulator).unwrap();
        let mut reader = RunReader::open(&files, &config).unwrap();

        let apple = reader.next_term().unwrap().unwrap();
        assert_eq!(apple.term, "apple");
        assert_eq!(apple.doc_freq, 2);
        assert_eq!(apple.collection_freq, 3);
        let postings = reader.read_postings(&apple).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].doc_id, DocId(0));
        assert_eq!(postings[1].doc_id, DocId(2));

        let pear = reader.next_term().unwrap().unwrap();
        assert_eq!(pear.term, "pear");
        assert!(reader.next_term().unwrap().is_none());
    }

    #[test]
    fn truncated_run_is_detected() {
        let dir = tempdir().unwrap();
        let config = IndexConfig::default();

        let mut accumulator: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        accumulator.insert("term".to_string(), vec![Posting::new(DocId(0), 1)]);
        let files = write_run(dir.path(), "data", 0, &config, 0, 1, &accumulator).unwrap();

        let bytes = std::fs::read(&files.lexicon).unwrap();
        std::fs::write(&files.lexicon, &bytes[..bytes.len() - 1]).unwrap();

        assert!(RunReader::open(&files, &config).is_err());
    }
}
