use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crc32fast::Hasher;
use serde::{Serialize, Deserialize};

use crate::compression::block::{BlockCompression, CompressedBlock};
use crate::core::error::{Error, Result};
use crate::core::types::DocId;

const ROWS_PER_BLOCK: usize = 1024;

/// Per-document metadata: the external identifier reported in result
/// output and the token count consumed by the weighting models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub docno: String,
    pub length: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocIndexHeader {
    version: u32,
    doc_count: u32,
    block_count: u32,
    checksum: u32,
}

impl DocIndexHeader {
    const VERSION: u32 = 1;
    // bincode encodes four u32 fields at a fixed width
    const SIZE: usize = 16;
}

/// Streaming document-index writer: rows arrive in doc id order, are
/// packed into LZ4 blocks, and a checksummed header is patched in at the
/// reserved front of the file on finish.
pub struct DocumentIndexWriter {
    file: BufWriter<File>,
    pending: Vec<DocumentEntry>,
    doc_count: u32,
    block_count: u32,
    hasher: Hasher,
}

impl DocumentIndexWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = BufWriter::new(File::create(path)?);
        // Reserve header space; patched on finish
        file.write_all(&[0u8; DocIndexHeader::SIZE])?;
        Ok(DocumentIndexWriter {
            file,
            pending: Vec::with_capacity(ROWS_PER_BLOCK),
            doc_count: 0,
            block_count: 0,
            hasher: Hasher::new(),
        })
    }

    pub fn add(&mut self, docno: impl Into<String>, length: u32) -> Result<()> {
        self.pending.push(DocumentEntry { docno: docno.into(), length });
        self.doc_count += 1;
        if self.pending.len() >= ROWS_PER_BLOCK {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let raw = bincode::serialize(&self.pending)?;
        let block = CompressedBlock::compress(&raw, BlockCompression::LZ4)?;
        let encoded = bincode::serialize(&block)?;

        self.hasher.update(&encoded);
        self.file.write_all(&(encoded.len() as u32).to_le_bytes())?;
        self.file.write_all(&encoded)?;
        self.block_count += 1;
        self.pending.clear();
        Ok(())
    }

    pub fn finish(mut self) -> Result<u32> {
        self.flush_block()?;

        let header = DocIndexHeader {
            version: DocIndexHeader::VERSION,
            doc_count: self.doc_count,
            block_count: self.block_count,
            checksum: self.hasher.finalize(),
        };
        let header_data = bincode::serialize(&header)?;

        self.file.flush()?;
        let file = self.file.get_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header_data)?;
        file.sync_all()?;
        Ok(self.doc_count)
    }
}

/// In-memory document index. Doc lengths are read on every scored posting,
/// so the whole structure is decoded at open.
pub struct DocumentIndex {
    pub entries: Vec<DocumentEntry>,
}

impl DocumentIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut header_buf = [0u8; DocIndexHeader::SIZE];
        file.read_exact(&mut header_buf)?;
        let header: DocIndexHeader = bincode::deserialize(&header_buf)?;
        if header.version != DocIndexHeader::VERSION {
            return Err(Error::corrupt("unsupported document index version"));
        }

        let mut entries = Vec::with_capacity(header.doc_count as usize);
        let mut hasher = Hasher::new();
        for _ in 0..header.block_count {
            let mut len_buf = [0u8; 4];
            file.read_exact(&mut len_buf)?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut block_buf = vec![0u8; len];
            file.read_exact(&mut block_buf)?;
            hasher.update(&block_buf);

            let block: CompressedBlock = bincode::deserialize(&block_buf)?;
            let raw = block.decompress()?;
            let rows: Vec<DocumentEntry> = bincode::deserialize(&raw)?;
            entries.extend(rows);
        }

        if hasher.finalize() != header.checksum {
            return Err(Error::corrupt("document index checksum mismatch"));
        }
        if entries.len() != header.doc_count as usize {
            return Err(Error::corrupt("document index row count mismatch"));
        }

        Ok(DocumentIndex { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&DocumentEntry> {
        self.entries.get(doc_id.0 as usize)
    }
}
