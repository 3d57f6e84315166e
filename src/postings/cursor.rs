use std::fs::File;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::compression::codec::CompressionConfig;
use crate::compression::gamma::BitReader;
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::lexicon::entry::PostingPointer;
use crate::postings::Posting;

/// Read-only view over one posting file. The bytes are immutable, so any
/// number of cursors may read concurrently without locking. Empty
/// placeholder files (reducers that produced no output) cannot be mapped
/// and carry no mapping at all.
pub struct PostingsFile {
    mmap: Option<Mmap>,
}

impl PostingsFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len() as usize;
        if len == 0 {
            return Ok(PostingsFile { mmap: None });
        }
        let mmap = unsafe { MmapOptions::new().len(len).map(&file)? };
        Ok(PostingsFile { mmap: Some(mmap) })
    }

    pub fn data(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Open a forward-only cursor for one term's list.
    pub fn open_cursor(
        &self,
        pointer: &PostingPointer,
        config: CompressionConfig,
        fields_enabled: bool,
        blocks_enabled: bool,
        skip_interval: usize,
    ) -> Result<PostingCursor<'_>> {
        PostingCursor::open(
            self.data(), pointer, config, fields_enabled, blocks_enabled, skip_interval,
        )
    }
}

struct SkipEntry {
    /// Doc id of the last posting before the skip boundary.
    doc_id: u32,
    /// Bit offset of the boundary, relative to the payload start.
    bit_offset: u64,
    /// Postings consumed when resuming at the boundary.
    consumed: u32,
}

/// Restartable forward-only cursor over one term's posting list.
pub struct PostingCursor<'a> {
    reader: BitReader<'a>,
    config: CompressionConfig,
    fields_enabled: bool,
    blocks_enabled: bool,
    entries: u32,
    read: u32,
    prev_doc_id: Option<u32>,
    skips: Vec<SkipEntry>,
    payload_base_bits: u64,
    closed: bool,
}

impl<'a> PostingCursor<'a> {
    fn open(
        data: &'a [u8],
        pointer: &PostingPointer,
        config: CompressionConfig,
        fields_enabled: bool,
        blocks_enabled: bool,
        skip_interval: usize,
    ) -> Result<Self> {
        let mut reader = BitReader::at(data, pointer.byte_offset, pointer.bit_offset);

        // Skip table precedes the payload
        let skip_count = reader.read_vbyte()?;
        let mut skips = Vec::with_capacity(skip_count as usize);
        let mut doc_id = 0u32;
        let mut bit_offset = 0u64;
        for i in 0..skip_count {
            doc_id += reader.read_vbyte()?;
            bit_offset += reader.read_vbyte()? as u64;
            skips.push(SkipEntry {
                doc_id,
                bit_offset,
                consumed: (i + 1) * skip_interval as u32,
            });
        }

        let (byte, bit) = reader.position();
        let payload_base_bits = byte * 8 + bit as u64;

        Ok(PostingCursor {
            reader,
            config,
            fields_enabled,
            blocks_enabled,
            entries: pointer.entries,
            read: 0,
            prev_doc_id: None,
            skips,
            payload_base_bits,
            closed: false,
        })
    }

    pub fn len(&self) -> u32 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Decode and return the next posting, or None at the end of the list.
    pub fn next(&mut self) -> Result<Option<Posting>> {
        if self.closed || self.read >= self.entries {
            return Ok(None);
        }

        let delta = self.config.doc_ids.decode(&mut self.reader)?;
        if delta == 0 {
            return Err(crate::core::error::Error::corrupt("zero doc id delta"));
        }
        let doc_id = match self.prev_doc_id {
            Some(prev) => prev + delta,
            None => delta - 1,  // First delta is doc_id + 1
        };
        let term_freq = self.config.term_freqs.decode(&mut self.reader)?;

        let mut posting = Posting::new(DocId(doc_id), term_freq);

        if self.fields_enabled {
            let count = self.config.field_freqs.decode(&mut self.reader)? - 1;
            posting.field_freqs.reserve(count as usize);
            for _ in 0..count {
                posting.field_freqs.push(self.config.field_freqs.decode(&mut self.reader)? - 1);
            }
        }

        if self.blocks_enabled {
            let count = self.config.positions.decode(&mut self.reader)? - 1;
            posting.positions.reserve(count as usize);
            let mut prev_pos: Option<u32> = None;
            for _ in 0..count {
                let delta = self.config.positions.decode(&mut self.reader)?;
                let pos = match prev_pos {
                    Some(p) => p + delta,
                    None => delta - 1,
                };
                posting.positions.push(pos);
                prev_pos = Some(pos);
            }
        }

        self.prev_doc_id = Some(doc_id);
        self.read += 1;
        Ok(Some(posting))
    }

    /// Advance to the first posting with doc id >= target, skipping whole
    /// blocks through the skip table where possible. Postings below the
    /// target inside the final block are decoded and discarded, never
    /// returned.
    pub fn next_skip(&mut self, target: DocId) -> Result<Option<Posting>> {
        if self.closed {
            return Ok(None);
        }

        // Jump to the furthest skip boundary still below the target that
        // is also ahead of the current position.
        let mut jump: Option<&SkipEntry> = None;
        for entry in &self.skips {
            if entry.doc_id < target.0 && entry.consumed > self.read {
                jump = Some(entry);
            } else if entry.doc_id >= target.0 {
                break;
            }
        }
        if let Some(entry) = jump {
            let absolute = self.payload_base_bits + entry.bit_offset;
            self.reader.seek(absolute / 8, (absolute % 8) as u8);
            self.read = entry.consumed;
            self.prev_doc_id = Some(entry.doc_id);
        }

        while let Some(posting) = self.next()? {
            if posting.doc_id >= target {
                return Ok(Some(posting));
            }
        }
        Ok(None)
    }

    /// Close the cursor. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postings::writer::PostingsWriter;
    use tempfile::tempdir;

    fn build_list(ids: &[u32], skip_interval: usize) -> (tempfile::TempDir, PostingPointer) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("if.0");
        let config = CompressionConfig::default();
        let mut writer =
            PostingsWriter::create(&path, config, false, false, skip_interval, 0).unwrap();
        let postings: Vec<Posting> =
            ids.iter().map(|&id| Posting::new(DocId(id), 1)).collect();
        let pointer = writer.write_list("term", &postings).unwrap();
        writer.finish().unwrap();
        (dir, pointer)
    }

    #[test]
    fn sequential_read_returns_every_posting() {
        let ids: Vec<u32> = (0..500).map(|i| i * 3).collect();
        let (dir, pointer) = build_list(&ids, 32);
        let file = PostingsFile::open(&dir.path().join("if.0")).unwrap();
        let mut cursor = file
            .open_cursor(&pointer, CompressionConfig::default(), false, false, 32)
            .unwrap();

        let mut seen = Vec::new();
        while let Some(posting) = cursor.next().unwrap() {
            seen.push(posting.doc_id.0);
        }
        assert_eq!(seen, ids);
    }

    #[test]
    fn skip_matches_linear_scan() {
        let ids: Vec<u32> = (0..1000).map(|i| i * 7 + 3).collect();
        let (dir, pointer) = build_list(&ids, 64);
        let file = PostingsFile::open(&dir.path().join("if.0")).unwrap();
        let config = CompressionConfig::default();

        for target in [0u32, 3, 350, 3500, 6995, 6996, 7000] {
            let mut skipper = file.open_cursor(&pointer, config, false, false, 64).unwrap();
            let skipped = skipper.next_skip(DocId(target)).unwrap();

            let mut scanner = file.open_cursor(&pointer, config, false, false, 64).unwrap();
            let mut linear = None;
            while let Some(p) = scanner.next().unwrap() {
                if p.doc_id.0 >= target {
                    linear = Some(p);
                    break;
                }
            }

            assert_eq!(skipped, linear, "target {}", target);
        }
    }

    #[test]
    fn skip_past_end_returns_none() {
        let (dir, pointer) = build_list(&[1, 5, 9], 0);
        let file = PostingsFile::open(&dir.path().join("if.0")).unwrap();
        let mut cursor = file
            .open_cursor(&pointer, CompressionConfig::default(), false, false, 0)
            .unwrap();
        assert!(cursor.next_skip(DocId(10)).unwrap().is_none());
    }

    #[test]
    fn close_is_idempotent() {
        let (dir, pointer) = build_list(&[1, 2], 0);
        let file = PostingsFile::open(&dir.path().join("if.0")).unwrap();
        let mut cursor = file
            .open_cursor(&pointer, CompressionConfig::default(), false, false, 0)
            .unwrap();
        cursor.close();
        cursor.close();
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn positions_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("if.0");
        let config = CompressionConfig::from_name("gamma").unwrap();
        let mut writer = PostingsWriter::create(&path, config, false, true, 0, 0).unwrap();

        let mut posting = Posting::new(DocId(4), 3);
        posting.positions = vec![0, 17, 90];
        let pointer = writer.write_list("zebra", &[posting.clone()]).unwrap();
        writer.finish().unwrap();

        let file = PostingsFile::open(&path).unwrap();
        let mut cursor = file.open_cursor(&pointer, config, false, true, 0).unwrap();
        assert_eq!(cursor.next().unwrap().unwrap(), posting);
    }
}
