use crate::core::error::{Error, ErrorKind, Result};
use crate::index::doc_index::DocumentIndex;
use crate::index::layout::IndexLayout;
use crate::index::lock::FileLock;
use crate::index::metadata::IndexMetadata;
use crate::lexicon::entry::TermEntry;
use crate::lexicon::reader::Lexicon;
use crate::postings::cursor::{PostingCursor, PostingsFile};

use std::path::Path;

/// An opened, read-only view over one index's structures. Holds a shared
/// lock for its lifetime, so a writer cannot replace structures underneath
/// live readers. Cheap to share across query threads behind an Arc.
pub struct Index {
    pub layout: IndexLayout,
    pub metadata: IndexMetadata,
    pub lexicon: Lexicon,
    pub postings: Vec<PostingsFile>,
    pub documents: DocumentIndex,
    _lock: FileLock,
}

impl Index {
    /// An index exists iff its descriptor and every declared structure
    /// are present.
    pub fn exists(path: &Path, prefix: &str) -> bool {
        let layout = IndexLayout::new(path, prefix);
        let metadata = match IndexMetadata::load(&layout.metadata_path()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        Self::missing_structure(&layout, &metadata).is_none()
    }

    fn missing_structure(layout: &IndexLayout, metadata: &IndexMetadata) -> Option<String> {
        for structure in &metadata.structures {
            let present = match structure.as_str() {
                "lexicon" => layout.lexicon_path().is_file(),
                "postings" => (0..metadata.posting_files)
                    .all(|n| layout.postings_path(n).is_file()),
                "docindex" => layout.doc_index_path().is_file(),
                _ => false,
            };
            if !present {
                return Some(structure.clone());
            }
        }
        None
    }

    /// Open every structure; any missing one is a hard failure.
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let layout = IndexLayout::new(path, prefix);
        let lock = FileLock::acquire(&layout.lock_path(), false)?;

        let metadata = IndexMetadata::load(&layout.metadata_path()).map_err(|e| {
            Error::new(
                ErrorKind::NotFound,
                format!("no index at {}/{}: {}", path.display(), prefix, e),
            )
        })?;

        if let Some(structure) = Self::missing_structure(&layout, &metadata) {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("index structure '{}' is missing", structure),
            ));
        }

        let lexicon = Lexicon::open(&layout.lexicon_path())?;
        let mut postings = Vec::with_capacity(metadata.posting_files as usize);
        for n in 0..metadata.posting_files {
            postings.push(PostingsFile::open(&layout.postings_path(n))?);
        }
        let documents = DocumentIndex::open(&layout.doc_index_path())?;

        Ok(Index {
            layout,
            metadata,
            lexicon,
            postings,
            documents,
            _lock: lock,
        })
    }

    pub fn lookup(&self, term: &str) -> Result<Option<TermEntry>> {
        self.lexicon.lookup(term)
    }

    /// Open a posting cursor for a lexicon entry.
    pub fn open_cursor(&self, entry: &TermEntry) -> Result<PostingCursor<'_>> {
        let file = self
            .postings
            .get(entry.pointer.file_number as usize)
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "posting pointer references file {} of {}",
                    entry.pointer.file_number, self.metadata.posting_files
                ))
            })?;
        file.open_cursor(
            &entry.pointer,
            self.metadata.compression,
            self.metadata.fields_enabled,
            self.metadata.blocks_enabled,
            self.metadata.skip_interval,
        )
    }

    /// Flush and release every structure. Dropping does the same; close
    /// exists for call sites that want the release to be explicit.
    pub fn close(self) {}
}
