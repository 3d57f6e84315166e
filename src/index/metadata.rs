use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::compression::codec::CompressionConfig;
use crate::core::error::{Error, Result};
use crate::core::stats::CollectionStatistics;

pub const FORMAT_VERSION: u32 = 1;

/// The index descriptor: declares every structure the index consists of
/// plus the invariants readers need to decode them. Written last during a
/// build, so its presence marks a complete index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub compression: CompressionConfig,
    pub fields_enabled: bool,
    pub blocks_enabled: bool,
    pub skip_interval: usize,
    /// Number of `{prefix}.if.N` posting files, N contiguous from 0.
    pub posting_files: u8,
    pub statistics: CollectionStatistics,
    pub structures: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl IndexMetadata {
    pub fn new(
        compression: CompressionConfig,
        fields_enabled: bool,
        blocks_enabled: bool,
        skip_interval: usize,
    ) -> Self {
        IndexMetadata {
            version: FORMAT_VERSION,
            compression,
            fields_enabled,
            blocks_enabled,
            skip_interval,
            posting_files: 1,
            statistics: CollectionStatistics::default(),
            structures: vec![
                "lexicon".to_string(),
                "postings".to_string(),
                "docindex".to_string(),
            ],
            created_at: Utc::now(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let metadata: IndexMetadata = serde_json::from_str(&json)?;
        if metadata.version != FORMAT_VERSION {
            return Err(Error::corrupt(format!(
                "unsupported index format version {}", metadata.version
            )));
        }
        Ok(metadata)
    }

    /// Partial outputs can only be merged when they agree on the payload
    /// layout and codecs.
    pub fn merge_compatible(&self, other: &IndexMetadata) -> bool {
        self.compression == other.compression
            && self.fields_enabled == other.fields_enabled
            && self.blocks_enabled == other.blocks_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.meta.json");
        let mut metadata = IndexMetadata::new(CompressionConfig::default(), false, true, 128);
        metadata.statistics.num_docs = 11;
        metadata.save(&path).unwrap();

        let loaded = IndexMetadata::load(&path).unwrap();
        assert_eq!(loaded.statistics.num_docs, 11);
        assert!(loaded.blocks_enabled);
        assert!(loaded.merge_compatible(&metadata));
    }

    #[test]
    fn incompatible_layouts_do_not_merge() {
        let a = IndexMetadata::new(CompressionConfig::default(), false, false, 128);
        let b = IndexMetadata::new(CompressionConfig::from_name("gamma").unwrap(), false, false, 128);
        assert!(!a.merge_compatible(&b));
    }
}
