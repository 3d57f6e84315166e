use std::path::{Path, PathBuf};

/// Naming scheme for one index's on-disk structures: every file is
/// `{prefix}.{structure}` inside the index directory.
#[derive(Debug, Clone)]
pub struct IndexLayout {
    pub path: PathBuf,
    pub prefix: String,
}

impl IndexLayout {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        IndexLayout {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(format!("{}.meta.json", self.prefix))
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.path.join(format!("{}.lex", self.prefix))
    }

    pub fn postings_path(&self, file_number: u8) -> PathBuf {
        self.path.join(format!("{}.if.{}", self.prefix, file_number))
    }

    pub fn doc_index_path(&self) -> PathBuf {
        self.path.join(format!("{}.docix", self.prefix))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path.join(format!("{}.lock", self.prefix))
    }

    /// Sidecar recording the configuration that produced a result run.
    pub fn provenance_path(results_path: &Path) -> PathBuf {
        let mut name = results_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "results".to_string());
        name.push_str(".settings.json");
        results_path.with_file_name(name)
    }
}
