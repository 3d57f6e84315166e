use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::config::QueryConfig;
use crate::core::error::{Error, Result};
use crate::index::handle::Index;
use crate::index::layout::IndexLayout;
use crate::query::results::ResultSet;

/// Shared, serialized results sink. One query's output lines are written
/// under a single lock acquisition, so concurrent queries never
/// interleave; the batch runner drains every in-flight query before the
/// sink is flushed and closed.
pub struct ResultWriter {
    sink: Mutex<Box<dyn Write + Send>>,
    pub run_tag: String,
}

impl ResultWriter {
    pub fn new(sink: Box<dyn Write + Send>, run_tag: impl Into<String>) -> Self {
        ResultWriter {
            sink: Mutex::new(sink),
            run_tag: run_tag.into(),
        }
    }

    pub fn to_file(path: &Path, run_tag: impl Into<String>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file)), run_tag))
    }

    /// Write one query's ranked results: one line per document,
    /// `query_id iteration docno rank score run_tag`, truncated to `max`
    /// entries (0 = unlimited). Returns the number of lines written.
    pub fn write_query_results(
        &self,
        query_id: &str,
        index: &Index,
        results: &ResultSet,
        max: usize,
    ) -> Result<usize> {
        let limit = if max == 0 { results.len() } else { results.len().min(max) };

        let mut buffer = String::new();
        for rank in 0..limit {
            let doc_id = results.doc_ids[rank];
            let entry = index.documents.get(doc_id).ok_or_else(|| {
                Error::corrupt(format!("result references unknown doc {}", doc_id.0))
            })?;
            buffer.push_str(&format!(
                "{} Q0 {} {} {:.6} {}\n",
                query_id, entry.docno, rank, results.scores[rank], self.run_tag
            ));
        }

        let mut sink = self.sink.lock();
        sink.write_all(buffer.as_bytes())?;
        Ok(limit)
    }

    pub fn flush(&self) -> Result<()> {
        self.sink.lock().flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct Provenance<'a> {
    run_tag: &'a str,
    model: &'a str,
    modifiers: &'a [String],
    max_results: usize,
    created_at: String,
}

/// Record the configuration that produced a result run in a sidecar file
/// next to the results, for provenance.
pub fn write_provenance(results_path: &Path, config: &QueryConfig) -> Result<()> {
    let provenance = Provenance {
        run_tag: &config.run_tag,
        model: &config.model,
        modifiers: &config.modifiers,
        max_results: config.max_results,
        created_at: Utc::now().to_rfc3339(),
    };
    let path = IndexLayout::provenance_path(results_path);
    std::fs::write(&path, serde_json::to_string_pretty(&provenance)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::IndexConfig;
    use crate::core::types::{DocId, Document};
    use crate::indexer::single_pass::SinglePassIndexer;
    use tempfile::tempdir;

    #[test]
    fn lines_are_ranked_and_truncated() {
        let dir = tempdir().unwrap();
        let config = IndexConfig::with_path(dir.path(), "data");
        let mut indexer = SinglePassIndexer::create(&config).unwrap();
        for i in 0..3 {
            indexer
                .index_document(&Document::new(format!("D{}", i), vec!["x".into()]))
                .unwrap();
        }
        indexer.finish().unwrap();
        let index = Index::open(dir.path(), "data").unwrap();

        let mut results = ResultSet::new();
        results.push(DocId(2), 3.0, 1);
        results.push(DocId(0), 2.0, 1);
        results.push(DocId(1), 1.0, 1);

        let out = dir.path().join("results");
        let writer = ResultWriter::to_file(&out, "testrun").unwrap();
        let written = writer.write_query_results("7", &index, &results, 2).unwrap();
        writer.flush().unwrap();
        assert_eq!(written, 2);

        let content = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "7 Q0 D2 0 3.000000 testrun");
        assert!(lines[1].starts_with("7 Q0 D0 1 "));
    }

    #[test]
    fn provenance_sidecar_is_written() {
        let dir = tempdir().unwrap();
        let results_path = dir.path().join("myrun.res");
        std::fs::write(&results_path, "").unwrap();

        write_provenance(&results_path, &QueryConfig::default()).unwrap();
        let sidecar = dir.path().join("myrun.res.settings.json");
        let content = std::fs::read_to_string(sidecar).unwrap();
        assert!(content.contains("\"model\": \"bm25\""));
    }
}
