use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use unicode_segmentation::UnicodeSegmentation;

use crate::core::error::Result;
use crate::core::types::Document;

/// Parse a collection specification: one source file path per line,
/// `#`-prefixed lines are comments, blank lines ignored.
pub fn parse_collection_spec(path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(path)?;
    let mut files = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        files.push(PathBuf::from(line));
    }
    Ok(files)
}

/// Thin default document source: each non-empty line of a text file is
/// one document, tokenised on word boundaries and lowercased. Real
/// collection formats (tag stripping, markup) are parsed upstream; this
/// exists so the indexer always has a stream to consume.
pub struct TextCollection {
    lines: Lines<BufReader<File>>,
    stem: String,
    line_no: usize,
}

impl TextCollection {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "doc".to_string());
        Ok(TextCollection {
            lines: BufReader::new(file).lines(),
            stem,
            line_no: 0,
        })
    }

    pub fn tokenize(text: &str) -> Vec<String> {
        text.unicode_words().map(|w| w.to_lowercase()).collect()
    }
}

impl Iterator for TextCollection {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let docno = format!("{}-{:06}", self.stem, self.line_no);
            return Some(Ok(Document::new(docno, Self::tokenize(&line))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn spec_skips_comments_and_blanks() {
        let dir = tempdir().unwrap();
        let spec = dir.path().join("collection.spec");
        let mut f = File::create(&spec).unwrap();
        writeln!(f, "# corpus files").unwrap();
        writeln!(f, "/data/part1.txt").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "/data/part2.txt").unwrap();
        drop(f);

        let files = parse_collection_spec(&spec).unwrap();
        assert_eq!(files, vec![PathBuf::from("/data/part1.txt"), PathBuf::from("/data/part2.txt")]);
    }

    #[test]
    fn one_document_per_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, "Hello, World!\n\nSecond doc here\n").unwrap();

        let docs: Vec<Document> = TextCollection::open(&path)
            .unwrap()
            .map(|d| d.unwrap())
            .collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].terms, vec!["hello", "world"]);
        assert_eq!(docs[0].docno, "corpus-000001");
        assert_eq!(docs[1].docno, "corpus-000003");
    }
}
