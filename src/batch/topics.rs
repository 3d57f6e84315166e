use std::fs;
use std::io::BufRead;
use std::path::Path;

use regex::Regex;

use crate::core::error::{Error, Result};

/// One query record: an identifier plus free query text.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: String,
    pub text: String,
}

/// How a topic file encodes its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFormat {
    /// `id query text...`, one per line.
    SingleLine,
    /// Tag-delimited records: `<top>` blocks with `<num>` and `<title>`.
    Tagged,
}

/// Read a batch topic file in the given format.
pub fn read_topics(path: &Path, format: TopicFormat) -> Result<Vec<Topic>> {
    let content = fs::read_to_string(path)?;
    match format {
        TopicFormat::SingleLine => parse_single_line(&content),
        TopicFormat::Tagged => parse_tagged(&content),
    }
}

fn parse_single_line(content: &str) -> Result<Vec<Topic>> {
    let mut topics = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(char::is_whitespace) {
            Some((id, text)) => topics.push(Topic {
                id: id.to_string(),
                text: text.trim().to_string(),
            }),
            None => {
                return Err(Error::new(
                    crate::core::error::ErrorKind::Parse,
                    format!("topic line without query text: '{}'", line),
                ));
            }
        }
    }
    Ok(topics)
}

fn parse_tagged(content: &str) -> Result<Vec<Topic>> {
    // The tags are SGML-ish, often unclosed; capture up to the next tag
    let top_re = Regex::new(r"(?s)<top>(.*?)</top>").expect("static regex");
    let num_re = Regex::new(r"(?s)<num>\s*(?:Number:)?\s*([^<\n]+)").expect("static regex");
    let title_re = Regex::new(r"(?s)<title>\s*([^<]*)").expect("static regex");

    let mut topics = Vec::new();
    for block in top_re.captures_iter(content) {
        let body = &block[1];
        let id = num_re
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| {
                Error::new(
                    crate::core::error::ErrorKind::Parse,
                    "topic block without <num>".to_string(),
                )
            })?;
        let text = title_re
            .captures(body)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();
        topics.push(Topic { id, text });
    }
    Ok(topics)
}

/// Interactive query source: one query per line from a line-oriented
/// stream, ending at EOF, an empty line or an explicit quit token.
/// Queries are numbered from 1.
pub struct InteractiveTopics<R: BufRead> {
    input: R,
    next_id: usize,
    done: bool,
}

pub const QUIT_TOKEN: &str = "quit";

impl<R: BufRead> InteractiveTopics<R> {
    pub fn new(input: R) -> Self {
        InteractiveTopics {
            input,
            next_id: 1,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for InteractiveTopics<R> {
    type Item = Result<Topic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                let text = line.trim();
                if text.is_empty() || text.eq_ignore_ascii_case(QUIT_TOKEN) {
                    self.done = true;
                    return None;
                }
                let topic = Topic {
                    id: self.next_id.to_string(),
                    text: text.to_string(),
                };
                self.next_id += 1;
                Some(Ok(topic))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}
