//! Raw-document producers feeding the corpus filter.
//!
//! The archival parser that tokenizes a dump lives upstream; it hands over
//! JSON Lines records. Plain text is also accepted so an existing corpus can
//! be filtered again.
use crate::error::CorpusError;
use crate::metadata::SourceId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One tokenized document with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub tokens: Vec<String>,
    pub id: SourceId,
    pub name: String,
}

impl RawDocument {
    pub fn new(tokens: Vec<String>, id: impl Into<SourceId>, name: impl Into<String>) -> Self {
        Self {
            tokens,
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn word_count(&self) -> u64 {
        self.tokens.len() as u64
    }
}

/// A lazy, fallible sequence of raw documents.
pub trait DocumentSource: Iterator<Item = Result<RawDocument>> {
    /// Label recorded as the corpus `source`.
    fn label(&self) -> String;
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonRecord {
    tokens: Vec<String>,
    id: SourceId,
    #[serde(default)]
    title: String,
}

/// `{"tokens": [...], "id": ..., "title": "..."}` per line; blank lines skipped.
pub struct JsonLinesSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: u64,
}

impl JsonLinesSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_input(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for JsonLinesSource {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            let line_no = self.line_no;
            self.line_no += 1;
            let line = match line.with_context(|| format!("read {}", self.path.display())) {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };
            if line.trim().is_empty() {
                continue;
            }
            let parsed: Result<RawDocument> = serde_json::from_str::<JsonRecord>(&line)
                .map_err(|err| {
                    CorpusError::malformed(&self.path, format!("record on line {line_no}: {err}"))
                        .into()
                })
                .map(|record| RawDocument {
                    tokens: record.tokens,
                    id: record.id,
                    name: record.title,
                });
            return Some(parsed);
        }
    }
}

impl DocumentSource for JsonLinesSource {
    fn label(&self) -> String {
        file_label(&self.path)
    }
}

/// One document per line, split on whitespace; the id is the line number.
pub struct TextLineSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: u64,
}

impl TextLineSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = open_input(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for TextLineSource {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        let line_no = self.line_no;
        self.line_no += 1;
        Some(
            line.with_context(|| format!("read {} line {line_no}", self.path.display()))
                .map(|line| {
                    let tokens = line.split_whitespace().map(str::to_string).collect();
                    RawDocument::new(tokens, line_no, String::new())
                }),
        )
    }
}

impl DocumentSource for TextLineSource {
    fn label(&self) -> String {
        file_label(&self.path)
    }
}

/// In-memory source for tests.
#[cfg(test)]
pub struct VecSource {
    label: String,
    docs: std::vec::IntoIter<RawDocument>,
}

#[cfg(test)]
impl VecSource {
    pub fn new(label: impl Into<String>, docs: Vec<RawDocument>) -> Self {
        Self {
            label: label.into(),
            docs: docs.into_iter(),
        }
    }
}

#[cfg(test)]
impl Iterator for VecSource {
    type Item = Result<RawDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        self.docs.next().map(Ok)
    }
}

#[cfg(test)]
impl DocumentSource for VecSource {
    fn label(&self) -> String {
        self.label.clone()
    }
}

fn open_input(path: &Path) -> Result<File> {
    if !path.is_file() {
        return Err(CorpusError::MissingFile {
            path: path.to_path_buf(),
        }
        .into());
    }
    File::open(path).with_context(|| format!("open {}", path.display()))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
