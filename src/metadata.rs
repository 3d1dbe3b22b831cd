//! Corpus metadata: the positional index plus aggregate statistics.
//!
//! The structured `.meta.json` form is the only machine-readable copy. The
//! `.meta.txt` summary drops the index and is for people; it is never read
//! back.
use crate::corpus::CorpusPaths;
use crate::error::CorpusError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Canonical index-entry keys, in the order they are declared in `fields`.
pub const INDEX_FIELDS: [&str; 5] = ["id", "name", "wc", "line", "byte"];

const JSON_INDENT: &[u8] = b"    ";

/// Identifier a document carried in its origin dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Number(u64),
    Text(String),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Number(n) => write!(f, "{n}"),
            SourceId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for SourceId {
    fn from(value: u64) -> Self {
        SourceId::Number(value)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        SourceId::Text(value.to_string())
    }
}

/// One corpus line's position and provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexEntry {
    pub id: SourceId,
    pub name: String,
    pub wc: u64,
    pub line: u64,
    pub byte: u64,
}

/// Contents of `<base>.meta.json`.
///
/// Field order here is the on-disk key order. Unrecognized top-level keys are
/// kept in `extra` and written after the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetadata {
    pub source: String,
    pub document_min_wc: Option<u64>,
    pub document_max_wc: Option<u64>,
    pub num_documents: u64,
    pub num_words: u64,
    pub fields: Vec<String>,
    pub index: Vec<IndexEntry>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CorpusMetadata {
    /// Build metadata for a freshly written corpus; aggregates come from the index.
    pub fn new(source: impl Into<String>, bounds: Option<(u64, u64)>, index: Vec<IndexEntry>) -> Self {
        let mut metadata = Self {
            source: source.into(),
            document_min_wc: bounds.map(|(min, _)| min),
            document_max_wc: bounds.map(|(_, max)| max),
            num_documents: 0,
            num_words: 0,
            fields: INDEX_FIELDS.iter().map(|field| field.to_string()).collect(),
            index,
            extra: BTreeMap::new(),
        };
        metadata.recompute_aggregates();
        metadata
    }

    /// Copy everything except the index and aggregates, which are replaced.
    pub fn with_index(&self, index: Vec<IndexEntry>) -> Self {
        let mut metadata = Self {
            index,
            ..self.clone_without_index()
        };
        metadata.recompute_aggregates();
        metadata
    }

    fn clone_without_index(&self) -> Self {
        Self {
            source: self.source.clone(),
            document_min_wc: self.document_min_wc,
            document_max_wc: self.document_max_wc,
            num_documents: self.num_documents,
            num_words: self.num_words,
            fields: self.fields.clone(),
            index: Vec::new(),
            extra: self.extra.clone(),
        }
    }

    pub fn recompute_aggregates(&mut self) {
        self.num_documents = self.index.len() as u64;
        self.num_words = self.index.iter().map(|entry| entry.wc).sum();
    }

    /// Load and validate a structured metadata file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CorpusError::MissingFile {
                    path: path.to_path_buf(),
                }
                .into());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read metadata {}", path.display()));
            }
        };
        let metadata: CorpusMetadata = serde_json::from_slice(&bytes)
            .map_err(|err| CorpusError::malformed(path, err.to_string()))?;
        metadata.validate(path)?;
        Ok(metadata)
    }

    /// Check the declared schema and aggregates against the index.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let mut declared: Vec<&str> = self.fields.iter().map(String::as_str).collect();
        declared.sort_unstable();
        let mut canonical = INDEX_FIELDS.to_vec();
        canonical.sort_unstable();
        if declared != canonical {
            return Err(CorpusError::malformed(
                path,
                format!(
                    "fields {:?} do not match index entry keys {:?}",
                    self.fields, INDEX_FIELDS
                ),
            )
            .into());
        }
        if self.num_documents != self.index.len() as u64 {
            return Err(CorpusError::malformed(
                path,
                format!(
                    "num_documents is {} but the index has {} entries",
                    self.num_documents,
                    self.index.len()
                ),
            )
            .into());
        }
        let words: u64 = self.index.iter().map(|entry| entry.wc).sum();
        if self.num_words != words {
            return Err(CorpusError::malformed(
                path,
                format!(
                    "num_words is {} but index word counts sum to {words}",
                    self.num_words
                ),
            )
            .into());
        }
        Ok(())
    }

    /// Serialize the structured form with four-space indentation.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .context("serialize corpus metadata")?;
        Ok(out)
    }

    /// Render the `key: value` summary (everything but `index`).
    pub fn summary_text(&self) -> String {
        let mut out = String::new();
        let mut push = |key: &str, value: String| {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        };
        push("source", self.source.clone());
        push("document_min_wc", render_optional(self.document_min_wc));
        push("document_max_wc", render_optional(self.document_max_wc));
        push("num_documents", self.num_documents.to_string());
        push("num_words", self.num_words.to_string());
        push("fields", format!("[{}]", self.fields.join(", ")));
        for (key, value) in &self.extra {
            push(key, render_value(value));
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let bytes = self.to_json_bytes()?;
        fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn write_summary(&self, path: &Path) -> Result<()> {
        fs::write(path, self.summary_text()).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Write both metadata files of a corpus unit.
    pub fn write(&self, paths: &CorpusPaths) -> Result<()> {
        self.write_json(&paths.meta_json_path())?;
        self.write_summary(&paths.meta_txt_path())?;
        Ok(())
    }
}

fn render_optional(value: Option<u64>) -> String {
    value.map_or_else(|| "null".to_string(), |n| n.to_string())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
