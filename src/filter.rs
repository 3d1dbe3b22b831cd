//! Length-bounded, budgeted corpus construction.
//!
//! Accepted documents are written one per line while the positional index is
//! built from explicit accumulator state; nothing is tracked outside the loop.
use crate::config::BuildConfig;
use crate::corpus::CorpusPaths;
use crate::error::CorpusError;
use crate::metadata::{CorpusMetadata, IndexEntry};
use crate::source::{DocumentSource, RawDocument};
use crate::util::ensure_parent_dir;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Inclusive word-count bounds for a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterBounds {
    pub min_wc: u64,
    pub max_wc: u64,
}

impl FilterBounds {
    pub fn new(min_wc: u64, max_wc: u64) -> Result<Self> {
        if min_wc > max_wc {
            return Err(CorpusError::InvalidBounds {
                min: min_wc,
                max: max_wc,
            }
            .into());
        }
        Ok(Self { min_wc, max_wc })
    }

    pub fn accepts(&self, word_count: u64) -> bool {
        (self.min_wc..=self.max_wc).contains(&word_count)
    }
}

/// A token survives the round trip through a space-joined line only if it is
/// non-empty and free of whitespace.
fn is_plain_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}

/// Result of one filtering pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub index: Vec<IndexEntry>,
    pub num_documents: u64,
    pub num_words: u64,
}

/// Running position while writing accepted documents.
#[derive(Debug, Default)]
struct WriteCursor {
    line: u64,
    byte: u64,
    words: u64,
}

/// Filter `docs` into `out`, stopping once accepted words reach `budget`.
///
/// The document that crosses the budget is still written, so the total may
/// overshoot by at most one document.
pub fn write_filtered<I, W>(docs: I, bounds: FilterBounds, budget: u64, out: &mut W) -> Result<FilterOutcome>
where
    I: IntoIterator<Item = Result<RawDocument>>,
    W: Write,
{
    let mut cursor = WriteCursor::default();
    let mut index = Vec::new();

    for (position, doc) in docs.into_iter().enumerate() {
        let doc = doc.with_context(|| format!("read raw document {position}"))?;
        let word_count = doc.word_count();
        if !bounds.accepts(word_count) {
            continue;
        }
        if let Some(token) = doc.tokens.iter().find(|token| !is_plain_token(token)) {
            return Err(anyhow::anyhow!(
                "raw document {position} (id {}) has an empty or whitespace-bearing token {token:?}",
                doc.id
            ));
        }

        let text = doc.tokens.join(" ");
        out.write_all(text.as_bytes())
            .and_then(|()| out.write_all(b"\n"))
            .context("write corpus line")?;

        index.push(IndexEntry {
            id: doc.id,
            name: doc.name,
            wc: word_count,
            line: cursor.line,
            byte: cursor.byte,
        });
        cursor.line += 1;
        cursor.byte += text.len() as u64 + 1;
        cursor.words += word_count;

        if cursor.words >= budget {
            break;
        }
    }

    Ok(FilterOutcome {
        num_documents: cursor.line,
        num_words: cursor.words,
        index,
    })
}

/// Build `<base>.txt` plus both metadata files from a document source.
///
/// Any failure after the text file is created removes all three files, so a
/// half-written text never sits next to stale metadata.
pub fn build_corpus<S: DocumentSource>(
    paths: &CorpusPaths,
    source: S,
    config: &BuildConfig,
) -> Result<CorpusMetadata> {
    config.validate()?;
    let bounds = config.bounds()?;
    let label = config.source.clone().unwrap_or_else(|| source.label());

    let text_path = paths.text_path();
    ensure_parent_dir(&text_path)?;
    let file = File::create(&text_path).with_context(|| format!("create {}", text_path.display()))?;
    write_corpus_unit(paths, source, bounds, config.budget, label, file)
        .inspect_err(|_| paths.remove_files())
}

fn write_corpus_unit<S: DocumentSource>(
    paths: &CorpusPaths,
    source: S,
    bounds: FilterBounds,
    budget: u64,
    label: String,
    file: File,
) -> Result<CorpusMetadata> {
    let text_path = paths.text_path();
    let mut writer = BufWriter::new(file);
    let outcome = write_filtered(source, bounds, budget, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("flush {}", text_path.display()))?;

    tracing::info!(
        documents = outcome.num_documents,
        words = outcome.num_words,
        corpus = %text_path.display(),
        "selected documents"
    );

    let metadata = CorpusMetadata::new(label, Some((bounds.min_wc, bounds.max_wc)), outcome.index);
    metadata.write(paths)?;
    Ok(metadata)
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
