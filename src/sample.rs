//! Deterministic corpus subsetting.
//!
//! Membership is a pure function of a document's line number in the source
//! corpus: CRC-32 of the number as a little-endian `i64`, compared against
//! `ratio * 2^32`. No seed participates, so a document kept at one ratio is
//! kept at every larger ratio and reruns are byte-identical.
use crate::corpus::{ensure_line_count, CorpusPaths, LineScanner};
use crate::error::CorpusError;
use crate::metadata::{CorpusMetadata, IndexEntry};
use crate::util::{ensure_parent_dir, same_file};
use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

const HASH_SPACE: f64 = 4_294_967_296.0;

/// CRC-32 (IEEE) of the identifier's 8-byte little-endian representation.
pub fn hash32(id: u64) -> u32 {
    crc32fast::hash(&(id as i64).to_le_bytes())
}

pub fn in_subset(id: u64, ratio: f64) -> bool {
    f64::from(hash32(id)) < ratio * HASH_SPACE
}

pub fn validate_ratio(ratio: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(CorpusError::InvalidRatio(ratio).into());
    }
    Ok(ratio)
}

/// Ratio rendered to three significant digits, trailing zeros trimmed but at
/// least one fractional digit kept (`0.2`, `0.125`, `1.0`).
pub fn ratio_tag(ratio: f64) -> String {
    if ratio == 0.0 {
        return "0.0".to_string();
    }
    let magnitude = ratio.abs().log10().floor() as i32;
    let decimals = (2 - magnitude).max(1) as usize;
    let mut tag = format!("{ratio:.decimals$}");
    while tag.ends_with('0') {
        tag.pop();
    }
    if tag.ends_with('.') {
        tag.push('0');
    }
    tag
}

/// Default subset location: `<base>_subset_<ratio>` next to the source.
pub fn default_output(source: &CorpusPaths, ratio: f64) -> CorpusPaths {
    source.subset(&ratio_tag(ratio))
}

/// Write the subset of `source` selected at `ratio` to `output`.
///
/// The source's line count is checked against its index before anything is
/// written. On failure every partially written output file is removed.
pub fn sample_corpus(source: &CorpusPaths, output: &CorpusPaths, ratio: f64) -> Result<CorpusMetadata> {
    let ratio = validate_ratio(ratio)?;
    source.require_existing()?;
    let source_text = source.text_path();
    let output_text = output.text_path();
    ensure_parent_dir(&output_text)?;
    if output_text == source_text
        || same_file(&source_text, &output_text)?
        || same_file(&source.meta_json_path(), &output.meta_json_path())?
    {
        return Err(anyhow!(
            "refusing to sample {} onto itself",
            source_text.display()
        ));
    }

    let metadata = CorpusMetadata::load(&source.meta_json_path())?;
    ensure_line_count(&source_text, metadata.index.len())?;

    let sampled = write_subset(source, output, &metadata, ratio)
        .and_then(|index| {
            let sampled = metadata.with_index(index);
            sampled.write(output)?;
            Ok(sampled)
        })
        .inspect_err(|_| output.remove_files())?;
    tracing::info!(
        ratio,
        documents = sampled.num_documents,
        words = sampled.num_words,
        of = metadata.num_documents,
        corpus = %output_text.display(),
        "sampled corpus"
    );
    Ok(sampled)
}

fn write_subset(
    source: &CorpusPaths,
    output: &CorpusPaths,
    metadata: &CorpusMetadata,
    ratio: f64,
) -> Result<Vec<IndexEntry>> {
    let output_text = output.text_path();
    let file =
        File::create(&output_text).with_context(|| format!("create {}", output_text.display()))?;
    let mut writer = BufWriter::new(file);
    let mut scanner = LineScanner::open(&source.text_path())?;

    let mut index = Vec::new();
    let mut position = 0u64;
    for entry in &metadata.index {
        let Some(line) = scanner.next_text_line()? else {
            return Err(anyhow!(
                "{} ended before its index",
                source.text_path().display()
            ));
        };
        if !in_subset(entry.line, ratio) {
            continue;
        }
        writer
            .write_all(line.as_bytes())
            .with_context(|| format!("write {}", output_text.display()))?;
        let mut written = line.len() as u64;
        if !line.ends_with('\n') {
            writer
                .write_all(b"\n")
                .with_context(|| format!("write {}", output_text.display()))?;
            written += 1;
        }
        index.push(IndexEntry {
            line: index.len() as u64,
            byte: position,
            ..entry.clone()
        });
        position += written;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", output_text.display()))?;
    Ok(index)
}

#[cfg(test)]
#[path = "sample_tests.rs"]
mod tests;
