//! Read-only consistency check of a corpus against its index.
use crate::corpus::{CorpusPaths, LineScanner};
use crate::metadata::CorpusMetadata;
use anyhow::Result;
use serde::Serialize;

/// Mismatches kept per category; counts are always complete.
const MAX_REPORTED: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub entry: usize,
    pub expected: u64,
    pub found: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MismatchSet {
    pub count: usize,
    pub first: Vec<Mismatch>,
}

impl MismatchSet {
    fn record(&mut self, entry: usize, expected: u64, found: u64) {
        self.count += 1;
        if self.first.len() < MAX_REPORTED {
            self.first.push(Mismatch {
                entry,
                expected,
                found,
            });
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub lines: u64,
    pub entries: u64,
    /// `line` field differs from the entry's position.
    pub line: MismatchSet,
    /// `byte` field differs from the scanned offset.
    pub byte: MismatchSet,
    /// `wc` differs from the whitespace token count of the line.
    pub wc: MismatchSet,
}

impl VerifyReport {
    pub fn is_consistent(&self) -> bool {
        self.lines == self.entries && self.line.count == 0 && self.byte.count == 0 && self.wc.count == 0
    }
}

/// Scan `paths` once and compare every line with its index entry.
///
/// Malformed metadata and non-UTF-8 lines are errors; everything else is
/// reported.
pub fn verify_corpus(paths: &CorpusPaths) -> Result<VerifyReport> {
    paths.require_existing()?;
    let metadata = CorpusMetadata::load(&paths.meta_json_path())?;
    let mut scanner = LineScanner::open(&paths.text_path())?;
    let mut report = VerifyReport {
        entries: metadata.index.len() as u64,
        ..VerifyReport::default()
    };

    let mut position = 0u64;
    let mut entries = metadata.index.iter().enumerate();
    while let Some(line) = scanner.next_text_line()? {
        let length = line.len() as u64;
        if let Some((i, entry)) = entries.next() {
            if entry.line != i as u64 {
                report.line.record(i, i as u64, entry.line);
            }
            if entry.byte != position {
                report.byte.record(i, position, entry.byte);
            }
            let tokens = line.split_whitespace().count() as u64;
            if entry.wc != tokens {
                report.wc.record(i, tokens, entry.wc);
            }
        }
        position += length;
    }
    report.lines = scanner.lines_read();

    if report.is_consistent() {
        tracing::debug!(lines = report.lines, "corpus consistent");
    } else {
        tracing::warn!(
            lines = report.lines,
            entries = report.entries,
            line_mismatches = report.line.count,
            byte_mismatches = report.byte.count,
            wc_mismatches = report.wc.count,
            "corpus inconsistent with index"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;
    use crate::filter::build_corpus;
    use crate::source::{RawDocument, VecSource};
    use std::fs;
    use tempfile::TempDir;

    fn built(dir: &std::path::Path) -> CorpusPaths {
        let paths = CorpusPaths::new(dir.join("c"));
        let docs = vec![
            RawDocument::new(vec!["a".into(), "b".into()], 1u64, "A"),
            RawDocument::new(vec!["ç".into(), "d".into(), "e".into()], 2u64, "B"),
            RawDocument::new(vec!["f".into()], 3u64, "C"),
        ];
        let config = BuildConfig {
            source: None,
            document_min_wc: 1,
            document_max_wc: 5,
            budget: 100,
        };
        build_corpus(&paths, VecSource::new("mem", docs), &config).expect("build");
        paths
    }

    #[test]
    fn freshly_built_corpus_is_consistent() {
        let dir = TempDir::new().expect("tempdir");
        let report = verify_corpus(&built(dir.path())).expect("verify");
        assert!(report.is_consistent());
        assert_eq!((report.lines, report.entries), (3, 3));
    }

    #[test]
    fn drift_is_reported_per_category() {
        let dir = TempDir::new().expect("tempdir");
        let paths = built(dir.path());
        fs::write(paths.text_path(), "a b x\nç d e\nf\n").expect("edit");

        let report = verify_corpus(&paths).expect("verify");
        assert!(!report.is_consistent());
        assert_eq!(report.line.count, 0);
        assert_eq!(report.wc.count, 1);
        assert_eq!(report.wc.first[0], Mismatch { entry: 0, expected: 3, found: 2 });
        assert_eq!(report.byte.count, 2);
        assert_eq!(report.byte.first[0].entry, 1);
    }

    #[test]
    fn extra_lines_are_counted() {
        let dir = TempDir::new().expect("tempdir");
        let paths = built(dir.path());
        let mut text = fs::read_to_string(paths.text_path()).expect("read");
        text.push_str("stray line\n");
        fs::write(paths.text_path(), text).expect("append");

        let report = verify_corpus(&paths).expect("verify");
        assert_eq!((report.lines, report.entries), (4, 3));
        assert!(!report.is_consistent());
    }
}
