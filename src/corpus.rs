//! Corpus file layout and raw line scanning.
//!
//! A corpus is three files sharing one base name: the text (`.txt`), the
//! structured index (`.meta.json`) and the flat summary (`.meta.txt`). Lines
//! are read as raw bytes so offsets are exact regardless of line endings.
use crate::error::CorpusError;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const TEXT_SUFFIX: &str = ".txt";
pub const META_JSON_SUFFIX: &str = ".meta.json";
pub const META_TXT_SUFFIX: &str = ".meta.txt";

/// Typed paths for one corpus unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusPaths {
    base: PathBuf,
}

impl CorpusPaths {
    /// Accept a base name or any of the three member files.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        let base = [META_JSON_SUFFIX, META_TXT_SUFFIX, TEXT_SUFFIX]
            .iter()
            .find_map(|suffix| raw.strip_suffix(*suffix))
            .unwrap_or(&*raw)
            .to_string();
        Self {
            base: PathBuf::from(base),
        }
    }

    pub fn text_path(&self) -> PathBuf {
        self.with_suffix(TEXT_SUFFIX)
    }

    pub fn meta_json_path(&self) -> PathBuf {
        self.with_suffix(META_JSON_SUFFIX)
    }

    pub fn meta_txt_path(&self) -> PathBuf {
        self.with_suffix(META_TXT_SUFFIX)
    }

    /// Base name for a sampled subset: `<base>_subset_<tag>`.
    pub fn subset(&self, ratio_tag: &str) -> Self {
        let mut raw = self.base.clone().into_os_string();
        raw.push(format!("_subset_{ratio_tag}"));
        Self {
            base: PathBuf::from(raw),
        }
    }

    /// Fail with the offending path when the text or structured index is absent.
    pub fn require_existing(&self) -> Result<()> {
        for path in [self.text_path(), self.meta_json_path()] {
            if !path.is_file() {
                return Err(CorpusError::MissingFile { path }.into());
            }
        }
        Ok(())
    }

    /// Best-effort removal of all three member files after a failed write.
    pub fn remove_files(&self) {
        for path in [self.text_path(), self.meta_json_path(), self.meta_txt_path()] {
            if let Err(err) = std::fs::remove_file(&path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %err, "could not remove partial output");
                }
            }
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut raw = self.base.clone().into_os_string();
        raw.push(suffix);
        PathBuf::from(raw)
    }
}

/// Forward-only reader yielding raw corpus lines with their terminators.
pub struct LineScanner {
    reader: BufReader<File>,
    path: PathBuf,
    line: u64,
    buf: Vec<u8>,
}

impl LineScanner {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CorpusError::MissingFile {
                path: path.to_path_buf(),
            }
            .into());
        }
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        Ok(Self {
            reader: BufReader::new(file),
            path: path.to_path_buf(),
            line: 0,
            buf: Vec::new(),
        })
    }

    /// Read the next line including its `\n` (absent only on an unterminated
    /// final line). Returns `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .with_context(|| format!("read {} line {}", self.path.display(), self.line))?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(&self.buf))
    }

    /// Like `next_line`, but rejects lines that are not valid UTF-8.
    pub fn next_text_line(&mut self) -> Result<Option<&str>> {
        let line_no = self.line;
        let path = self.path.clone();
        match self.next_line()? {
            None => Ok(None),
            Some(bytes) => std::str::from_utf8(bytes).map(Some).map_err(|err| {
                CorpusError::malformed(path, format!("line {line_no} is not UTF-8: {err}")).into()
            }),
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

/// Count lines in a corpus file; an unterminated final line counts.
pub fn count_lines(path: &Path) -> Result<u64> {
    let mut scanner = LineScanner::open(path)?;
    while scanner.next_line()?.is_some() {}
    Ok(scanner.lines_read())
}

/// Byte offset of the start of every line, in one forward pass.
pub fn line_offsets(path: &Path) -> Result<Vec<u64>> {
    let mut scanner = LineScanner::open(path)?;
    let mut offsets = Vec::new();
    let mut position = 0u64;
    while let Some(line) = scanner.next_line()? {
        offsets.push(position);
        position += line.len() as u64;
    }
    Ok(offsets)
}

/// Fail unless the corpus has exactly `entries` lines.
pub fn ensure_line_count(path: &Path, entries: usize) -> Result<()> {
    let lines = count_lines(path)?;
    if lines != entries as u64 {
        return Err(CorpusError::LineCountMismatch {
            corpus: path.to_path_buf(),
            lines,
            entries: entries as u64,
        }
        .into());
    }
    Ok(())
}
