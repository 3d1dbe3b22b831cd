//! Typed failure conditions for corpus operations.
//!
//! Most call sites report through `anyhow` with context; these variants cover
//! the conditions a caller may want to match on after downcasting.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("malformed {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error(
        "corpus {} has {lines} lines but its index has {entries} entries",
        corpus.display()
    )]
    LineCountMismatch {
        corpus: PathBuf,
        lines: u64,
        entries: u64,
    },

    #[error("missing file {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("sample ratio {0} is outside [0, 1]")]
    InvalidRatio(f64),

    #[error("document word-count bounds are inverted: min {min} > max {max}")]
    InvalidBounds { min: u64, max: u64 },
}

impl CorpusError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
