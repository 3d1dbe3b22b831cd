//! Byte-offset repair for an index that drifted from its corpus text.
//!
//! Lines and index entries are paired positionally in one forward pass; only
//! `byte` is rewritten. Content or line-count drift is not repaired.
use crate::corpus::{line_offsets, CorpusPaths};
use crate::error::CorpusError;
use crate::metadata::{CorpusMetadata, IndexEntry};
use crate::util::next_unused_sibling;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub entries: usize,
    pub changed: usize,
    /// Where the original `.meta.json` was copied, when it was rewritten.
    pub backup: Option<PathBuf>,
}

/// Overwrite each entry's `byte` with the matching offset; returns how many changed.
pub fn repair_index(index: &mut [IndexEntry], offsets: &[u64]) -> usize {
    let mut changed = 0;
    for (entry, &offset) in index.iter_mut().zip(offsets) {
        if entry.byte != offset {
            entry.byte = offset;
            changed += 1;
        }
    }
    changed
}

/// Recompute `byte` for every entry of `paths` and rewrite the metadata in place.
///
/// Nothing is written when the offsets already agree. With `backup`, the
/// original structured file is first copied to the next unused
/// `<name>.bak[.NN]` sibling.
pub fn repair_offsets(paths: &CorpusPaths, backup: bool) -> Result<RepairReport> {
    paths.require_existing()?;
    let meta_path = paths.meta_json_path();
    let text_path = paths.text_path();
    let mut metadata = CorpusMetadata::load(&meta_path)?;
    let offsets = line_offsets(&text_path)?;
    if offsets.len() != metadata.index.len() {
        return Err(CorpusError::LineCountMismatch {
            corpus: text_path,
            lines: offsets.len() as u64,
            entries: metadata.index.len() as u64,
        }
        .into());
    }

    let changed = repair_index(&mut metadata.index, &offsets);
    let mut report = RepairReport {
        entries: metadata.index.len(),
        changed,
        backup: None,
    };
    if changed == 0 {
        tracing::info!(entries = report.entries, metadata = %meta_path.display(), "offsets already consistent");
        return Ok(report);
    }

    if backup {
        let backup_path = next_unused_sibling(&meta_path, BACKUP_SUFFIX)?;
        fs::copy(&meta_path, &backup_path).with_context(|| {
            format!("back up {} to {}", meta_path.display(), backup_path.display())
        })?;
        tracing::debug!(backup = %backup_path.display(), "backed up metadata");
        report.backup = Some(backup_path);
    }
    metadata.write(paths)?;
    tracing::info!(
        entries = report.entries,
        changed,
        metadata = %meta_path.display(),
        "repaired byte offsets"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SourceId;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_fixture(dir: &Path, lines: &[&str]) -> CorpusPaths {
        let paths = CorpusPaths::new(dir.join("wiki"));
        let mut text = String::new();
        let mut index = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            index.push(IndexEntry {
                id: SourceId::Number(1000 + i as u64),
                name: format!("Article {i}"),
                wc: line.split(' ').count() as u64,
                line: i as u64,
                byte: text.len() as u64,
            });
            text.push_str(line);
            text.push('\n');
        }
        fs::write(paths.text_path(), text).expect("write text");
        CorpusMetadata::new("dump", Some((1, 50)), index)
            .write(&paths)
            .expect("write metadata");
        paths
    }

    #[test]
    fn consistent_index_is_left_untouched() {
        let dir = TempDir::new().expect("tempdir");
        let paths = write_fixture(dir.path(), &["alpha beta", "gämma", "delta epsilon zeta"]);
        let before = fs::read(paths.meta_json_path()).expect("read");

        let report = repair_offsets(&paths, true).expect("repair");
        assert_eq!(report.changed, 0);
        assert_eq!(report.entries, 3);
        assert!(report.backup.is_none());
        assert_eq!(fs::read(paths.meta_json_path()).expect("reread"), before);
        assert!(!dir.path().join("wiki.meta.json.bak").exists());
    }

    #[test]
    fn corrupted_offset_is_restored_alone() {
        let dir = TempDir::new().expect("tempdir");
        let paths = write_fixture(dir.path(), &["alpha beta", "gämma", "delta epsilon zeta"]);
        let original = CorpusMetadata::load(&paths.meta_json_path()).expect("load");
        let pristine = fs::read(paths.meta_json_path()).expect("read");

        let mut corrupted = original.clone();
        corrupted.index[1].byte = 999;
        corrupted.write(&paths).expect("corrupt");

        let report = repair_offsets(&paths, true).expect("repair");
        assert_eq!(report.changed, 1);
        let repaired = CorpusMetadata::load(&paths.meta_json_path()).expect("reload");
        assert_eq!(repaired, original);
        assert_eq!(fs::read(paths.meta_json_path()).expect("reread"), pristine);

        let backup = report.backup.expect("backup taken");
        assert_eq!(backup, dir.path().join("wiki.meta.json.bak"));
        let saved = CorpusMetadata::load(&backup).expect("backup loads");
        assert_eq!(saved.index[1].byte, 999);
    }

    #[test]
    fn external_edit_shifts_following_offsets() {
        let dir = TempDir::new().expect("tempdir");
        let paths = write_fixture(dir.path(), &["one two", "three", "four five"]);
        fs::write(paths.text_path(), "one two\nthree ≠ edited\nfour five\n").expect("edit");

        let report = repair_offsets(&paths, false).expect("repair");
        assert_eq!(report.changed, 1);
        assert!(report.backup.is_none());
        let repaired = CorpusMetadata::load(&paths.meta_json_path()).expect("reload");
        let bytes: Vec<u64> = repaired.index.iter().map(|e| e.byte).collect();
        assert_eq!(bytes, vec![0, 8, 8 + "three ≠ edited\n".len() as u64]);
        assert_eq!(repaired.index[1].wc, 1);
        assert_eq!(repaired.index[1].name, "Article 1");
        assert_eq!(repaired.index[1].line, 1);
    }

    #[test]
    fn repeated_repairs_never_overwrite_backups() {
        let dir = TempDir::new().expect("tempdir");
        let paths = write_fixture(dir.path(), &["a", "b"]);
        for n in 0..3u64 {
            let mut metadata = CorpusMetadata::load(&paths.meta_json_path()).expect("load");
            metadata.index[1].byte = 100 + n;
            metadata.write(&paths).expect("corrupt");
            repair_offsets(&paths, true).expect("repair");
        }
        for name in ["wiki.meta.json.bak", "wiki.meta.json.bak.01", "wiki.meta.json.bak.02"] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn line_count_mismatch_is_not_repaired() {
        let dir = TempDir::new().expect("tempdir");
        let paths = write_fixture(dir.path(), &["a", "b"]);
        fs::write(paths.text_path(), "a\nb\nc\n").expect("append");
        let before = fs::read(paths.meta_json_path()).expect("read");

        let err = repair_offsets(&paths, true).expect_err("mismatch");
        assert!(matches!(
            err.downcast_ref::<CorpusError>(),
            Some(CorpusError::LineCountMismatch { lines: 3, entries: 2, .. })
        ));
        assert_eq!(fs::read(paths.meta_json_path()).expect("reread"), before);
    }
}
