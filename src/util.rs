use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const MAX_SIBLING_PROBES: u32 = 10_000;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

/// Create the parent directory of `path` if it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    Ok(())
}

/// True when both paths exist and resolve to the same file, whatever their
/// spelling (`..` segments, relative vs absolute, symlinks).
pub fn same_file(a: &Path, b: &Path) -> Result<bool> {
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    let a = a
        .canonicalize()
        .with_context(|| format!("resolve {}", a.display()))?;
    let b = b
        .canonicalize()
        .with_context(|| format!("resolve {}", b.display()))?;
    Ok(a == b)
}

/// Append a raw suffix to a path's final component (`a.meta.json` + `.bak`).
pub fn append_to_file_name(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Find the first unused sibling name of the form `<name><suffix>`,
/// `<name><suffix>.01`, `<name><suffix>.02`, ...
///
/// Only probes the filesystem; nothing is created.
pub fn next_unused_sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
    let first = append_to_file_name(path, suffix);
    if !first.exists() {
        return Ok(first);
    }
    for n in 1..MAX_SIBLING_PROBES {
        let candidate = append_to_file_name(&first, &format!(".{n:02}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(anyhow!(
        "no unused sibling name for {} after {MAX_SIBLING_PROBES} probes",
        first.display()
    ))
}

/// Advance a colliding path by a numeric stem suffix: `r.csv` -> `r.01.csv`,
/// `r.01.csv` -> `r.02.csv`, until the name is unused.
pub fn next_numbered_path(path: &Path) -> Result<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_SIBLING_PROBES {
        if !current.exists() {
            return Ok(current);
        }
        current = bump_stem_number(&current);
    }
    Err(anyhow!(
        "no unused numbered name for {} after {MAX_SIBLING_PROBES} probes",
        path.display()
    ))
}

fn bump_stem_number(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    let next_stem = match stem.rsplit_once('.') {
        Some((head, tail)) => match tail.parse::<u32>() {
            Ok(n) => format!("{head}.{:02}", n + 1),
            Err(_) => format!("{stem}.01"),
        },
        None => format!("{stem}.01"),
    };
    match path.extension() {
        Some(ext) => path.with_file_name(format!("{next_stem}.{}", ext.to_string_lossy())),
        None => path.with_file_name(next_stem),
    }
}
