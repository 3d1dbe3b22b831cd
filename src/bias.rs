//! Bridge to the external differential-bias tool.
//!
//! The tool itself is opaque; this module only locates a consistent corpus,
//! picks a results path that does not clobber earlier runs, and assembles the
//! command line.
use crate::corpus::{ensure_line_count, CorpusPaths};
use crate::metadata::CorpusMetadata;
use crate::util::{ensure_parent_dir, next_numbered_path};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const DEFAULT_BIAS_TOOL: &str = "julia";
pub const DEFAULT_RESULTS_DIR: &str = "results/diff_bias";
pub const DEFAULT_EMBEDDING_DIR: &str = "embeddings";
const EMBEDDING_PREFIX: &str = "vectors-";

#[derive(Debug, Clone)]
pub struct BiasRequest {
    /// Embedding file, or a code such as `C0-V20` resolved in `embedding_dir`.
    pub embedding: PathBuf,
    pub embedding_dir: PathBuf,
    pub corpus: CorpusPaths,
    pub results: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub wordset: Option<Vec<String>>,
    pub first: u64,
    pub last: Option<u64>,
    pub overwrite: bool,
    /// Program plus leading arguments, shell-quoted (`julia --project=. diff.jl`).
    pub tool: String,
}

/// Fully resolved invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiasCommand {
    pub program: String,
    pub args: Vec<String>,
    pub results: PathBuf,
}

impl BiasCommand {
    pub fn display(&self) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args.iter().cloned());
        shell_words::join(words)
    }
}

/// Parse `a,b`, `[a, b]` or `(a,b)` into word-set names.
pub fn parse_wordset(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')'])
        .split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Embedding code used in result names: the file stem without `vectors-`.
pub fn embedding_code(embedding: &Path) -> Result<String> {
    let stem = embedding
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("embedding path {} has no file name", embedding.display()))?;
    Ok(stem.strip_prefix(EMBEDDING_PREFIX).unwrap_or(&stem).to_string())
}

/// Resolve an embedding argument: an existing file is used as is, anything
/// else is treated as a code that must match exactly one `vectors-<code>*`
/// file in `dir`.
pub fn expand_embedding(embedding: &Path, dir: &Path) -> Result<PathBuf> {
    if embedding.is_file() {
        return Ok(embedding.to_path_buf());
    }
    let raw = embedding.to_string_lossy();
    let code = raw.strip_prefix(EMBEDDING_PREFIX).unwrap_or(&raw);
    let prefix = format!("{EMBEDDING_PREFIX}{code}");

    let mut found = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
            let entry = entry.with_context(|| format!("list {}", dir.display()))?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                found.push(entry.path());
            }
        }
    }
    found.sort();
    match found.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(anyhow!(
            "embedding {} not found (no {prefix}* in {})",
            embedding.display(),
            dir.display()
        )),
        many => Err(anyhow!(
            "embedding code {code} is ambiguous in {}: {}",
            dir.display(),
            many.iter()
                .filter_map(|path| path.file_name())
                .map(|name| name.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Pick the results path: explicit or derived, numbered past collisions
/// unless overwriting.
pub fn resolve_results(request: &BiasRequest, embedding: &Path) -> Result<PathBuf> {
    let path = match &request.results {
        Some(results) if results.parent().is_some_and(|p| !p.as_os_str().is_empty()) => {
            results.clone()
        }
        Some(results) => request.results_dir.join(results),
        None => {
            let mut name = embedding_code(embedding)?;
            if let Some(words) = request.wordset.as_ref().filter(|w| !w.is_empty()) {
                name.push('_');
                name.push_str(&words.join("_"));
            }
            name.push_str(".csv");
            request.results_dir.join(name)
        }
    };
    if request.overwrite {
        Ok(path)
    } else {
        next_numbered_path(&path)
    }
}

/// Check the corpus and assemble the command without running it.
pub fn build_command(request: &BiasRequest) -> Result<BiasCommand> {
    request.corpus.require_existing()?;
    let metadata = CorpusMetadata::load(&request.corpus.meta_json_path())?;
    ensure_line_count(&request.corpus.text_path(), metadata.index.len())?;
    let embedding = expand_embedding(&request.embedding, &request.embedding_dir)?;

    let mut words = shell_words::split(&request.tool)
        .with_context(|| format!("parse bias tool command {:?}", request.tool))?;
    if words.is_empty() {
        return Err(anyhow!("bias tool command is empty"));
    }
    let program = words.remove(0);

    let results = resolve_results(request, &embedding)?;
    let mut args = words;
    args.push(embedding.display().to_string());
    args.push(request.corpus.text_path().display().to_string());
    args.push(results.display().to_string());
    args.push("--first".to_string());
    args.push(request.first.to_string());
    if let Some(words) = request.wordset.as_ref().filter(|w| !w.is_empty()) {
        args.push("--wordset".to_string());
        args.push(words.join(","));
    }
    if let Some(last) = request.last {
        args.push("--last".to_string());
        args.push(last.to_string());
    }
    Ok(BiasCommand {
        program,
        args,
        results,
    })
}

/// Run the tool to completion; a non-zero exit is an error.
pub fn run_command(command: &BiasCommand) -> Result<()> {
    let program = which::which(&command.program)
        .with_context(|| format!("locate bias tool {}", command.program))?;
    ensure_parent_dir(&command.results)?;
    tracing::info!(command = %command.display(), "running bias tool");
    let status = Command::new(&program)
        .args(&command.args)
        .status()
        .with_context(|| format!("spawn {}", program.display()))?;
    if !status.success() {
        return Err(anyhow!(
            "bias tool {} failed: exit={:?}",
            command.program,
            status.code()
        ));
    }
    tracing::info!(results = %command.results.display(), "bias tool finished");
    Ok(())
}
