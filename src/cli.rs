//! CLI argument parsing for corpus construction and maintenance.
//!
//! The CLI is thin: each subcommand resolves paths and config, then hands off
//! to one core operation.
use crate::bias::{DEFAULT_BIAS_TOOL, DEFAULT_EMBEDDING_DIR, DEFAULT_RESULTS_DIR};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "cidx",
    version,
    about = "Build, sample, and repair line-indexed text corpora",
    after_help = "Examples:\n  cidx build dump.jsonl corpora/simplewikiselect\n  cidx sample corpora/nytselect.txt -r 0.2\n  cidx repair corpora/nytselect.txt\n  cidx verify corpora/nytselect.txt\n  cidx bias vectors-C0-V20.bin --corpus corpora/simplewikiselect.txt --dry-run",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Build(BuildArgs),
    Sample(SampleArgs),
    Repair(RepairArgs),
    Verify(VerifyArgs),
    Bias(BiasArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON record per line: {"tokens": [...], "id": ..., "title": ...}
    Jsonl,
    /// One document per line, tokenized on whitespace
    Text,
}

/// Build command inputs.
#[derive(Parser, Debug)]
#[command(about = "Filter raw documents into a corpus with a positional index")]
pub struct BuildArgs {
    /// Raw document input
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output base name (`.txt`, `.meta.json`, `.meta.txt` are appended)
    #[arg(value_name = "OUT")]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = InputFormat::Jsonl)]
    pub format: InputFormat,

    /// JSON build config; flags below override its values
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Label recorded as the metadata source (defaults to the input file name)
    #[arg(long)]
    pub source: Option<String>,

    /// Minimum words per document (inclusive)
    #[arg(long, value_name = "N")]
    pub min_wc: Option<u64>,

    /// Maximum words per document (inclusive)
    #[arg(long, value_name = "N")]
    pub max_wc: Option<u64>,

    /// Stop once accepted words reach this total
    #[arg(long, value_name = "N")]
    pub budget: Option<u64>,

    /// Rebuild even if the output corpus already exists
    #[arg(long)]
    pub rebuild: bool,
}

/// Sample command inputs.
#[derive(Parser, Debug)]
#[command(about = "Write a deterministic subset of a corpus")]
pub struct SampleArgs {
    /// Source corpus (base name or any of its files)
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Output corpus; defaults to `<base>_subset_<ratio>.txt`
    #[arg(value_name = "NEW_CORPUS")]
    pub new_corpus: Option<PathBuf>,

    /// Approximate fraction of documents to keep, in [0, 1]
    #[arg(short, long, default_value_t = 0.2)]
    pub ratio: f64,

    /// Accepted for compatibility; membership does not depend on it
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Repair command inputs.
#[derive(Parser, Debug)]
#[command(about = "Recompute index byte offsets from the corpus text")]
pub struct RepairArgs {
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Overwrite the metadata without keeping a `.bak` copy
    #[arg(long)]
    pub no_backup: bool,
}

/// Verify command inputs.
#[derive(Parser, Debug)]
#[command(about = "Check a corpus against its index without modifying it")]
pub struct VerifyArgs {
    #[arg(value_name = "CORPUS")]
    pub corpus: PathBuf,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Bias command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run the external differential-bias tool against a corpus")]
pub struct BiasArgs {
    /// Embedding file, or an embedding code looked up in --embedding-dir
    #[arg(value_name = "EMBEDDING")]
    pub embedding: PathBuf,

    /// Directory searched for `vectors-<code>*` when EMBEDDING is a code
    #[arg(long, value_name = "DIR", default_value = DEFAULT_EMBEDDING_DIR)]
    pub embedding_dir: PathBuf,

    /// Results file; bare names land in --results-dir
    #[arg(value_name = "RESULTS")]
    pub results: Option<PathBuf>,

    /// Corpus the embedding was trained on
    #[arg(short, long, value_name = "CORPUS")]
    pub corpus: PathBuf,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// First document to process
    #[arg(short, long, default_value_t = 1)]
    pub first: u64,

    /// Last document to process
    #[arg(short, long)]
    pub last: Option<u64>,

    /// Word sets, comma separated (`1,2` or `[1, 2]`)
    #[arg(short, long)]
    pub wordset: Option<String>,

    /// Replace an existing results file instead of numbering a new one
    #[arg(long)]
    pub overwrite: bool,

    /// Tool command line (program plus leading arguments)
    #[arg(long, env = "CIDX_BIAS_TOOL", default_value = DEFAULT_BIAS_TOOL)]
    pub tool: String,

    /// Print the command without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        RootArgs::command().debug_assert();
    }

    #[test]
    fn sample_defaults_and_seed() {
        let args = RootArgs::try_parse_from(["cidx", "sample", "c.txt", "-s", "7"]).expect("parse");
        let Command::Sample(sample) = args.command else {
            panic!("expected sample");
        };
        assert_eq!(sample.ratio, 0.2);
        assert_eq!(sample.seed, Some(7));
        assert!(sample.new_corpus.is_none());
    }

    #[test]
    fn build_flags_parse() {
        let args = RootArgs::try_parse_from([
            "cidx", "build", "in.txt", "out/base", "--format", "text", "--min-wc", "3", "--rebuild",
        ])
        .expect("parse");
        let Command::Build(build) = args.command else {
            panic!("expected build");
        };
        assert_eq!(build.format, InputFormat::Text);
        assert_eq!(build.min_wc, Some(3));
        assert!(build.rebuild);
    }
}
