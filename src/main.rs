use anyhow::{anyhow, Result};
use clap::Parser;
use std::env;

mod bias;
mod cli;
mod config;
mod corpus;
mod error;
mod filter;
mod metadata;
mod repair;
mod sample;
mod source;
mod util;
mod verify;

use crate::cli::{BiasArgs, BuildArgs, Command, InputFormat, RepairArgs, RootArgs, SampleArgs, VerifyArgs};
use crate::config::{BuildConfig, BuildOverrides};
use crate::corpus::CorpusPaths;
use crate::source::{JsonLinesSource, TextLineSource};
use crate::util::{display_path, same_file};

fn main() -> Result<()> {
    let cli = RootArgs::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => cmd_build(args),
        Command::Sample(args) => cmd_sample(args),
        Command::Repair(args) => cmd_repair(args),
        Command::Verify(args) => cmd_verify(args),
        Command::Bias(args) => cmd_bias(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let paths = CorpusPaths::new(&args.out);
    let text_path = paths.text_path();
    if text_path.exists() && !args.rebuild {
        println!(
            "{} already exists. To forcibly remake the corpus, use --rebuild.",
            shown(&text_path)
        );
        return Ok(());
    }

    util::ensure_parent_dir(&text_path)?;
    for output in [text_path.clone(), paths.meta_json_path(), paths.meta_txt_path()] {
        if same_file(&args.input, &output)? {
            return Err(anyhow!(
                "refusing to build {} over its own input",
                shown(&output)
            ));
        }
    }

    let config = BuildConfig::resolve(
        args.config.as_deref(),
        BuildOverrides {
            source: args.source,
            document_min_wc: args.min_wc,
            document_max_wc: args.max_wc,
            budget: args.budget,
        },
    )?;
    let metadata = match args.format {
        InputFormat::Jsonl => {
            filter::build_corpus(&paths, JsonLinesSource::open(&args.input)?, &config)?
        }
        InputFormat::Text => {
            filter::build_corpus(&paths, TextLineSource::open(&args.input)?, &config)?
        }
    };
    println!(
        "Selected {} documents ({} words) into {}.",
        metadata.num_documents,
        metadata.num_words,
        shown(&text_path)
    );
    Ok(())
}

fn cmd_sample(args: SampleArgs) -> Result<()> {
    if let Some(seed) = args.seed {
        tracing::warn!(seed, "--seed has no effect; sample membership is keyed by line number");
    }
    let source = CorpusPaths::new(&args.corpus);
    let output = match &args.new_corpus {
        Some(path) => CorpusPaths::new(path),
        None => sample::default_output(&source, sample::validate_ratio(args.ratio)?),
    };
    let sampled = sample::sample_corpus(&source, &output, args.ratio)?;
    println!(
        "{} documents written to {}.",
        sampled.num_documents,
        shown(&output.text_path())
    );
    Ok(())
}

fn cmd_repair(args: RepairArgs) -> Result<()> {
    let paths = CorpusPaths::new(&args.corpus);
    let report = repair::repair_offsets(&paths, !args.no_backup)?;
    if report.changed == 0 {
        println!(
            "{} entries already consistent; {} unchanged.",
            report.entries,
            shown(&paths.meta_json_path())
        );
        return Ok(());
    }
    println!(
        "Repaired {} of {} byte offsets in {}.",
        report.changed,
        report.entries,
        shown(&paths.meta_json_path())
    );
    if let Some(backup) = &report.backup {
        println!("Original saved to {}.", shown(backup));
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs) -> Result<()> {
    let paths = CorpusPaths::new(&args.corpus);
    let report = verify::verify_corpus(&paths)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("lines: {}", report.lines);
        println!("entries: {}", report.entries);
        println!("line mismatches: {}", report.line.count);
        println!("byte mismatches: {}", report.byte.count);
        println!("wc mismatches: {}", report.wc.count);
        for (label, set) in [("line", &report.line), ("byte", &report.byte), ("wc", &report.wc)] {
            for mismatch in &set.first {
                println!(
                    "  {label} entry {}: expected {}, found {}",
                    mismatch.entry, mismatch.expected, mismatch.found
                );
            }
        }
    }
    if !report.is_consistent() {
        return Err(anyhow!(
            "{} is inconsistent with its index",
            shown(&paths.text_path())
        ));
    }
    Ok(())
}

fn cmd_bias(args: BiasArgs) -> Result<()> {
    let request = bias::BiasRequest {
        embedding: args.embedding,
        embedding_dir: args.embedding_dir,
        corpus: CorpusPaths::new(&args.corpus),
        results: args.results,
        results_dir: args.results_dir,
        wordset: args.wordset.as_deref().map(bias::parse_wordset),
        first: args.first,
        last: args.last,
        overwrite: args.overwrite,
        tool: args.tool,
    };
    let command = bias::build_command(&request)?;
    println!("{}", command.display());
    if args.dry_run {
        return Ok(());
    }
    bias::run_command(&command)?;
    println!("Wrote bias results to {}", shown(&command.results));
    Ok(())
}

fn shown(path: &std::path::Path) -> String {
    let cwd = env::current_dir().ok();
    display_path(path, cwd.as_deref())
}
