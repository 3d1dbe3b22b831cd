//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use serde_json::json;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch workspace that runs the `cidx` binary against files it owns.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a JSON Lines raw-document dump; each document is `wc` tokens.
    pub fn write_dump(&self, rel: &str, word_counts: &[usize]) -> PathBuf {
        let mut text = String::new();
        for (i, wc) in word_counts.iter().enumerate() {
            let tokens: Vec<String> = (0..*wc).map(|n| format!("tok{}", n % 13)).collect();
            let record = json!({
                "tokens": tokens,
                "id": format!("{}", 1000 + i),
                "title": format!("Article {i}"),
            });
            text.push_str(&record.to_string());
            text.push('\n');
        }
        let path = self.path(rel);
        std::fs::write(&path, text).expect("write dump");
        path
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_cidx"))
            .args(args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env_remove("CIDX_BIAS_TOOL")
            .output()
            .expect("spawn cidx")
    }

    /// Run and require success, returning stdout.
    pub fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "cidx {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.path(rel)).unwrap_or_else(|e| panic!("read {rel}: {e}"))
    }

    pub fn read_json(&self, rel: &str) -> serde_json::Value {
        serde_json::from_slice(&self.read(rel)).expect("parse json")
    }
}

/// Start offset of every line of `text`.
pub fn offsets_of(text: &[u8]) -> Vec<u64> {
    let mut offsets = Vec::new();
    let mut position = 0u64;
    for line in text.split_inclusive(|b| *b == b'\n') {
        offsets.push(position);
        position += line.len() as u64;
    }
    offsets
}
