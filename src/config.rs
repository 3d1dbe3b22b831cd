//! Corpus build configuration.
//!
//! Defaults match the reference Wikipedia selection; a JSON file may override
//! them and CLI flags override the file.
use crate::error::CorpusError;
use crate::filter::FilterBounds;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_DOCUMENT_MIN_WC: u64 = 200;
pub const DEFAULT_DOCUMENT_MAX_WC: u64 = 10_000;
pub const DEFAULT_BUDGET: u64 = 20_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Label recorded as the metadata `source`; defaults to the input file name.
    pub source: Option<String>,
    pub document_min_wc: u64,
    pub document_max_wc: u64,
    pub budget: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: None,
            document_min_wc: DEFAULT_DOCUMENT_MIN_WC,
            document_max_wc: DEFAULT_DOCUMENT_MAX_WC,
            budget: DEFAULT_BUDGET,
        }
    }
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub source: Option<String>,
    pub document_min_wc: Option<u64>,
    pub document_max_wc: Option<u64>,
    pub budget: Option<u64>,
}

impl BuildConfig {
    /// Parse a config file. Values are checked only once flags are applied,
    /// so a flag can repair an inconsistent file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse build config {}", path.display()))
    }

    /// Resolve the effective config: defaults, then the optional file, then flags.
    pub fn resolve(path: Option<&Path>, overrides: BuildOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(source) = overrides.source {
            config.source = Some(source);
        }
        if let Some(min) = overrides.document_min_wc {
            config.document_min_wc = min;
        }
        if let Some(max) = overrides.document_max_wc {
            config.document_max_wc = max;
        }
        if let Some(budget) = overrides.budget {
            config.budget = budget;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.document_min_wc > self.document_max_wc {
            return Err(CorpusError::InvalidBounds {
                min: self.document_min_wc,
                max: self.document_max_wc,
            }
            .into());
        }
        if self.budget == 0 {
            return Err(anyhow!("word budget must be positive"));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Result<FilterBounds> {
        FilterBounds::new(self.document_min_wc, self.document_max_wc)
    }
}
