//! Assembly configuration.

use crate::error::{DatasetError, DatasetResult};
use crate::record::MIN_RECORD_CHARS;
use crate::segment::{DEFAULT_MAX_LENGTH, MIN_CHUNK_CHARS};
use crate::source::catalog::builtin_sources;
use crate::source::{HubSettings, SourceSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Fill target for a supplemental group when no cap is configured.
pub const DEFAULT_SUPPLEMENTAL_TARGET: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Directory the record sets and `stats.json` are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Cap on records taken per source group.
    #[serde(default)]
    pub max_samples: Option<usize>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_min_record_chars")]
    pub min_record_chars: usize,
    /// Seed for balancing and splitting; unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub max_per_class: Option<usize>,
    #[serde(default)]
    pub hub: HubSettings,
    #[serde(default = "builtin_sources")]
    pub sources: Vec<SourceSpec>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

fn default_min_chunk_chars() -> usize {
    MIN_CHUNK_CHARS
}

fn default_min_record_chars() -> usize {
    MIN_RECORD_CHARS
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_samples: None,
            max_length: default_max_length(),
            min_chunk_chars: default_min_chunk_chars(),
            min_record_chars: default_min_record_chars(),
            seed: None,
            max_per_class: None,
            hub: HubSettings::default(),
            sources: builtin_sources(),
        }
    }
}

impl AssemblyConfig {
    pub fn from_toml_str(contents: &str) -> DatasetResult<Self> {
        toml::from_str(contents).map_err(|e| DatasetError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> DatasetResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Overlay `KITHA_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> DatasetResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("KITHA_DATA_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(n) = parse_var(&lookup, "KITHA_MAX_SAMPLES")? {
            self.max_samples = Some(n);
        }
        if let Some(n) = parse_var(&lookup, "KITHA_MAX_LENGTH")? {
            self.max_length = n;
        }
        if let Some(seed) = parse_var(&lookup, "KITHA_SEED")? {
            self.seed = Some(seed);
        }
        if let Some(endpoint) = lookup("KITHA_HUB_ENDPOINT") {
            self.hub.endpoint = endpoint;
        }
        Ok(())
    }

    pub fn validate(&self) -> DatasetResult<()> {
        if self.max_length == 0 {
            return Err(DatasetError::Config("max_length must be positive".to_string()));
        }
        if self.min_chunk_chars > self.max_length {
            return Err(DatasetError::Config(format!(
                "min_chunk_chars ({}) exceeds max_length ({})",
                self.min_chunk_chars, self.max_length
            )));
        }
        if self.max_samples == Some(0) {
            return Err(DatasetError::Config("max_samples must be positive".to_string()));
        }
        Ok(())
    }

    /// Records a supplemental source's group must stay below to be fetched.
    #[must_use]
    pub fn supplemental_target(&self) -> usize {
        self.max_samples.unwrap_or(DEFAULT_SUPPLEMENTAL_TARGET)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> DatasetResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| DatasetError::Config(format!("{key}={raw}: {e}")))
        })
        .transpose()
}
