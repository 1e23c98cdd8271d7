//! CLI configuration loading and merging.
//!
//! Precedence, highest first:
//! 1. CLI arguments (applied by each command)
//! 2. Environment variables
//! 3. The config file (`--config`, or `./kitha.toml` when present)
//! 4. Defaults

use anyhow::{Context, Result};
use kitha_dataset::AssemblyConfig;
use kitha_export::ExportConfig;
use kitha_model::TrainConfig;
use kitha_serve::ServeConfig;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "kitha.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KithaConfig {
    #[serde(default)]
    pub assembly: AssemblyConfig,
    #[serde(default)]
    pub train: TrainConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

impl KithaConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration")
    }

    /// An explicit path must exist; the implicit `kitha.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.is_file() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("In {}", path.display()))
    }

    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.assembly.apply_env(&lookup).context("Invalid assembly environment override")?;
        self.serve = self.serve.apply_env(&lookup).context("Invalid serve environment override")?;
        Ok(self)
    }
}
