//! Analyzer configuration, read from TOML.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default longest side an image is scaled down to before scoring.
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// Tunable behavior of `LawnAnalyzer` and `BatchAnalyzer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Images larger than this on either side are resized, keeping aspect ratio.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Attach the vision advisor record to file analyses.
    #[serde(default = "default_true")]
    pub include_ai_vision: bool,

    /// Seed for the placeholder outputs. Unset draws from OS entropy.
    #[serde(default)]
    pub synthetic_seed: Option<u64>,

    /// Concurrent analyses in a batch. Unset uses the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_true() -> bool {
    true
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            include_ai_vision: true,
            synthetic_seed: None,
            workers: None,
        }
    }
}

impl AnalyzerConfig {
    /// Load config from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::Invalid("max_dimension must be at least 1".to_string()));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Batch concurrency: `workers` if set, otherwise the CPU count.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}
