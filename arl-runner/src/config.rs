//! Serializable run configuration, loaded from TOML.
//!
//! ```toml
//! [engine]
//! window_size = 13
//! seed = 7
//!
//! [engine.risk_policy]
//! type = "price_stop"
//! basis_scale = 0.0001
//!
//! [engine.search]
//! samples_per_field = 15
//! fields = "reduced"
//!
//! [walk_forward]
//! train_len = 2000
//! test_len = 500
//! update_threshold = 1000
//! ```
//!
//! Every section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use arl_core::engine::{EngineConfig, EngineError};

use crate::data_loader::PriceFormat;
use crate::walk_forward::WalkForwardConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid engine config: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid walk-forward config: {0}")]
    WalkForward(String),
}

/// How prices are read from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Input format; guessed from the file extension when unset.
    pub format: Option<PriceFormat>,
    /// CSV column holding the price. When unset a `price` column is used if
    /// present, otherwise the last column.
    pub price_column: Option<String>,
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub engine: EngineConfig,
    pub walk_forward: WalkForwardConfig,
    pub data: DataConfig,
}

impl RunConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.walk_forward
            .validate()
            .map_err(|e| ConfigError::WalkForward(e.to_string()))
    }

    /// Deterministic hash of the configuration.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        // Plain data with string keys: serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        let hash = blake3::hash(json.as_bytes());
        hash.to_hex()[..16].to_string()
    }
}
