//! ARL Runner: everything around the core engine.
//!
//! This crate builds on `arl-core` to provide:
//! - Price loading from headed CSV and tick `.dat` files
//! - TOML run configuration with content-addressed run ids
//! - Rolling walk-forward train/test driver
//! - Performance statistics (drawdown, segments, directional accuracy)
//! - CSV and JSON artifact export

pub mod artifacts;
pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod walk_forward;

pub use artifacts::{ArtifactManager, ArtifactPaths, RunManifest};
pub use config::{ConfigError, DataConfig, RunConfig, RunId};
pub use data_loader::{load_prices, LoadError, LoadOptions, LoadedPrices, PriceFormat};
pub use metrics::{MaxDrawdown, PerformanceSummary, SegmentStats};
pub use runner::{run, RunMetadata, RunResult};
pub use walk_forward::{
    create_folds, run_walk_forward, FoldResult, FoldSpec, ResetPolicy, WalkForwardConfig,
    WalkForwardError, WalkForwardReport,
};
