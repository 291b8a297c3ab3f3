//! One complete run: config and prices in, walk-forward result out.

use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use arl_core::engine::Engine;

use crate::config::{RunConfig, RunId};
use crate::data_loader::LoadedPrices;
use crate::metrics::PerformanceSummary;
use crate::walk_forward::{run_walk_forward, WalkForwardReport};

/// Provenance of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub source: String,
    pub dataset_hash: String,
    pub prices: usize,
    pub skipped_lines: usize,
}

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    pub config: RunConfig,
    pub report: WalkForwardReport,
    pub summary: PerformanceSummary,
    pub metadata: RunMetadata,
}

impl RunResult {
    pub fn final_weights(&self) -> &[f64] {
        self.report
            .folds
            .last()
            .map_or(&[][..], |f| f.weights.as_slice())
    }
}

/// Build an engine from `config` and walk it forward over `data`.
pub fn run(config: &RunConfig, data: &LoadedPrices) -> Result<RunResult> {
    config.validate().context("invalid run configuration")?;
    let run_id = config.run_id();
    let timestamp = Utc::now();
    let started = Instant::now();

    tracing::info!(
        run_id = %run_id,
        prices = data.prices.len(),
        window_size = config.engine.window_size,
        policy = ?config.engine.risk_policy,
        "starting run"
    );

    let mut engine =
        Engine::new(config.engine.clone()).context("failed to construct engine")?;
    let report = run_walk_forward(&mut engine, &data.prices, &config.walk_forward)
        .with_context(|| format!("walk-forward failed for run {run_id}"))?;
    let summary = report.summary();

    let duration_secs = started.elapsed().as_secs_f64();
    tracing::info!(
        run_id = %run_id,
        folds = report.folds.len(),
        final_profit = summary.final_profit,
        sharpe = summary.sharpe,
        max_drawdown = summary.max_drawdown.value,
        duration_secs,
        "run complete"
    );

    Ok(RunResult {
        run_id,
        config: config.clone(),
        report,
        summary,
        metadata: RunMetadata {
            timestamp,
            duration_secs,
            source: data.source.display().to_string(),
            dataset_hash: data.dataset_hash.clone(),
            prices: data.prices.len(),
            skipped_lines: data.skipped,
        },
    })
}
