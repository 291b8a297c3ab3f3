//! Walk-forward driver: rolling train/test folds over one price history.
//!
//! Fold `k` trains on `[k * step, k * step + train_len)` and then tests on the
//! following `test_len` prices. The test window starts at the last training
//! price so the first out-of-sample return spans the boundary. The final fold
//! may have a shorter test window.
//!
//! The cumulative profit carried between folds is the out-of-sample profit:
//! every training pass starts from it, but only the test pass advances it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arl_core::engine::{Engine, EngineError, EpochReport};
use arl_core::parameters::Parameters;

use crate::metrics::{self, MaxDrawdown, PerformanceSummary};

// ─── Configuration ───────────────────────────────────────────────────

/// What the driver resets between folds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Keep weights, returns, and parameters across folds.
    Never,
    /// Reset weights, returns, and signals; optimized parameters persist.
    #[default]
    Window,
    /// Also discard the optimized parameters.
    All,
}

/// Configuration for a walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Prices per training window (default 2000).
    pub train_len: usize,
    /// Prices per test window (default 500).
    pub test_len: usize,
    /// Advance between folds; `test_len` when unset.
    pub step: Option<usize>,
    /// Training passes over each training window (default 1).
    pub epochs: usize,
    /// Ticks between meta-parameter searches; 0 disables them (default 1000).
    pub update_threshold: usize,
    pub reset: ResetPolicy,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_len: 2000,
            test_len: 500,
            step: None,
            epochs: 1,
            update_threshold: 1000,
            reset: ResetPolicy::Window,
        }
    }
}

impl WalkForwardConfig {
    pub fn step(&self) -> usize {
        self.step.unwrap_or(self.test_len)
    }

    pub fn validate(&self) -> Result<(), WalkForwardError> {
        let problem = if self.train_len < 2 {
            Some(format!("train_len must be at least 2, got {}", self.train_len))
        } else if self.test_len == 0 {
            Some("test_len must be at least 1".to_string())
        } else if self.step() == 0 {
            Some("step must be at least 1".to_string())
        } else if self.epochs == 0 {
            Some("epochs must be at least 1".to_string())
        } else {
            None
        };
        match problem {
            Some(msg) => Err(WalkForwardError::InvalidConfig(msg)),
            None => Ok(()),
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Price index ranges of one fold (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    /// Equal to `train_end - 1`: the last training price.
    pub test_start: usize,
    pub test_end: usize,
}

/// Result of one fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldResult {
    pub spec: FoldSpec,
    /// Sharpe estimate of the last training epoch.
    pub train_sharpe: f64,
    /// Net profit of the last training epoch.
    pub train_profit: f64,
    pub test_sharpe: f64,
    pub test_profit: f64,
    pub directional_accuracy: Option<f64>,
    pub optimizer_rounds: usize,
    pub improved_rounds: usize,
    /// Weight-update guard engagements over the fold's training epochs.
    pub fallbacks: u64,
    /// Parameters after training, used for the test window.
    pub parameters: Parameters,
    /// Coefficients at the end of the fold.
    pub weights: Vec<f64>,
}

/// Complete result of a walk-forward run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub folds: Vec<FoldResult>,
    /// Seed profit followed by one out-of-sample profit per tick.
    pub profit: Vec<f64>,
    /// Out-of-sample signal per tick.
    pub signals: Vec<f64>,
    /// Position held over each out-of-sample return.
    pub positions: Vec<f64>,
    pub returns: Vec<f64>,
    pub rewards: Vec<f64>,
}

impl WalkForwardReport {
    pub fn final_profit(&self) -> f64 {
        self.profit.last().copied().unwrap_or(0.0)
    }

    pub fn sharpe(&self) -> f64 {
        arl_core::stats::sharpe_estimate(&self.rewards)
    }

    pub fn max_drawdown(&self) -> MaxDrawdown {
        metrics::max_drawdown(&self.profit)
    }

    pub fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::compute(&self.profit, &self.positions, &self.returns, &self.rewards)
    }

    pub fn final_parameters(&self) -> Option<Parameters> {
        self.folds.last().map(|f| f.parameters)
    }
}

/// Errors from walk-forward runs.
#[derive(Debug, Error)]
pub enum WalkForwardError {
    #[error("invalid walk-forward config: {0}")]
    InvalidConfig(String),
    #[error("insufficient data: {total} prices < minimum {min}")]
    InsufficientData { total: usize, min: usize },
    #[error("engine error on fold {fold}: {source}")]
    Engine {
        fold: usize,
        #[source]
        source: EngineError,
    },
}

// ─── Fold creation ───────────────────────────────────────────────────

/// Create rolling fold specifications over `total` prices.
///
/// A fold needs a full training window and at least one test price after it.
pub fn create_folds(
    total: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    config.validate()?;
    let min = config.train_len + 1;
    if total < min {
        return Err(WalkForwardError::InsufficientData { total, min });
    }

    let step = config.step();
    let mut folds = Vec::new();
    let mut train_start = 0;
    while train_start + config.train_len < total {
        let train_end = train_start + config.train_len;
        folds.push(FoldSpec {
            fold_index: folds.len(),
            train_start,
            train_end,
            test_start: train_end - 1,
            test_end: (train_end + config.test_len).min(total),
        });
        train_start += step;
    }
    Ok(folds)
}

// ─── Walk-forward orchestration ──────────────────────────────────────

/// Run every fold on `engine`, carrying the out-of-sample profit.
pub fn run_walk_forward(
    engine: &mut Engine,
    prices: &[f64],
    config: &WalkForwardConfig,
) -> Result<WalkForwardReport, WalkForwardError> {
    let folds = create_folds(prices.len(), config)?;

    let mut carried = engine.profit();
    let mut report = WalkForwardReport {
        folds: Vec::with_capacity(folds.len()),
        profit: vec![carried],
        signals: Vec::new(),
        positions: Vec::new(),
        returns: Vec::new(),
        rewards: Vec::new(),
    };

    for spec in &folds {
        let fold = spec.fold_index;
        if fold > 0 {
            match config.reset {
                ResetPolicy::Never => {}
                ResetPolicy::Window => engine.reset(),
                ResetPolicy::All => engine.reset_all(),
            }
        }

        let train_window = &prices[spec.train_start..spec.train_end];
        let mut train: Option<EpochReport> = None;
        let (mut optimizer_rounds, mut improved_rounds, mut fallbacks) = (0, 0, 0);
        for _ in 0..config.epochs {
            let epoch = engine
                .train(train_window, config.update_threshold, Some(carried))
                .map_err(|source| WalkForwardError::Engine { fold, source })?;
            optimizer_rounds += epoch.optimizer_rounds;
            improved_rounds += epoch.improved_rounds;
            fallbacks += epoch.fallbacks;
            train = Some(epoch);
        }

        let test = engine
            .test(&prices[spec.test_start..spec.test_end], Some(carried))
            .map_err(|source| WalkForwardError::Engine { fold, source })?;
        carried = test.final_profit();

        report.profit.extend_from_slice(&test.profit[1..]);
        report.signals.extend_from_slice(&test.signals[1..]);
        report
            .positions
            .extend_from_slice(&test.signals[..test.returns.len()]);
        report.returns.extend_from_slice(&test.returns);
        report.rewards.extend_from_slice(&test.rewards);

        let (train_sharpe, train_profit) = train
            .as_ref()
            .map_or((0.0, 0.0), |t| (t.sharpe, t.net_profit()));

        tracing::info!(
            fold,
            train = ?(spec.train_start..spec.train_end),
            test = ?(spec.test_start..spec.test_end),
            train_sharpe,
            test_sharpe = test.sharpe,
            test_profit = test.net_profit(),
            cumulative = carried,
            optimizer_rounds,
            improved_rounds,
            fallbacks,
            parameters = %engine.parameters(),
            "fold complete"
        );

        report.folds.push(FoldResult {
            spec: *spec,
            train_sharpe,
            train_profit,
            test_sharpe: test.sharpe,
            test_profit: test.net_profit(),
            directional_accuracy: test.directional_accuracy,
            optimizer_rounds,
            improved_rounds,
            fallbacks,
            parameters: *engine.parameters(),
            weights: engine.weights().coefficients().to_vec(),
        });
    }

    Ok(report)
}
