//! Engine configuration, lifecycle phase, errors, and epoch report types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimizer::SearchConfig;
use crate::parameters::{ParameterError, Parameters};
use crate::returns::ReturnKind;
use crate::risk::RiskPolicyConfig;

/// Fewest prices a window may hold: one return needs two prices.
pub const MIN_WINDOW_PRICES: usize = 2;

/// Smallest signal window: one lag plus bias and feedback weights.
pub const MIN_WINDOW_SIZE: usize = 3;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid window: {len} prices < minimum {min}")]
    InvalidWindow { len: usize, min: usize },
    #[error("invalid window: price at index {index} is not finite ({value})")]
    NonFinitePrice { index: usize, value: f64 },
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error("invalid parameters: {0}")]
    Parameters(#[from] ParameterError),
}

/// Configuration of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Signal window; the signal reads `window_size - 2` lagged returns.
    pub window_size: usize,
    pub return_kind: ReturnKind,
    pub risk_policy: RiskPolicyConfig,
    pub search: SearchConfig,
    /// Seed for the initial weight (and, if unset, parameter) draw.
    pub seed: u64,
    /// Starting meta-parameters; drawn uniformly from [0, 1) when `None`.
    pub initial_parameters: Option<Parameters>,
    /// Profit level a window starts from when the caller carries none.
    pub initial_profit: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 13,
            return_kind: ReturnKind::Difference,
            risk_policy: RiskPolicyConfig::default(),
            search: SearchConfig::default(),
            seed: 0,
            initial_parameters: Some(Parameters::default()),
            initial_profit: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.window_size < MIN_WINDOW_SIZE {
            return Err(EngineError::InvalidConfig(format!(
                "window_size {} < minimum {MIN_WINDOW_SIZE}",
                self.window_size
            )));
        }
        if self.search.samples_per_field == 0 {
            return Err(EngineError::InvalidConfig(
                "search.samples_per_field must be at least 1".into(),
            ));
        }
        if !(self.search.spread.is_finite() && self.search.spread >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "search.spread must be finite and >= 0, got {}",
                self.search.spread
            )));
        }
        if !(self.search.floor.is_finite() && self.search.floor > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "search.floor must be finite and > 0, got {}",
                self.search.floor
            )));
        }
        if let RiskPolicyConfig::PriceStop { basis_scale } = self.risk_policy {
            if !(basis_scale.is_finite() && basis_scale > 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "price_stop basis_scale must be finite and > 0, got {basis_scale}"
                )));
            }
        }
        if !self.initial_profit.is_finite() {
            return Err(EngineError::InvalidConfig("initial_profit must be finite".into()));
        }
        if let Some(params) = &self.initial_parameters {
            params.validate()?;
        }
        Ok(())
    }
}

/// Lifecycle of an engine over one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnginePhase {
    Idle,
    Streaming,
    Optimizing,
    Done,
}

/// Train (weights and parameters adapt) or test (everything frozen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Test,
}

/// Everything one `train` or `test` pass over a window produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochReport {
    pub mode: Mode,
    /// Seed profit followed by one cumulative profit per tick.
    pub profit: Vec<f64>,
    /// Signal held at the start of the pass followed by one effective signal
    /// per tick; the same length as `profit`.
    pub signals: Vec<f64>,
    /// Pre-threshold signal per tick.
    pub raw_signals: Vec<f64>,
    pub returns: Vec<f64>,
    /// Reward `R_t` per tick.
    pub rewards: Vec<f64>,
    /// Un-annualised Sharpe estimate of `rewards`.
    pub sharpe: f64,
    /// Fraction of held ticks whose position matched the sign of the return.
    pub directional_accuracy: Option<f64>,
    pub optimizer_rounds: usize,
    /// Optimizer rounds that found strictly better parameters.
    pub improved_rounds: usize,
    /// Numeric guards in the weight update that engaged during this pass.
    pub fallbacks: u64,
    /// Parameters in force at the end of the pass.
    pub parameters: Parameters,
}

impl EpochReport {
    pub fn final_profit(&self) -> f64 {
        self.profit.last().copied().unwrap_or(0.0)
    }

    /// Profit added by this pass.
    pub fn net_profit(&self) -> f64 {
        match (self.profit.first(), self.profit.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Fraction of ticks with a non-neutral prior position and a non-zero return
/// on which the position pointed the same way as the return.
pub fn directional_accuracy(previous_signals: &[f64], returns: &[f64]) -> Option<f64> {
    let (hits, total) = previous_signals
        .iter()
        .zip(returns)
        .filter(|(f, r)| **f != 0.0 && **r != 0.0)
        .fold((0usize, 0usize), |(hits, total), (f, r)| {
            let hit = (*f > 0.0) == (*r > 0.0);
            (hits + usize::from(hit), total + 1)
        });
    (total > 0).then(|| hits as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn tiny_window_rejected() {
        let err = EngineConfig::new(2).validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn zero_samples_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.search.samples_per_field = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn directional_accuracy_ignores_flat_ticks() {
        let prev = [1.0, 1.0, 0.0, -1.0, -1.0];
        let rets = [0.1, -0.1, 0.5, -0.2, 0.0];
        // counted: (1, 0.1) hit, (1, -0.1) miss, (-1, -0.2) hit
        let acc = directional_accuracy(&prev, &rets).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(directional_accuracy(&[0.0], &[1.0]), None);
    }

    #[test]
    fn config_json_roundtrip() {
        let cfg = EngineConfig::new(8);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
