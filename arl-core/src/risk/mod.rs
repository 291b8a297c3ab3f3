//! Risk overlay: the second layer between the raw signal and the position.
//!
//! A policy thresholds the raw signal against the deadband `y`, then runs a
//! stop-loss state machine over `{long, short, neutral}`: a sign change opens a
//! fresh position and resets the reference, a held position is forced neutral
//! once its adverse excursion exceeds `x`.
//!
//! Policies are stateless and shared across threads; all mutable state lives
//! in [`RiskState`], one instance per engine run (or per optimizer trial).

pub mod drawdown_stop;
pub mod price_stop;

pub use drawdown_stop::DrawdownStop;
pub use price_stop::PriceStop;

use serde::{Deserialize, Serialize};

use crate::parameters::Parameters;

/// Mutable position / risk state, updated on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    /// Highest cumulative profit seen since the current position was opened.
    pub max_pnl: f64,
    /// Current cumulative profit.
    pub current_pnl: f64,
    /// Price at which the current position was opened.
    pub last_position_price: f64,
    /// Latest observed price.
    pub current_price: f64,
    /// Last non-neutral candidate signal (`-1`, `+1`, or `0` before any).
    pub last_signal: f64,
    /// True while the emitted signal is non-neutral.
    pub holding: bool,
    /// True after a stop-loss trip, until the next sign change.
    pub stopped: bool,
}

impl RiskState {
    /// Fresh state anchored at a profit level and price.
    pub fn new(current_pnl: f64, current_price: f64) -> Self {
        Self {
            max_pnl: current_pnl,
            current_pnl,
            last_position_price: current_price,
            current_price,
            last_signal: 0.0,
            holding: false,
            stopped: false,
        }
    }

    /// Re-anchor at the start of an epoch: the reference profit is the carried
    /// profit and the last signal is the last emitted one.
    pub fn anchor(&mut self, pnl: f64, price: f64, last_signal: f64) {
        self.current_pnl = pnl;
        self.max_pnl = pnl;
        self.current_price = price;
        self.last_position_price = price;
        self.last_signal = last_signal;
        self.holding = last_signal != 0.0;
        self.stopped = false;
    }

    /// Record the effective signal emitted by a policy.
    pub(crate) fn record(&mut self, effective: f64) -> f64 {
        self.holding = effective != 0.0;
        effective
    }
}

impl Default for RiskState {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A stop-loss policy: accepts, rejects, or overrides the raw signal.
pub trait RiskPolicy: Send + Sync {
    /// Human-readable name (e.g., "drawdown_stop").
    fn name(&self) -> &str;

    /// Map a raw signal to an effective signal in `{-1, 0, +1}`, updating `state`.
    fn apply(&self, raw_signal: f64, params: &Parameters, state: &mut RiskState) -> f64;
}

/// Serializable choice of risk policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskPolicyConfig {
    /// Stop when cumulative profit falls more than `x` below its running peak.
    #[default]
    DrawdownStop,
    /// Stop when price moves against the position by more than `x * basis_scale`.
    PriceStop { basis_scale: f64 },
}

impl RiskPolicyConfig {
    pub fn build(&self) -> Box<dyn RiskPolicy> {
        match *self {
            RiskPolicyConfig::DrawdownStop => Box::new(DrawdownStop),
            RiskPolicyConfig::PriceStop { basis_scale } => Box::new(PriceStop::new(basis_scale)),
        }
    }
}
