//! Cost function used to score a candidate parameter set.
//!
//! The candidate is replayed over a window of prices on a private copy of the
//! weights and a fresh risk state; the caller's live state is never touched.

use serde::{Deserialize, Serialize};

use crate::engine::tick::{step, TickState};
use crate::parameters::Parameters;
use crate::returns::ReturnKind;
use crate::risk::RiskPolicy;
use crate::stats::{downside_ratio, mean};
use crate::weights::Weights;

/// Utility `a * (1 - v) * mean(R) - v * downside_ratio(R)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Scale of the mean-reward term.
    pub a: f64,
    /// Risk aversion in `[0, 1]`: weight of the downside penalty.
    pub v: f64,
}

impl Default for Objective {
    fn default() -> Self {
        Self { a: 0.1, v: 0.5 }
    }
}

impl Objective {
    /// Score a reward series. Never NaN or infinite.
    pub fn score(&self, rewards: &[f64]) -> f64 {
        let s = self.a * (1.0 - self.v) * mean(rewards) - self.v * downside_ratio(rewards);
        if s.is_finite() {
            s
        } else {
            f64::MIN
        }
    }
}

/// Fixed inputs shared by every trial of a search.
pub struct ReplayContext<'a> {
    pub window_size: usize,
    pub return_kind: ReturnKind,
    pub policy: &'a dyn RiskPolicy,
    pub objective: Objective,
}

/// Replay `prices` under `candidate` and return the objective score.
///
/// The replay runs the live tick pipeline from a neutral position with zero
/// profit, anchoring the risk state at `prices[0]`, and trains a clone of
/// `weights` as it goes so `eta` and `rho` influence the score. Fewer than two
/// prices yield no rewards.
pub fn cost_function(
    candidate: &Parameters,
    weights: &Weights,
    prices: &[f64],
    ctx: &ReplayContext<'_>,
) -> f64 {
    let mut state = TickState::new(weights.clone(), ctx.return_kind);
    if let Some(&first) = prices.first() {
        state.risk.anchor(0.0, first, 0.0);
    }
    let mut rewards = Vec::with_capacity(prices.len().saturating_sub(1));

    for pair in prices.windows(2) {
        let r = state.returns.push_prices(pair[0], pair[1]);
        let tick = step(&mut state, r, pair[1], candidate, ctx.policy, ctx.window_size, true);
        rewards.push(tick.reward);
    }

    ctx.objective.score(&rewards)
}
