//! One tick of the signal → weights → risk → P&L pipeline.
//!
//! Shared by the live engine and by the optimizer's replay, which runs the
//! same step on its own disposable copy of the state.

use crate::parameters::Parameters;
use crate::returns::{ReturnKind, ReturnSeries};
use crate::risk::{RiskPolicy, RiskState};
use crate::signal::{compute_signal, sign};
use crate::weights::Weights;

/// Per-run mutable state advanced by [`step`].
#[derive(Debug, Clone)]
pub struct TickState {
    pub weights: Weights,
    pub risk: RiskState,
    pub returns: ReturnSeries,
    /// Effective signal `F_{t-1}` emitted on the previous tick.
    pub last_signal: f64,
    /// Cumulative profit `p_{t-1}`.
    pub profit: f64,
}

impl TickState {
    pub fn new(weights: Weights, return_kind: ReturnKind) -> Self {
        Self {
            weights,
            risk: RiskState::default(),
            returns: ReturnSeries::new(return_kind),
            last_signal: 0.0,
            profit: 0.0,
        }
    }
}

/// What one tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub raw_signal: f64,
    pub signal: f64,
    pub reward: f64,
    pub profit: f64,
}

/// Advance the state by one tick whose return `r` has already been appended
/// to `state.returns`.
///
/// With `learn` set the weights take one gradient step and the signal is then
/// recomputed with the updated weights before it reaches the risk overlay.
pub fn step(
    state: &mut TickState,
    r: f64,
    price: f64,
    params: &Parameters,
    policy: &dyn RiskPolicy,
    window_size: usize,
    learn: bool,
) -> Tick {
    let t = state.returns.len();
    let previous = state.last_signal;

    let history = state.returns.as_slice();

    let mut raw = compute_signal(t, &state.weights, previous, window_size, history);
    if learn {
        state.weights = state
            .weights
            .update(r, previous, sign(raw), params, history);
        raw = compute_signal(t, &state.weights, previous, window_size, history);
    }

    state.risk.current_price = price;
    let signal = policy.apply(raw, params, &mut state.risk);

    // R_t = F_{t-1} r_t - delta |F_t - F_{t-1}|
    let reward = previous * r - params.delta() * (signal - previous).abs();
    state.profit += reward;
    state.risk.current_pnl = state.profit;
    state.last_signal = signal;

    Tick {
        raw_signal: raw,
        signal,
        reward,
        profit: state.profit,
    }
}
