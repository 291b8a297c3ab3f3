//! Drawdown stop: forces neutral once cumulative profit has fallen more than
//! `x` below its peak since the position was opened.
//!
//! A sign change re-anchors the peak at the current profit. While the same
//! candidate persists the peak ratchets up with new highs.

use crate::parameters::Parameters;
use crate::signal::{apply_deadband, sign};

use super::{RiskPolicy, RiskState};

/// Profit-drawdown stop-loss policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawdownStop;

impl RiskPolicy for DrawdownStop {
    fn name(&self) -> &str {
        "drawdown_stop"
    }

    fn apply(&self, raw_signal: f64, params: &Parameters, state: &mut RiskState) -> f64 {
        if apply_deadband(raw_signal, params.y()) == 0.0 {
            return state.record(0.0);
        }
        let candidate = sign(raw_signal);

        if candidate != state.last_signal {
            state.max_pnl = state.current_pnl;
            state.last_signal = candidate;
            state.stopped = false;
            return state.record(candidate);
        }

        let drawdown = state.max_pnl - state.current_pnl;
        if drawdown <= 0.0 {
            state.max_pnl = state.current_pnl;
            state.record(candidate)
        } else if drawdown > params.x() {
            state.stopped = true;
            state.record(0.0)
        } else {
            state.record(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(x: f64, y: f64) -> Parameters {
        Parameters::new(0.0, 0.1, 0.1, x, y).unwrap()
    }

    #[test]
    fn deadband_returns_neutral_without_touching_reference() {
        let mut state = RiskState::new(1.0, 0.0);
        state.last_signal = 1.0;
        let out = DrawdownStop.apply(0.05, &params(0.5, 0.1), &mut state);
        assert_eq!(out, 0.0);
        assert_eq!(state.last_signal, 1.0);
        assert!(!state.holding);
    }

    #[test]
    fn sign_change_resets_peak_and_accepts() {
        let mut state = RiskState::new(2.0, 0.0);
        state.max_pnl = 5.0;
        state.last_signal = 1.0;
        let out = DrawdownStop.apply(-3.0, &params(0.5, 0.1), &mut state);
        assert_eq!(out, -1.0);
        assert_eq!(state.max_pnl, 2.0);
        assert_eq!(state.last_signal, -1.0);
        assert!(state.holding);
    }

    #[test]
    fn new_high_ratchets_peak() {
        let mut state = RiskState::new(1.0, 0.0);
        state.last_signal = 1.0;
        state.max_pnl = 1.0;
        state.current_pnl = 1.5;
        let out = DrawdownStop.apply(2.0, &params(0.5, 0.1), &mut state);
        assert_eq!(out, 1.0);
        assert_eq!(state.max_pnl, 1.5);
    }

    #[test]
    fn drawdown_within_threshold_keeps_position() {
        let mut state = RiskState::new(1.0, 0.0);
        state.last_signal = 1.0;
        state.max_pnl = 1.3;
        let out = DrawdownStop.apply(2.0, &params(0.5, 0.1), &mut state);
        assert_eq!(out, 1.0);
        assert_eq!(state.max_pnl, 1.3);
        assert!(!state.stopped);
    }

    #[test]
    fn drawdown_beyond_threshold_trips_stop() {
        let mut state = RiskState::new(1.0, 0.0);
        state.last_signal = -1.0;
        state.max_pnl = 2.0;
        let out = DrawdownStop.apply(-2.0, &params(0.5, 0.1), &mut state);
        assert_eq!(out, 0.0);
        assert!(state.stopped);
        assert!(!state.holding);
        assert_eq!(state.last_signal, -1.0);
    }

    #[test]
    fn stop_clears_on_sign_change() {
        let mut state = RiskState::new(1.0, 0.0);
        state.last_signal = -1.0;
        state.max_pnl = 2.0;
        DrawdownStop.apply(-2.0, &params(0.5, 0.1), &mut state);
        let out = DrawdownStop.apply(2.0, &params(0.5, 0.1), &mut state);
        assert_eq!(out, 1.0);
        assert!(!state.stopped);
    }
}
