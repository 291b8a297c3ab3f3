//! Recurrent trading signal.
//!
//! `F_t = w_{M+1} * F_{t-1} + v + sum_i w_i * r_{t-i}` over the most recent
//! `window_size - 2` returns, newest first. Missing history is zero-padded.
//! Thresholding into `{-1, 0, +1}` happens once, in the risk overlay.

use crate::weights::Weights;

/// Number of lagged returns the signal reads for a given window size.
pub fn lag_count(window_size: usize) -> usize {
    window_size.saturating_sub(2)
}

/// The `lags` returns ending at index `t - 1`, newest first, zero-padded.
///
/// `t` is the number of returns observed so far; values past the end of
/// `returns` are treated as unobserved.
pub fn lagged_returns(returns: &[f64], t: usize, lags: usize) -> Vec<f64> {
    let t = t.min(returns.len());
    (0..lags)
        .map(|i| if i < t { returns[t - 1 - i] } else { 0.0 })
        .collect()
}

/// Raw (pre-threshold) signal at tick `t`. No side effects.
pub fn compute_signal(
    t: usize,
    weights: &Weights,
    previous_signal: f64,
    window_size: usize,
    returns: &[f64],
) -> f64 {
    let lags = lag_count(window_size).min(weights.lag_count());
    let window = lagged_returns(returns, t, lags);
    let lagged: f64 = weights
        .lag_coefficients()
        .iter()
        .zip(&window)
        .map(|(w, r)| w * r)
        .sum();
    weights.recurrent() * previous_signal + weights.threshold() + lagged
}

/// Sign with an exact zero for zero input (`f64::signum(0.0)` is 1.0).
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Deadband thresholding: neutral when `|raw| < y`, otherwise `sign(raw)`.
pub fn apply_deadband(raw: f64, y: f64) -> f64 {
    if !raw.is_finite() || raw.abs() < y {
        0.0
    } else {
        sign(raw)
    }
}
