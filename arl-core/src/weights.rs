//! Weights of the recurrent signal and their online update.
//!
//! Layout: `(w_0 .. w_{L-1}, v, w_{M+1})` where `L = window_size - 2` lag
//! coefficients are followed by the bias `v` and the recurrent feedback weight.
//!
//! The update is an approximate gradient ascent on a differential-Sharpe-like
//! objective of the reward `R_t = F_{t-1} r_t - delta |F_t - F_{t-1}|`:
//!
//! ```text
//! dR_t/dF_t     = -delta * sign(F_t - F_{t-1})
//! dR_t/dF_{t-1} =  r_t + delta * sign(F_t - F_{t-1})
//! dF_t/dw_i     =  x_i + w_{M+1} * dF_{t-1}/dw_i
//! dD_t/dR_t     = (B_{t-1} - A_{t-1} r_t) / |B_{t-1} - A_{t-1}^2|^{3/2}
//! w_i          +=  rho * dD_t/dR_t * (dR_t/dF_t * dF_t/dw_i + dR_t/dF_{t-1} * dF_{t-1}/dw_i)
//! ```
//!
//! `x_i` is `r_{t-i}` for lag weights, `1` for the bias and `F_{t-1}` for the
//! recurrent weight. `|F_t - F_{t-1}|` is not differentiable at zero; an
//! unchanged position takes the cost slope as zero, so `dR_t/dF_t = 0` and
//! `dR_t/dF_{t-1} = r_t`.
//!
//! Back-propagation through the recurrence is truncated to one step: only the
//! previous tick's sensitivities are kept, never the full history. Each kept
//! sensitivity is clamped to `[-SENSITIVITY_LIMIT, SENSITIVITY_LIMIT]`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::parameters::Parameters;
use crate::signal::{lagged_returns, sign};

/// Value substituted for `dD_t/dR_t` when its denominator degenerates.
pub const SHARPE_DERIVATIVE_FALLBACK: f64 = 0.0;

/// Initial moments. With `A = 0` and `B > 0` the smoothed variance
/// `B - A^2` stays positive for any return stream.
const INITIAL_AT: f64 = 0.0;
const INITIAL_BT: f64 = 1.0;

/// Bound on each carried sensitivity `dF_t/dw_i`. Without it the recursion
/// `x_i + w_{M+1} dF_{t-1}/dw_i` grows geometrically once `|w_{M+1}| >= 1`.
pub const SENSITIVITY_LIMIT: f64 = 10.0;

/// Errors from constructing weights.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("weights need at least 3 coefficients (one lag, bias, feedback), got {0}")]
    TooFew(usize),
    #[error("coefficient {index} is not finite ({value})")]
    NotFinite { index: usize, value: f64 },
}

/// Coefficient vector plus the recurrent derivative state it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    coefficients: Vec<f64>,
    /// `dF_{t-1}/dw_i`, same length as `coefficients`.
    old_diff_ft: Vec<f64>,
    at: f64,
    bt: f64,
    /// Number of numeric guards that engaged over this lineage of weights.
    fallback_count: u64,
}

impl Weights {
    /// Checked constructor for coefficients coming from outside the crate.
    pub fn try_from_coefficients(coefficients: Vec<f64>) -> Result<Self, WeightsError> {
        if coefficients.len() < 3 {
            return Err(WeightsError::TooFew(coefficients.len()));
        }
        let bad = coefficients.iter().enumerate().find(|(_, w)| !w.is_finite());
        if let Some((index, &value)) = bad {
            return Err(WeightsError::NotFinite { index, value });
        }
        Ok(Self::from_coefficients(coefficients))
    }

    /// Weights from an explicit coefficient vector; sensitivities start at zero.
    ///
    /// # Panics
    /// Panics if fewer than 3 coefficients are given (one lag, bias, feedback).
    /// Use [`Weights::try_from_coefficients`] for untrusted input.
    pub fn from_coefficients(coefficients: Vec<f64>) -> Self {
        assert!(
            coefficients.len() >= 3,
            "weights need at least one lag coefficient plus bias and feedback"
        );
        let n = coefficients.len();
        Self {
            coefficients,
            old_diff_ft: vec![0.0; n],
            at: INITIAL_AT,
            bt: INITIAL_BT,
            fallback_count: 0,
        }
    }

    /// All-zero weights for a signal window of `window_size`.
    pub fn zeros(window_size: usize) -> Self {
        Self::from_coefficients(vec![0.0; window_size.max(3)])
    }

    /// Coefficients drawn uniformly from [0, 1).
    pub fn random<R: Rng + ?Sized>(window_size: usize, rng: &mut R) -> Self {
        let n = window_size.max(3);
        Self::from_coefficients((0..n).map(|_| rng.gen::<f64>()).collect())
    }

    /// Override the running moments `(At, Bt)`.
    pub fn with_moments(mut self, at: f64, bt: f64) -> Self {
        self.at = at;
        self.bt = bt;
        self
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn lag_count(&self) -> usize {
        self.coefficients.len() - 2
    }

    pub fn lag_coefficients(&self) -> &[f64] {
        &self.coefficients[..self.lag_count()]
    }

    /// The bias term `v`.
    pub fn threshold(&self) -> f64 {
        self.coefficients[self.coefficients.len() - 2]
    }

    /// The recurrent feedback weight `w_{M+1}`.
    pub fn recurrent(&self) -> f64 {
        self.coefficients[self.coefficients.len() - 1]
    }

    /// `dF_{t-1}/dw_i` carried into the next update.
    pub fn sensitivities(&self) -> &[f64] {
        &self.old_diff_ft
    }

    /// Running first and second moments `(At, Bt)`.
    pub fn moments(&self) -> (f64, f64) {
        (self.at, self.bt)
    }

    pub fn fallback_count(&self) -> u64 {
        self.fallback_count
    }

    pub fn is_finite(&self) -> bool {
        self.coefficients.iter().all(|w| w.is_finite())
            && self.old_diff_ft.iter().all(|d| d.is_finite())
            && self.at.is_finite()
            && self.bt.is_finite()
    }

    /// One online gradient step. Returns the updated weights; `self` is untouched.
    ///
    /// `returns` is the history up to and including `realized_return`; the
    /// signals are already thresholded to `{-1, 0, +1}`.
    pub fn update(
        &self,
        realized_return: f64,
        previous_signal: f64,
        current_signal: f64,
        params: &Parameters,
        returns: &[f64],
    ) -> Weights {
        let mut fallbacks = 0u64;
        let r = if realized_return.is_finite() {
            realized_return
        } else {
            fallbacks += 1;
            0.0
        };

        let (diff_rt, diff_rt_minus_one) =
            reward_partials(r, previous_signal, current_signal, params.delta());

        let inputs = self.sensitivity_inputs(returns, previous_signal);
        let recurrent = self.recurrent();
        let diff_ft: Vec<f64> = inputs
            .iter()
            .zip(&self.old_diff_ft)
            .map(|(x, old)| {
                let d = x + old * recurrent;
                if d.is_finite() {
                    d.clamp(-SENSITIVITY_LIMIT, SENSITIVITY_LIMIT)
                } else {
                    fallbacks += 1;
                    0.0
                }
            })
            .collect();

        let at = self.at + params.eta() * (r - self.at);
        let bt = self.bt + params.eta() * (r * r - self.bt);

        let diff_dt = match sharpe_derivative(self.at, self.bt, r) {
            Some(d) => d,
            None => {
                fallbacks += 1;
                tracing::trace!(at = self.at, bt = self.bt, "degenerate Sharpe derivative");
                SHARPE_DERIVATIVE_FALLBACK
            }
        };

        let coefficients = self
            .coefficients
            .iter()
            .zip(diff_ft.iter().zip(&self.old_diff_ft))
            .map(|(w, (d_now, d_prev))| {
                let step = diff_rt * d_now + diff_rt_minus_one * d_prev;
                let next = w + params.rho() * diff_dt * step;
                if next.is_finite() {
                    next
                } else {
                    fallbacks += 1;
                    *w
                }
            })
            .collect();

        let (at, bt) = if at.is_finite() && bt.is_finite() {
            (at, bt)
        } else {
            fallbacks += 1;
            (self.at, self.bt)
        };

        Weights {
            coefficients,
            old_diff_ft: diff_ft,
            at,
            bt,
            fallback_count: self.fallback_count + fallbacks,
        }
    }

    /// Direct contribution of each coefficient to `F_t`.
    fn sensitivity_inputs(&self, returns: &[f64], previous_signal: f64) -> Vec<f64> {
        let mut inputs = lagged_returns(returns, returns.len(), self.lag_count());
        inputs.push(1.0);
        inputs.push(previous_signal);
        inputs
    }
}

/// `(dR_t/dF_t, dR_t/dF_{t-1})` for `R_t = F_{t-1} r_t - delta |F_t - F_{t-1}|`.
fn reward_partials(r: f64, previous_signal: f64, current_signal: f64, delta: f64) -> (f64, f64) {
    let s = sign(current_signal - previous_signal);
    if s == 0.0 {
        (0.0, r)
    } else {
        (-delta * s, r + delta * s)
    }
}

/// `(B - A r) / |B - A^2|^{3/2}`, or `None` when the result is not finite.
fn sharpe_derivative(at: f64, bt: f64, r: f64) -> Option<f64> {
    let denominator = (bt - at * at).abs().powf(1.5);
    if denominator == 0.0 {
        return None;
    }
    let d = (bt - at * r) / denominator;
    d.is_finite().then_some(d)
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Weights(coefficients={:?}, v={}, w_rec={})",
            self.lag_coefficients(),
            self.threshold(),
            self.recurrent()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(delta: f64, eta: f64, rho: f64) -> Parameters {
        Parameters::new(delta, eta, rho, 0.1, 0.1).unwrap()
    }

    #[test]
    fn layout_accessors() {
        let w = Weights::from_coefficients(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(w.lag_count(), 2);
        assert_eq!(w.lag_coefficients(), &[1.0, 2.0]);
        assert_eq!(w.threshold(), 3.0);
        assert_eq!(w.recurrent(), 4.0);
        assert_eq!(w.sensitivities(), &[0.0; 4]);
        assert_eq!(w.moments(), (0.0, 1.0));
    }

    #[test]
    fn reward_partials_unchanged_position() {
        assert_eq!(reward_partials(0.3, 1.0, 1.0, 0.5), (0.0, 0.3));
    }

    #[test]
    fn reward_partials_flip_to_long() {
        let (d_now, d_prev) = reward_partials(0.3, -1.0, 1.0, 0.5);
        assert_eq!(d_now, -0.5);
        assert!((d_prev - 0.8).abs() < 1e-12);
    }

    #[test]
    fn update_is_value_semantic() {
        let w = Weights::from_coefficients(vec![0.5, 0.5, 0.5, 0.5]);
        let snapshot = w.clone();
        let _ = w.update(0.1, 0.0, 1.0, &params(0.01, 0.1, 0.1), &[0.1]);
        assert_eq!(w, snapshot);
    }

    #[test]
    fn first_step_matches_hand_computation() {
        // 1 lag: (w0, v, w_rec) = (0.5, 0.2, 0.1), A=0, B=1.
        let w = Weights::from_coefficients(vec![0.5, 0.2, 0.1]);
        let p = params(0.0, 0.5, 1.0);
        let next = w.update(0.2, 0.0, 1.0, &p, &[0.2]);

        // Sensitivities: inputs (0.2, 1, F_{t-1}=0) + 0 * w_rec.
        assert_eq!(next.sensitivities(), &[0.2, 1.0, 0.0]);
        // Moments: A = 0 + 0.5 (0.2 - 0) = 0.1, B = 1 + 0.5 (0.04 - 1) = 0.52.
        let (at, bt) = next.moments();
        assert!((at - 0.1).abs() < 1e-12);
        assert!((bt - 0.52).abs() < 1e-12);
        // delta = 0 -> dR/dF_t = 0, dR/dF_{t-1} = 0.2 (+0); old sensitivities
        // are zero, so the coefficients do not move on the first step.
        assert_eq!(next.coefficients(), w.coefficients());
    }

    #[test]
    fn second_step_moves_coefficients_along_gradient() {
        let w = Weights::from_coefficients(vec![0.5, 0.2, 0.1]);
        let p = params(0.0, 0.5, 1.0);
        let w1 = w.update(0.2, 0.0, 1.0, &p, &[0.2]);
        let w2 = w1.update(0.1, 1.0, 1.0, &p, &[0.2, 0.1]);

        // dD/dR = (0.52 - 0.1 * 0.1) / |0.52 - 0.01|^1.5
        let dd = (0.52 - 0.1 * 0.1) / (0.51f64).powf(1.5);
        // Unchanged position: step_i = 0.1 * old_diff_i
        let expected: Vec<f64> = [0.5, 0.2, 0.1]
            .iter()
            .zip([0.2, 1.0, 0.0])
            .map(|(w, d)| w + dd * 0.1 * d)
            .collect();
        for (got, want) in w2.coefficients().iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        // New sensitivities: (0.1, 1, 1) + 0.1 * (0.2, 1, 0)
        let sens = w2.sensitivities();
        assert!((sens[0] - 0.12).abs() < 1e-12);
        assert!((sens[1] - 1.1).abs() < 1e-12);
        assert!((sens[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_denominator_uses_fallback() {
        // B - A^2 = 0 exactly.
        let w = Weights::from_coefficients(vec![0.5, 0.2, 0.1]).with_moments(1.0, 1.0);
        let next = w.update(0.3, 1.0, 1.0, &params(0.0, 0.1, 1.0), &[0.3]);
        assert_eq!(next.fallback_count(), 1);
        assert_eq!(next.coefficients(), w.coefficients());
        assert!(next.is_finite());
    }

    #[test]
    fn non_finite_return_is_neutralised() {
        let w = Weights::from_coefficients(vec![0.5, 0.2, 0.1]);
        let next = w.update(f64::NAN, 0.0, 1.0, &params(0.1, 0.1, 1.0), &[f64::NAN]);
        assert!(next.fallback_count() >= 1);
        assert!(next.coefficients().iter().all(|c| c.is_finite()));
    }

    #[test]
    fn constant_signal_over_long_window_stays_finite() {
        let mut w = Weights::from_coefficients(vec![0.9, 0.9, 0.9, 0.9, 0.99]);
        let p = params(0.001, 0.2, 0.5);
        let mut returns = Vec::new();
        for i in 0..2_000 {
            returns.push(0.0);
            w = w.update(0.0, 1.0, 1.0, &p, &returns);
            assert!(w.is_finite(), "non-finite at step {i}");
        }
    }

    #[test]
    fn sensitivities_are_clamped_under_strong_feedback() {
        // w_rec = 1.5 makes the unclamped recursion grow geometrically.
        let mut w = Weights::from_coefficients(vec![0.1, 0.2, 1.5]);
        let p = params(0.0, 0.1, 0.0);
        let mut returns = Vec::new();
        for _ in 0..100 {
            returns.push(0.01);
            w = w.update(0.01, 1.0, 1.0, &p, &returns);
        }
        assert!(w
            .sensitivities()
            .iter()
            .all(|d| d.abs() <= SENSITIVITY_LIMIT));
        assert_eq!(w.sensitivities()[2], SENSITIVITY_LIMIT);
        assert_eq!(w.fallback_count(), 0);
    }

    #[test]
    fn checked_constructor_rejects_short_and_non_finite() {
        assert_eq!(
            Weights::try_from_coefficients(vec![0.1, 0.2]),
            Err(WeightsError::TooFew(2))
        );
        assert!(matches!(
            Weights::try_from_coefficients(vec![0.1, f64::NAN, 0.3]),
            Err(WeightsError::NotFinite { index: 1, .. })
        ));
        let w = Weights::try_from_coefficients(vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(w, Weights::from_coefficients(vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn random_weights_have_window_length() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let w = Weights::random(6, &mut rng);
        assert_eq!(w.coefficients().len(), 6);
        assert_eq!(w.lag_count(), 4);
    }
}
