//! Price stop: forces neutral once the price has moved against the held
//! position by more than `x * basis_scale` from the price it was opened at.
//!
//! The loss threshold scale is configurable rather than fixed, since `x` may
//! be quoted in raw price units, basis points, or tenths of a percent.

use crate::parameters::Parameters;
use crate::signal::{apply_deadband, sign};

use super::{RiskPolicy, RiskState};

/// Default multiplier applied to `x`: one basis point.
pub const DEFAULT_BASIS_SCALE: f64 = 1e-4;

/// Adverse-price-move stop-loss policy.
#[derive(Debug, Clone, Copy)]
pub struct PriceStop {
    pub basis_scale: f64,
}

impl PriceStop {
    pub fn new(basis_scale: f64) -> Self {
        Self { basis_scale }
    }
}

impl Default for PriceStop {
    fn default() -> Self {
        Self::new(DEFAULT_BASIS_SCALE)
    }
}

impl RiskPolicy for PriceStop {
    fn name(&self) -> &str {
        "price_stop"
    }

    fn apply(&self, raw_signal: f64, params: &Parameters, state: &mut RiskState) -> f64 {
        if apply_deadband(raw_signal, params.y()) == 0.0 {
            return state.record(0.0);
        }
        let candidate = sign(raw_signal);

        if candidate != state.last_signal {
            state.last_position_price = state.current_price;
            state.last_signal = candidate;
            state.stopped = false;
            return state.record(candidate);
        }

        let move_with_position = (state.current_price - state.last_position_price) * candidate;
        if move_with_position < 0.0 && move_with_position.abs() > params.x() * self.basis_scale {
            state.stopped = true;
            state.record(0.0)
        } else {
            state.record(candidate)
        }
    }
}
