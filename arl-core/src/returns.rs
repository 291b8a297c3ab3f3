//! Return series: derives per-tick returns from raw prices.
//!
//! Append-only within a window; cleared on engine reset.

use serde::{Deserialize, Serialize};

/// How a return is derived from two consecutive prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// `price[t] - price[t-1]`.
    #[default]
    Difference,
    /// `1 - price[t-1] / price[t]`.
    Relative,
}

impl ReturnKind {
    /// Return between two consecutive prices.
    ///
    /// A relative return against a zero or non-finite price is 0.0.
    pub fn compute(self, previous: f64, current: f64) -> f64 {
        let r = match self {
            ReturnKind::Difference => current - previous,
            ReturnKind::Relative => {
                if current == 0.0 {
                    return 0.0;
                }
                1.0 - previous / current
            }
        };
        if r.is_finite() {
            r
        } else {
            0.0
        }
    }
}

/// Growing, ordered sequence of returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    kind: ReturnKind,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(kind: ReturnKind) -> Self {
        Self {
            kind,
            values: Vec::new(),
        }
    }

    /// Build a series from a full price slice (`prices.len() - 1` returns).
    pub fn from_prices(kind: ReturnKind, prices: &[f64]) -> Self {
        let values = prices
            .windows(2)
            .map(|pair| kind.compute(pair[0], pair[1]))
            .collect();
        Self { kind, values }
    }

    pub fn kind(&self) -> ReturnKind {
        self.kind
    }

    /// Append the return between `previous` and `current`, returning it.
    pub fn push_prices(&mut self, previous: f64, current: f64) -> f64 {
        let r = self.kind.compute(previous, current);
        self.values.push(r);
        r
    }

    /// Append an already-computed return.
    pub fn push(&mut self, r: f64) {
        self.values.push(r);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// The most recent `n` returns (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> &[f64] {
        let start = self.values.len().saturating_sub(n);
        &self.values[start..]
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_returns_from_prices() {
        let prices = [1.99, 1.88, 1.77, 1.66, 1.55, 1.66, 1.77, 1.88];
        let series = ReturnSeries::from_prices(ReturnKind::Difference, &prices);
        assert_eq!(series.len(), 7);
        let expected = [-0.11, -0.11, -0.11, -0.11, 0.11, 0.11, 0.11];
        for (got, want) in series.as_slice().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} vs {want}");
        }
    }

    #[test]
    fn relative_return_matches_definition() {
        let r = ReturnKind::Relative.compute(100.0, 125.0);
        assert!((r - 0.2).abs() < 1e-12);
    }

    #[test]
    fn relative_return_against_zero_price_is_zero() {
        assert_eq!(ReturnKind::Relative.compute(1.0, 0.0), 0.0);
    }

    #[test]
    fn non_finite_difference_is_zero() {
        assert_eq!(ReturnKind::Difference.compute(1.0, f64::NAN), 0.0);
    }

    #[test]
    fn tail_clamps_to_available_history() {
        let mut series = ReturnSeries::new(ReturnKind::Difference);
        series.push(1.0);
        series.push(2.0);
        assert_eq!(series.tail(5), &[1.0, 2.0]);
        assert_eq!(series.tail(1), &[2.0]);
        series.clear();
        assert!(series.is_empty());
    }
}
