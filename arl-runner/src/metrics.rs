//! Performance statistics over profit, position, and reward series.
//!
//! Pure functions: series in, numbers out. Profit is measured in absolute
//! P&L units, never as a fraction of capital.

use serde::{Deserialize, Serialize};

use arl_core::engine::state::directional_accuracy;
use arl_core::stats::{mean, sharpe_estimate};

/// Aggregate statistics for one out-of-sample run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub ticks: usize,
    pub final_profit: f64,
    pub net_profit: f64,
    pub sharpe: f64,
    pub max_drawdown: MaxDrawdown,
    pub directional_accuracy: Option<f64>,
    pub position_changes: usize,
    pub long_ticks: usize,
    pub short_ticks: usize,
    pub flat_ticks: usize,
}

impl PerformanceSummary {
    /// `profit` has one more entry than the other series: the starting value.
    /// `positions[t]` is the position held over `returns[t]`.
    pub fn compute(profit: &[f64], positions: &[f64], returns: &[f64], rewards: &[f64]) -> Self {
        let final_profit = profit.last().copied().unwrap_or(0.0);
        let net_profit = match profit.first() {
            Some(first) => final_profit - first,
            None => 0.0,
        };
        Self {
            ticks: returns.len(),
            final_profit,
            net_profit,
            sharpe: sharpe_estimate(rewards),
            max_drawdown: max_drawdown(profit),
            directional_accuracy: directional_accuracy(positions, returns),
            position_changes: position_changes(positions),
            long_ticks: positions.iter().filter(|&&f| f > 0.0).count(),
            short_ticks: positions.iter().filter(|&&f| f < 0.0).count(),
            flat_ticks: positions.iter().filter(|&&f| f == 0.0).count(),
        }
    }
}

// ─── Drawdown ───────────────────────────────────────────────────────

/// Largest peak-to-trough fall of a profit series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxDrawdown {
    /// `peak - trough`, never negative.
    pub value: f64,
    pub peak_index: usize,
    pub trough_index: usize,
}

/// Maximum drawdown in absolute units.
///
/// The trough is the first index where the fall from the running peak is
/// largest; the peak is the first occurrence of the running maximum before
/// it. A series that never falls reports zero at index 0.
pub fn max_drawdown(series: &[f64]) -> MaxDrawdown {
    let mut best = MaxDrawdown::default();
    let Some(&first) = series.first() else {
        return best;
    };
    let (mut peak, mut peak_index) = (first, 0);
    for (i, &v) in series.iter().enumerate() {
        if v > peak {
            peak = v;
            peak_index = i;
        }
        let dd = peak - v;
        if dd > best.value {
            best = MaxDrawdown {
                value: dd,
                peak_index,
                trough_index: i,
            };
        }
    }
    best
}

// ─── Segments ───────────────────────────────────────────────────────

/// Statistics of one contiguous slice of a profit series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub index: usize,
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub peak: f64,
    pub trough: f64,
    pub drawdown: f64,
    /// Last value minus first value.
    pub net: f64,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
}

/// Split `series` into `n` nearly equal segments and describe each.
///
/// The first `len % n` segments take one extra element. Segments that would
/// be empty (`n > len`) are omitted.
pub fn segment_stats(series: &[f64], n: usize) -> Vec<SegmentStats> {
    if n == 0 {
        return Vec::new();
    }
    let base = series.len() / n;
    let extra = series.len() % n;

    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for index in 0..n {
        let len = base + usize::from(index < extra);
        if len == 0 {
            continue;
        }
        let end = start + len;
        let segment = &series[start..end];
        let dd = max_drawdown(segment);
        let m = mean(segment);
        out.push(SegmentStats {
            index,
            start,
            end,
            peak: segment[dd.peak_index],
            trough: segment[dd.trough_index],
            drawdown: dd.value,
            net: segment[len - 1] - segment[0],
            mean: m,
            variance: segment.iter().map(|v| (v - m).powi(2)).sum::<f64>() / len as f64,
        });
        start = end;
    }
    out
}

// ─── Positions ──────────────────────────────────────────────────────

/// Number of ticks where the position differs from the one before it.
pub fn position_changes(positions: &[f64]) -> usize {
    positions.windows(2).filter(|w| w[0] != w[1]).count()
}
