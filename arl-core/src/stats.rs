//! Reward statistics: pure functions over a reward series `R_t`.

/// Returned by [`downside_ratio`] when there is no upside to divide by.
pub const DOWNSIDE_RATIO_SENTINEL: f64 = 1e6;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Un-annualised Sharpe estimate `mean / std`. 0.0 for flat or short series.
pub fn sharpe_estimate(rewards: &[f64]) -> f64 {
    let std = std_dev(rewards);
    if std < 1e-15 {
        return 0.0;
    }
    let s = mean(rewards) / std;
    if s.is_finite() {
        s
    } else {
        0.0
    }
}

/// Sum of squared negative rewards over sum of squared positive rewards.
///
/// Returns [`DOWNSIDE_RATIO_SENTINEL`] when no reward is positive.
pub fn downside_ratio(rewards: &[f64]) -> f64 {
    let (down, up) = rewards.iter().fold((0.0, 0.0), |(down, up), &r| {
        if r < 0.0 {
            (down + r * r, up)
        } else {
            (down, up + r * r)
        }
    });
    if up == 0.0 {
        return DOWNSIDE_RATIO_SENTINEL;
    }
    let ratio = down / up;
    if ratio.is_finite() {
        ratio
    } else {
        DOWNSIDE_RATIO_SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&v) - 2.5).abs() < 1e-12);
        assert!((std_dev(&v) - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn sharpe_of_flat_series_is_zero() {
        assert_eq!(sharpe_estimate(&[0.5, 0.5, 0.5]), 0.0);
    }

    #[test]
    fn sharpe_sign_follows_mean() {
        assert!(sharpe_estimate(&[0.1, 0.2, 0.0, 0.3]) > 0.0);
        assert!(sharpe_estimate(&[-0.1, -0.2, 0.0, -0.3]) < 0.0);
    }

    #[test]
    fn downside_ratio_of_mixed_series() {
        let r = [1.0, -2.0, 3.0];
        assert!((downside_ratio(&r) - 4.0 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn downside_ratio_without_upside_is_sentinel() {
        assert_eq!(downside_ratio(&[0.0, 0.0]), DOWNSIDE_RATIO_SENTINEL);
        assert_eq!(downside_ratio(&[-1.0]), DOWNSIDE_RATIO_SENTINEL);
        assert_eq!(downside_ratio(&[]), DOWNSIDE_RATIO_SENTINEL);
    }
}
