//! Performance statistics over a closed-trade log.
//!
//! Drawdown is measured on the balance obtained by compounding trade ROIs
//! from the initial capital, not on a mark-to-market equity curve.

use super::position::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Percent change from initial to final balance.
    pub total_return_pct: f64,
    pub trade_count: usize,
    /// Winning trades over all trades, in percent; 0 with no trades.
    pub win_rate_pct: f64,
    /// Peak-to-trough decline of the compounded balance, in `[0, 100]`.
    pub max_drawdown_pct: f64,
    /// Root mean square of the negative trade ROIs.
    pub downside_deviation: f64,
}

impl Metrics {
    pub fn compute(trades: &[Trade], initial_balance: f64, final_balance: f64) -> Self {
        let total_return_pct = if initial_balance > 0.0 {
            (final_balance - initial_balance) / initial_balance * 100.0
        } else {
            0.0
        };

        let rois: Vec<f64> = trades.iter().map(|t| t.roi).collect();

        Metrics {
            total_return_pct,
            trade_count: trades.len(),
            win_rate_pct: win_rate(trades),
            max_drawdown_pct: compounded_drawdown(&rois, initial_balance),
            downside_deviation: downside_deviation(&rois),
        }
    }
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.roi > 0.0).count();
    wins as f64 / trades.len() as f64 * 100.0
}

/// Replay percentage returns against a running balance and return the
/// deepest decline from a running peak, in percent.
pub fn compounded_drawdown(rois: &[f64], initial_balance: f64) -> f64 {
    if initial_balance <= 0.0 {
        return 0.0;
    }

    let mut balance = initial_balance;
    let mut peak = initial_balance;
    let mut max_dd = 0.0_f64;

    for roi in rois {
        balance *= 1.0 + roi / 100.0;
        if balance > peak {
            peak = balance;
        } else if peak > 0.0 {
            let dd = (peak - balance) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd.clamp(0.0, 100.0)
}

pub fn downside_deviation(rois: &[f64]) -> f64 {
    let negatives: Vec<f64> = rois.iter().copied().filter(|r| *r < 0.0).collect();
    if negatives.is_empty() {
        return 0.0;
    }
    let mean_sq = negatives.iter().map(|r| r * r).sum::<f64>() / negatives.len() as f64;
    mean_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Side};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_trade(roi: f64) -> Trade {
        let entry_time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Trade {
            side: Side::Long,
            entry_time,
            exit_time: entry_time + chrono::Duration::hours(6),
            entry_price: 100.0,
            exit_price: 100.0 + roi,
            size: 1.0,
            pnl: roi * 10.0,
            roi,
            exit_reason: ExitReason::ExitRule,
        }
    }

    #[test]
    fn metrics_no_trades() {
        let m = Metrics::compute(&[], 1_000.0, 1_000.0);
        assert_eq!(m.trade_count, 0);
        assert_eq!(m.win_rate_pct, 0.0);
        assert_eq!(m.max_drawdown_pct, 0.0);
        assert_eq!(m.downside_deviation, 0.0);
        assert_eq!(m.total_return_pct, 0.0);
    }

    #[test]
    fn metrics_total_return() {
        let m = Metrics::compute(&[], 1_000.0, 1_100.0);
        assert_relative_eq!(m.total_return_pct, 10.0, epsilon = 1e-9);
        let m = Metrics::compute(&[], 1_000.0, 900.0);
        assert_relative_eq!(m.total_return_pct, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn metrics_win_rate_and_count() {
        let trades = vec![make_trade(10.0), make_trade(-5.0), make_trade(20.0), make_trade(0.0)];
        let m = Metrics::compute(&trades, 1_000.0, 1_250.0);
        assert_eq!(m.trade_count, 4);
        assert_relative_eq!(m.win_rate_pct, 50.0);
    }

    #[test]
    fn win_rate_counts_strictly_positive() {
        let trades = vec![make_trade(0.0), make_trade(1.0), make_trade(-1.0)];
        assert_relative_eq!(win_rate(&trades), 100.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn drawdown_compounds_trade_returns() {
        // 1000 -> 1100 -> 880 -> 968
        let dd = compounded_drawdown(&[10.0, -20.0, 10.0], 1_000.0);
        assert_relative_eq!(dd, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_of_losing_streak_from_start() {
        // 1000 -> 900 -> 810
        let dd = compounded_drawdown(&[-10.0, -10.0], 1_000.0);
        assert_relative_eq!(dd, 19.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_is_clamped() {
        let dd = compounded_drawdown(&[-150.0], 1_000.0);
        assert_eq!(dd, 100.0);
    }

    #[test]
    fn downside_deviation_is_rms_of_losses() {
        let dd = downside_deviation(&[5.0, -3.0, -4.0, 2.0]);
        assert_relative_eq!(dd, (12.5_f64).sqrt(), epsilon = 1e-12);
        assert_eq!(downside_deviation(&[1.0, 2.0]), 0.0);
    }
}
