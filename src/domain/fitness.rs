//! Fitness scoring: ranks candidates within one generation.
//!
//! Scores are never persisted; they only order a population.

use super::backtest::SimulationResult;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMeasure {
    /// Max drawdown of the compounded balance (Calmar-style).
    #[default]
    Drawdown,
    /// RMS of losing trade ROIs (Sortino-style).
    DownsideDeviation,
}

impl FromStr for RiskMeasure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drawdown" => Ok(RiskMeasure::Drawdown),
            "downside_deviation" => Ok(RiskMeasure::DownsideDeviation),
            other => Err(format!("unknown risk measure '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitnessPolicy {
    pub min_trades: usize,
    /// Score given to runs with fewer than `min_trades` trades.
    pub low_sample_penalty: f64,
    pub risk_measure: RiskMeasure,
    /// Substituted for a risk measure of exactly zero.
    pub risk_floor: f64,
}

impl Default for FitnessPolicy {
    fn default() -> Self {
        FitnessPolicy {
            min_trades: 5,
            low_sample_penalty: -1000.0,
            risk_measure: RiskMeasure::Drawdown,
            risk_floor: 1.0,
        }
    }
}

impl FitnessPolicy {
    pub fn score(&self, result: &SimulationResult) -> f64 {
        if result.trade_count < self.min_trades {
            return self.low_sample_penalty;
        }
        let ret = result.total_return_pct;
        if ret <= 0.0 {
            return ret;
        }
        let risk = match self.risk_measure {
            RiskMeasure::Drawdown => result.max_drawdown_pct,
            RiskMeasure::DownsideDeviation => result.downside_deviation,
        };
        let risk = if risk == 0.0 { self.risk_floor } else { risk };
        ret / risk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn result(trades: usize, ret: f64, dd: f64, dsd: f64) -> SimulationResult {
        SimulationResult {
            total_return_pct: ret,
            trade_count: trades,
            win_rate_pct: 0.0,
            max_drawdown_pct: dd,
            downside_deviation: dsd,
            initial_balance: 1_000.0,
            final_balance: 1_000.0 * (1.0 + ret / 100.0),
            trades: vec![],
            equity_curve: vec![],
        }
    }

    #[test]
    fn low_sample_is_penalized() {
        let policy = FitnessPolicy::default();
        assert_eq!(policy.score(&result(4, 50.0, 5.0, 1.0)), -1000.0);
    }

    #[test]
    fn losses_pass_through() {
        let policy = FitnessPolicy::default();
        assert_eq!(policy.score(&result(10, -7.5, 20.0, 3.0)), -7.5);
        assert_eq!(policy.score(&result(10, 0.0, 20.0, 3.0)), 0.0);
    }

    #[test]
    fn profit_divided_by_risk() {
        let policy = FitnessPolicy::default();
        assert_relative_eq!(policy.score(&result(10, 20.0, 8.0, 2.0)), 2.5);

        let sortino = FitnessPolicy {
            risk_measure: RiskMeasure::DownsideDeviation,
            ..FitnessPolicy::default()
        };
        assert_relative_eq!(sortino.score(&result(10, 20.0, 8.0, 2.0)), 10.0);
    }

    #[test]
    fn zero_risk_uses_floor() {
        let policy = FitnessPolicy {
            risk_floor: 0.5,
            ..FitnessPolicy::default()
        };
        assert_relative_eq!(policy.score(&result(10, 12.0, 0.0, 0.0)), 24.0);
    }

    #[test]
    fn better_risk_adjusted_ranks_higher() {
        let policy = FitnessPolicy::default();
        let steady = policy.score(&result(10, 20.0, 5.0, 1.0));
        let volatile = policy.score(&result(10, 30.0, 25.0, 1.0));
        assert!(steady > volatile);
    }

    #[test]
    fn risk_measure_from_str() {
        assert_eq!("drawdown".parse::<RiskMeasure>(), Ok(RiskMeasure::Drawdown));
        assert_eq!(
            "Downside_Deviation".parse::<RiskMeasure>(),
            Ok(RiskMeasure::DownsideDeviation)
        );
        assert!("variance".parse::<RiskMeasure>().is_err());
    }
}
