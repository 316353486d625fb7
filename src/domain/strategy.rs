//! Strategy gene: the complete configuration of one trading strategy.
//!
//! A gene is a plain value. Cloning it deep-copies every rule list, so a
//! mutated child never shares storage with the parent it was cloned from.

use crate::domain::error::EngineError;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule::Rule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Period of the long-term trend filter EMA.
pub const TREND_FILTER_PERIOD: usize = 200;

pub const TREND_FILTER_EMA: IndicatorType = IndicatorType::Ema(TREND_FILTER_PERIOD);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopLoss {
    /// Stop at a fixed fraction from entry (0.02 = 2%). `<= 0` disables it.
    Fixed { pct: f64 },
    /// Stop at `multiplier` ATRs from entry, ATR frozen at the entry bar.
    Atr { period: usize, multiplier: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyGene {
    pub name: String,
    #[serde(default)]
    pub entry_long: Vec<Rule>,
    #[serde(default)]
    pub entry_short: Vec<Rule>,
    #[serde(default)]
    pub exit_long: Vec<Rule>,
    #[serde(default)]
    pub exit_short: Vec<Rule>,
    pub stop_loss: StopLoss,
    /// Fraction from entry (0.05 = 5%). `<= 0` disables take-profit.
    pub take_profit_pct: f64,
    /// Favourable move (fraction) that relocates the stop to break-even.
    #[serde(default)]
    pub break_even_pct: Option<f64>,
    #[serde(default)]
    pub trend_filter: bool,
    /// Per-side fee as a fraction of notional.
    #[serde(default)]
    pub fee_pct: f64,
    /// Per-fill slippage as a fraction of price.
    #[serde(default)]
    pub slippage_pct: f64,
}

impl StrategyGene {
    /// Every indicator series a simulation of this gene reads.
    pub fn required_indicators(&self) -> BTreeSet<IndicatorType> {
        let mut types: BTreeSet<IndicatorType> = self
            .entry_long
            .iter()
            .chain(&self.entry_short)
            .chain(&self.exit_long)
            .chain(&self.exit_short)
            .map(Rule::indicator_type)
            .collect();
        if self.trend_filter {
            types.insert(TREND_FILTER_EMA);
        }
        if let StopLoss::Atr { period, .. } = self.stop_loss {
            types.insert(IndicatorType::Atr(period));
        }
        types
    }

    /// Longest warm-up among the indicators this gene reads.
    pub fn required_warmup(&self) -> usize {
        self.required_indicators()
            .iter()
            .map(IndicatorType::warmup)
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.entry_long.is_empty() && self.entry_short.is_empty() && !self.trend_filter {
            return Err(EngineError::StrategyInvalid {
                reason: format!("{}: no entry rules and no trend filter", self.name),
            });
        }
        match self.stop_loss {
            StopLoss::Fixed { pct } if !(0.0..1.0).contains(&pct) => {
                return Err(EngineError::StrategyInvalid {
                    reason: format!("{}: stop_loss_pct must be in [0, 1)", self.name),
                });
            }
            StopLoss::Atr { period, multiplier } if period == 0 || multiplier <= 0.0 => {
                return Err(EngineError::StrategyInvalid {
                    reason: format!("{}: ATR stop needs a positive period and multiplier", self.name),
                });
            }
            _ => {}
        }
        if !self.take_profit_pct.is_finite() || self.take_profit_pct < 0.0 {
            return Err(EngineError::StrategyInvalid {
                reason: format!("{}: take_profit_pct must be non-negative", self.name),
            });
        }
        if let Some(pct) = self.break_even_pct {
            if !pct.is_finite() || pct <= 0.0 {
                return Err(EngineError::StrategyInvalid {
                    reason: format!("{}: break_even_pct must be positive", self.name),
                });
            }
        }
        if !(0.0..0.5).contains(&self.fee_pct) || !(0.0..0.5).contains(&self.slippage_pct) {
            return Err(EngineError::StrategyInvalid {
                reason: format!("{}: fee and slippage must be in [0, 0.5)", self.name),
            });
        }
        Ok(())
    }
}
