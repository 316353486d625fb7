//! Open position state and closed trades.

use crate::domain::strategy::{StopLoss, StrategyGene};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    ExitRule,
}

/// An open position. Lives only between its entry bar and its exit bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub size: f64,
    /// Account balance just before entry; PnL and ROI are measured against it.
    pub balance_before: f64,
    /// ATR at the entry bar, frozen for the life of the position.
    pub initial_atr: f64,
    pub break_even_active: bool,
}

impl Position {
    /// Stop price currently in force, or `None` when the gene has no stop.
    pub fn active_stop(&self, gene: &StrategyGene) -> Option<f64> {
        let sign = self.direction();
        if self.break_even_active {
            // Covers the round-trip fee so the stop exit is non-losing.
            return Some(self.entry_price * (1.0 + sign * gene.fee_pct));
        }
        match gene.stop_loss {
            StopLoss::Atr { multiplier, .. } => {
                Some(self.entry_price - sign * self.initial_atr * multiplier)
            }
            StopLoss::Fixed { pct } if pct > 0.0 => Some(self.entry_price * (1.0 - sign * pct)),
            StopLoss::Fixed { .. } => None,
        }
    }

    pub fn take_profit(&self, gene: &StrategyGene) -> Option<f64> {
        if gene.take_profit_pct > 0.0 {
            Some(self.entry_price * (1.0 + self.direction() * gene.take_profit_pct))
        } else {
            None
        }
    }

    /// Price that activates the break-even stop, if configured and not yet active.
    pub fn break_even_trigger(&self, gene: &StrategyGene) -> Option<f64> {
        if self.break_even_active {
            return None;
        }
        gene.break_even_pct
            .map(|pct| self.entry_price * (1.0 + self.direction() * pct))
    }

    pub fn stop_hit(&self, stop: f64, high: f64, low: f64) -> bool {
        match self.side {
            Side::Long => low <= stop,
            Side::Short => high >= stop,
        }
    }

    pub fn target_hit(&self, target: f64, high: f64, low: f64) -> bool {
        match self.side {
            Side::Long => high >= target,
            Side::Short => low <= target,
        }
    }

    fn direction(&self) -> f64 {
        match self.side {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// A closed round trip. Appended to the trade log and never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub side: Side,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    /// Realized return on the balance before the trade, in percent.
    pub roi: f64,
    pub exit_reason: ExitReason,
}
