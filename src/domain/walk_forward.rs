//! Walk-forward analysis and the mining loop.
//!
//! A walk slides `[train | test]` windows across a date range, optimizing on
//! each training slice and backtesting the winner unmodified on the slice
//! that follows it. Windows advance by the test length. The walk is
//! accepted when the summed out-of-sample return clears a minimum and no
//! single window drew down past a ceiling.
//!
//! Mining repeats whole walks until one is accepted or attempts run out.
//! Nothing is persisted before acceptance.

use chrono::{Months, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backtest::{run_backtest, BacktestConfig};
use super::error::EngineError;
use super::metrics::win_rate;
use super::optimizer::GeneticOptimizer;
use super::position::Trade;
use super::strategy::StrategyGene;
use crate::ports::data_port::DataPort;
use crate::ports::strategy_sink::StrategySink;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub train_months: u32,
    pub test_months: u32,
    /// Aggregate out-of-sample return must exceed this (percent).
    pub min_total_return_pct: f64,
    /// Every window's drawdown must stay below this (percent).
    pub max_drawdown_pct: f64,
    pub max_attempts: usize,
    pub seed: Option<u64>,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            train_months: 3,
            test_months: 1,
            min_total_return_pct: 5.0,
            max_drawdown_pct: 25.0,
            max_attempts: 5,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_end: NaiveDateTime,
}

/// Windows whose test slice ends at or before `end`.
///
/// Every boundary is an offset in whole months from `start`, so consecutive
/// test slices tile `[start + train, end)` without gaps or overlap even when
/// month-end days are clamped.
pub fn windows(
    start: NaiveDateTime,
    end: NaiveDateTime,
    train_months: u32,
    test_months: u32,
) -> Vec<Window> {
    let mut out = Vec::new();
    if train_months == 0 || test_months == 0 {
        return out;
    }

    let offset = |months: u32| start.checked_add_months(Months::new(months));
    for n in 0u32.. {
        let Some(shift) = n.checked_mul(test_months) else {
            break;
        };
        let (Some(train_start), Some(train_end), Some(test_end)) = (
            offset(shift),
            shift.checked_add(train_months).and_then(offset),
            shift
                .checked_add(train_months)
                .and_then(|m| m.checked_add(test_months))
                .and_then(offset),
        ) else {
            break;
        };
        if test_end > end {
            break;
        }
        out.push(Window {
            train_start,
            train_end,
            test_end,
        });
    }
    out
}

/// Out-of-sample outcome of one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodResult {
    pub train_start: NaiveDateTime,
    pub train_end: NaiveDateTime,
    pub test_end: NaiveDateTime,
    pub gene: StrategyGene,
    pub train_fitness: f64,
    pub return_pct: f64,
    pub drawdown_pct: f64,
    pub trades: Vec<Trade>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardResult {
    pub symbol: String,
    /// Sum of per-window out-of-sample returns.
    pub total_return_pct: f64,
    /// Largest per-window drawdown.
    pub worst_drawdown_pct: f64,
    /// Gene of the last recorded window.
    pub gene: StrategyGene,
    /// Concatenated out-of-sample trades in window order.
    pub trades: Vec<Trade>,
    pub periods: Vec<PeriodResult>,
}

impl WalkForwardResult {
    pub fn win_rate_pct(&self) -> f64 {
        win_rate(&self.trades)
    }

    pub fn to_record(&self) -> StrategyRecord {
        let train_start_date = self.periods.first().map(|p| p.train_start);
        let train_end_date = self.periods.last().map(|p| p.train_end);
        StrategyRecord {
            name: format!("{} WFA {}", self.symbol, self.gene.name),
            symbol: self.symbol.clone(),
            config: self.gene.clone(),
            roi: self.total_return_pct,
            drawdown: self.worst_drawdown_pct,
            win_rate: self.win_rate_pct(),
            trades: self.trades.len(),
            trade_history: self.trades.clone(),
            train_start_date,
            train_end_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalkForwardOutcome {
    Accepted(WalkForwardResult),
    Rejected {
        windows_recorded: usize,
        total_return_pct: f64,
        worst_drawdown_pct: f64,
    },
}

/// Persisted form of an accepted walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecord {
    pub name: String,
    pub symbol: String,
    pub config: StrategyGene,
    pub roi: f64,
    pub drawdown: f64,
    pub win_rate: f64,
    pub trades: usize,
    pub trade_history: Vec<Trade>,
    pub train_start_date: Option<NaiveDateTime>,
    pub train_end_date: Option<NaiveDateTime>,
}

/// Apply the acceptance policy to recorded windows.
pub fn conclude(symbol: &str, periods: Vec<PeriodResult>, config: &WalkForwardConfig) -> WalkForwardOutcome {
    let total_return_pct: f64 = periods.iter().map(|p| p.return_pct).sum();
    let worst_drawdown_pct = periods
        .iter()
        .map(|p| p.drawdown_pct)
        .fold(0.0_f64, f64::max);

    let accepted = !periods.is_empty()
        && total_return_pct > config.min_total_return_pct
        && worst_drawdown_pct < config.max_drawdown_pct;

    let Some(last) = periods.last().filter(|_| accepted) else {
        return WalkForwardOutcome::Rejected {
            windows_recorded: periods.len(),
            total_return_pct,
            worst_drawdown_pct,
        };
    };

    let gene = last.gene.clone();
    let trades = periods.iter().flat_map(|p| p.trades.iter().cloned()).collect();
    WalkForwardOutcome::Accepted(WalkForwardResult {
        symbol: symbol.to_string(),
        total_return_pct,
        worst_drawdown_pct,
        gene,
        trades,
        periods,
    })
}

pub struct WalkForwardDriver<'a> {
    data: &'a dyn DataPort,
    optimizer: &'a GeneticOptimizer,
    backtest: &'a BacktestConfig,
    config: &'a WalkForwardConfig,
}

impl<'a> WalkForwardDriver<'a> {
    pub fn new(
        data: &'a dyn DataPort,
        optimizer: &'a GeneticOptimizer,
        backtest: &'a BacktestConfig,
        config: &'a WalkForwardConfig,
    ) -> Self {
        Self {
            data,
            optimizer,
            backtest,
            config,
        }
    }

    /// One full walk over `[start, end)`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rng: &mut R,
    ) -> Result<WalkForwardOutcome, EngineError> {
        let plan = windows(start, end, self.config.train_months, self.config.test_months);
        info!("Walk-forward {}: {} windows from {} to {}", symbol, plan.len(), start, end);

        let mut periods = Vec::with_capacity(plan.len());
        for (n, window) in plan.iter().enumerate() {
            if let Some(period) = self.run_window(symbol, window, rng)? {
                info!(
                    "Window {}/{} [{} .. {}): OOS return {:.2}%, drawdown {:.2}%, {} trades",
                    n + 1,
                    plan.len(),
                    window.train_end,
                    window.test_end,
                    period.return_pct,
                    period.drawdown_pct,
                    period.trades.len()
                );
                periods.push(period);
            }
        }

        let outcome = conclude(symbol, periods, self.config);
        match &outcome {
            WalkForwardOutcome::Accepted(result) => info!(
                "Walk-forward accepted: total OOS return {:.2}%, worst drawdown {:.2}%",
                result.total_return_pct, result.worst_drawdown_pct
            ),
            WalkForwardOutcome::Rejected {
                windows_recorded,
                total_return_pct,
                worst_drawdown_pct,
            } => info!(
                "Walk-forward rejected: {} windows, total OOS return {:.2}%, worst drawdown {:.2}%",
                windows_recorded, total_return_pct, worst_drawdown_pct
            ),
        }
        Ok(outcome)
    }

    /// Optimize on the training slice and validate on the test slice.
    /// `None` skips the window.
    fn run_window<R: Rng + ?Sized>(
        &self,
        symbol: &str,
        window: &Window,
        rng: &mut R,
    ) -> Result<Option<PeriodResult>, EngineError> {
        let train = self
            .data
            .fetch_candles(symbol, window.train_start, window.train_end)?;
        let Some(best) = self.optimizer.optimize(&train, rng) else {
            warn!(
                "No viable candidate for training window {} .. {}; skipping",
                window.train_start, window.train_end
            );
            return Ok(None);
        };

        let test = self
            .data
            .fetch_candles(symbol, window.train_end, window.test_end)?;
        let oos = match run_backtest(&test, &best.gene, self.backtest) {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "Out-of-sample backtest failed for {} .. {}: {}; skipping",
                    window.train_end, window.test_end, e
                );
                return Ok(None);
            }
        };

        Ok(Some(PeriodResult {
            train_start: window.train_start,
            train_end: window.train_end,
            test_end: window.test_end,
            gene: best.gene,
            train_fitness: best.fitness,
            return_pct: oos.total_return_pct,
            drawdown_pct: oos.max_drawdown_pct,
            trades: oos.trades,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MiningOutcome {
    Found {
        record: StrategyRecord,
        attempts: usize,
    },
    Exhausted {
        attempts: usize,
    },
}

/// Retry whole walks until one is accepted; persist it through `sink`.
pub fn mine<R: Rng + ?Sized>(
    driver: &WalkForwardDriver<'_>,
    sink: &dyn StrategySink,
    symbol: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    rng: &mut R,
) -> Result<MiningOutcome, EngineError> {
    let max_attempts = driver.config.max_attempts;
    for attempt in 1..=max_attempts {
        info!("Mining attempt {}/{} for {}", attempt, max_attempts, symbol);
        if let WalkForwardOutcome::Accepted(result) = driver.run(symbol, start, end, rng)? {
            let record = result.to_record();
            sink.persist(&record)?;
            info!("Persisted strategy '{}'", record.name);
            return Ok(MiningOutcome::Found {
                record,
                attempts: attempt,
            });
        }
    }
    warn!("No viable strategy found for {} after {} attempts", symbol, max_attempts);
    Ok(MiningOutcome::Exhausted {
        attempts: max_attempts,
    })
}
